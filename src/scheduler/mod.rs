pub mod autoscroll;

pub use autoscroll::{redraw_interval, Autoscroller};
