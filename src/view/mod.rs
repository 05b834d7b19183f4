pub mod scale;
pub mod window;

pub use scale::{PercentileBand, ScaleKind};
pub use window::{Domain, FollowOnZoom, ViewError, ViewOptions, ViewWindow};
