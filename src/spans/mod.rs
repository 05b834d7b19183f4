pub mod compactor;
pub mod config;
pub mod timeline;

pub use compactor::compact_spans;
pub use config::OpenSpanMarker;
pub use timeline::{SharedSpans, SpanTimeline};
