pub mod sample;
pub mod span;

pub use sample::Sample;
pub use span::{ResolvedSpan, Span, SpanEnd, StateEvent};
