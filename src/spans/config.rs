use serde::{Deserialize, Serialize};

use crate::models::SpanEnd;

/// How the trailing, still-open span is terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum OpenSpanMarker {
    /// Ends at the current time, re-evaluated on every paint.
    #[default]
    Now,
    /// Runs off the right edge of the chart.
    Unbounded,
}

impl OpenSpanMarker {
    pub fn span_end(self) -> SpanEnd {
        match self {
            OpenSpanMarker::Now => SpanEnd::Now,
            OpenSpanMarker::Unbounded => SpanEnd::Unbounded,
        }
    }
}
