use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw point of the state feed, e.g. `open` / `closed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEvent {
    pub timestamp: DateTime<Utc>,
    pub label: String,
}

impl StateEvent {
    pub fn new(timestamp: DateTime<Utc>, label: impl Into<String>) -> Self {
        Self {
            timestamp,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "at")]
pub enum SpanEnd {
    Closed(DateTime<Utc>),
    /// Still open; the renderer substitutes the current time.
    Now,
    /// Still open; extends past the right edge of any window.
    Unbounded,
}

impl SpanEnd {
    pub fn is_open(&self) -> bool {
        !matches!(self, SpanEnd::Closed(_))
    }

    pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            SpanEnd::Closed(at) => Some(*at),
            SpanEnd::Now => Some(now),
            SpanEnd::Unbounded => None,
        }
    }
}

/// A maximal interval during which the state feed held one label.
///
/// `start == None` means the span reaches back to the earliest known time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub start: Option<DateTime<Utc>>,
    pub end: SpanEnd,
    pub label: String,
}

impl Span {
    pub fn closed(start: Option<DateTime<Utc>>, end: DateTime<Utc>, label: impl Into<String>) -> Self {
        Self {
            start,
            end: SpanEnd::Closed(end),
            label: label.into(),
        }
    }

    pub fn open(start: Option<DateTime<Utc>>, end: SpanEnd, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    pub fn resolve(&self, now: DateTime<Utc>) -> ResolvedSpan {
        ResolvedSpan {
            start: self.start,
            end: self.end.resolve(now),
            label: self.label.clone(),
        }
    }
}

/// Span as handed to the renderer: `None` edges extend to the canvas border.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSpan {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub label: String,
}
