use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::{ResolvedSpan, Span, StateEvent};
use crate::spans::compactor::compact_spans;
use crate::spans::config::OpenSpanMarker;

pub type SharedSpans = Arc<RwLock<SpanTimeline>>;

/// Owned span list of the state feed plus the feed's high-water mark.
#[derive(Debug, Clone, Default)]
pub struct SpanTimeline {
    spans: Vec<Span>,
    marker: OpenSpanMarker,
    high_water_mark: Option<DateTime<Utc>>,
}

impl SpanTimeline {
    pub fn new(marker: OpenSpanMarker) -> Self {
        Self {
            spans: Vec::new(),
            marker,
            high_water_mark: None,
        }
    }

    pub fn shared(marker: OpenSpanMarker) -> SharedSpans {
        Arc::new(RwLock::new(Self::new(marker)))
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn marker(&self) -> OpenSpanMarker {
        self.marker
    }

    /// Timestamp of the newest event ingested so far.
    pub fn high_water_mark(&self) -> Option<DateTime<Utc>> {
        self.high_water_mark
    }

    /// Folds `events` (in timestamp order) into the span list.
    pub fn ingest(&mut self, events: &[StateEvent]) {
        let spans = std::mem::take(&mut self.spans);
        self.spans = compact_spans(spans, events, self.marker);
        if let Some(last) = events.last() {
            self.high_water_mark = Some(last.timestamp);
        }
    }

    /// The label in effect right now, if any event has been seen.
    pub fn current_label(&self) -> Option<&str> {
        self.spans.last().map(|span| span.label.as_str())
    }

    pub fn resolved(&self, now: DateTime<Utc>) -> Vec<ResolvedSpan> {
        self.spans.iter().map(|span| span.resolve(now)).collect()
    }
}
