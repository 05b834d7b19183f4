use serde::Serialize;

use crate::models::{ResolvedSpan, Sample};
use crate::view::{Domain, ScaleKind};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSnapshot {
    pub key: String,
    pub name: String,
    pub samples: Vec<Sample>,
}

/// Read-only copy of a chart handed to the renderer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSnapshot {
    pub chart: usize,
    pub title: String,
    pub unit: String,
    pub interpolation: String,
    pub scale: ScaleKind,
    pub domain: Domain,
    pub live_follow: bool,
    pub series: Vec<SeriesSnapshot>,
    pub spans: Vec<ResolvedSpan>,
}

impl RenderSnapshot {
    pub fn sample_count(&self) -> usize {
        self.series.iter().map(|series| series.samples.len()).sum()
    }

    /// Spans overlapping the visible time window.
    pub fn visible_spans(&self) -> impl Iterator<Item = &ResolvedSpan> {
        let domain = self.domain;
        self.spans.iter().filter(move |span| {
            let starts_before_end = span.start.map_or(true, |start| start <= domain.time_end);
            let ends_after_start = span.end.map_or(true, |end| end >= domain.time_start);
            starts_before_end && ends_after_start
        })
    }
}
