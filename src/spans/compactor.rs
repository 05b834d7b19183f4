use crate::models::{Span, SpanEnd, StateEvent};
use crate::spans::config::OpenSpanMarker;

/// Folds a batch of state events into an existing span list.
///
/// The trailing open span of `spans` is taken back off the list and
/// continued with `events`; every label change closes the running span.
/// Events that repeat the running label are absorbed. Afterwards a single
/// open span is appended for the label in effect at the end of the batch.
///
/// Until the first event is seen no label is known, so the first run has
/// `start == None` and no label-less span is emitted in front of it.
pub fn compact_spans(mut spans: Vec<Span>, events: &[StateEvent], marker: OpenSpanMarker) -> Vec<Span> {
    let (mut run_start, mut run_label) = match spans.pop() {
        Some(previous) => (previous.start, Some(previous.label)),
        None => (None, None),
    };

    for event in events {
        let changed = run_label.as_deref().map(|label| label != event.label);
        match changed {
            Some(false) => {}
            Some(true) => {
                if let Some(label) = run_label.replace(event.label.clone()) {
                    spans.push(Span::closed(run_start, event.timestamp, label));
                }
                run_start = Some(event.timestamp);
            }
            None => run_label = Some(event.label.clone()),
        }
    }

    if let Some(label) = run_label {
        spans.push(Span::open(run_start, marker.span_end(), label));
    }

    spans
}

/// Checks the ordering and merge invariants of a span list.
pub fn is_well_formed(spans: &[Span]) -> bool {
    let ordered = spans.windows(2).all(|pair| {
        let (a, b) = (&pair[0], &pair[1]);
        let touches = match (a.end, b.start) {
            (SpanEnd::Closed(end), Some(start)) => end <= start,
            _ => false,
        };
        touches && a.label != b.label
    });
    let open_tail = spans.last().map(|span| span.end.is_open()).unwrap_or(true);
    ordered && open_tail
}
