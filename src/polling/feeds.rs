use std::future::Future;

use chrono::Duration;

use crate::chart::{RedrawReason, RedrawRequest, RedrawSender, SharedChart};
use crate::models::StateEvent;
use crate::polling::sequencer::{RequestSequencer, Ticket};
use crate::query::{
    batch_statements, decode_samples, decode_state_events, select_values, FetchError, QueryResponse,
    QuerySource, TimeFilter,
};
use crate::spans::SharedSpans;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// What one applied response changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub appended: usize,
    pub skipped_series: Vec<String>,
    pub autoscaled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Applied(CycleReport),
    /// Superseded by a response applied after this query was built.
    Stale,
    /// Transport or decoding failure; nothing was applied.
    Failed,
}

/// One polled data source.
pub trait Feed: Clone + Send + Sync + 'static {
    fn label(&self) -> String;

    /// Builds the incremental query and issues its ticket under one lock.
    fn prepare(&self, sequencer: &RequestSequencer) -> impl Future<Output = (String, Ticket)> + Send;

    fn apply(
        &self,
        ticket: Ticket,
        sequencer: &RequestSequencer,
        response: &QueryResponse,
    ) -> impl Future<Output = Result<CycleOutcome, FetchError>> + Send;
}

/// Runs a single fetch-and-apply cycle. Failures are logged and contained.
pub async fn run_cycle<F, S>(feed: &F, source: &S, sequencer: &RequestSequencer) -> CycleOutcome
where
    F: Feed,
    S: QuerySource,
{
    let (query, ticket) = feed.prepare(sequencer).await;

    let response = match source.fetch(&query).await {
        Ok(response) => response,
        Err(err) => {
            log_warn!("{}: fetch failed, skipping cycle: {err}", feed.label());
            return CycleOutcome::Failed;
        }
    };

    match feed.apply(ticket, sequencer, &response).await {
        Ok(CycleOutcome::Stale) => {
            log_debug!("{}: discarding stale response #{}", feed.label(), ticket.seq);
            CycleOutcome::Stale
        }
        Ok(outcome) => outcome,
        Err(err) => {
            log_warn!("{}: {err}, skipping cycle", feed.label());
            CycleOutcome::Failed
        }
    }
}

/// Sample channels of one chart.
#[derive(Clone)]
pub struct SampleFeed {
    chart: SharedChart,
    lookback: Option<Duration>,
    redraw_tx: RedrawSender,
}

impl SampleFeed {
    pub fn new(chart: SharedChart, lookback: Option<Duration>, redraw_tx: RedrawSender) -> Self {
        Self {
            chart,
            lookback,
            redraw_tx,
        }
    }
}

impl Feed for SampleFeed {
    fn label(&self) -> String {
        "samples".into()
    }

    async fn prepare(&self, sequencer: &RequestSequencer) -> (String, Ticket) {
        let chart = self.chart.read().await;
        let store = chart.store();
        let statements: Vec<String> = store
            .channels()
            .map(|channel| {
                let filter = TimeFilter::from_high_water_mark(channel.high_water_mark(), self.lookback);
                select_values(channel.key(), filter)
            })
            .collect();
        (batch_statements(statements), sequencer.issue())
    }

    async fn apply(
        &self,
        ticket: Ticket,
        sequencer: &RequestSequencer,
        response: &QueryResponse,
    ) -> Result<CycleOutcome, FetchError> {
        let mut chart = self.chart.write().await;
        let batch = decode_samples(response, |name| chart.store().contains(name))?;
        if !sequencer.accept(ticket) {
            return Ok(CycleOutcome::Stale);
        }

        let mut report = CycleReport::default();
        for name in batch.skipped {
            log_warn!("Got data for unknown channel {name}, skipping series");
            report.skipped_series.push(name);
        }

        let mut first_data = false;
        for series in batch.series {
            match chart.store_mut().append(&series.name, series.rows) {
                Ok(outcome) => {
                    report.appended += outcome.appended;
                    first_data |= outcome.is_first_data();
                }
                Err(err) => {
                    log_warn!("{err}, skipping series");
                    report.skipped_series.push(series.name);
                }
            }
        }

        if first_data {
            chart.autoscale();
            report.autoscaled = true;
            log_info!(
                "chart {} received its first samples, autoscaled to {:?}",
                chart.id(),
                chart.view().domain()
            );
        }

        if report.appended > 0 {
            let reason = if report.autoscaled {
                RedrawReason::Autoscaled
            } else {
                RedrawReason::DataArrived
            };
            let _ = self.redraw_tx.send(RedrawRequest::chart(chart.id(), reason));
        }

        Ok(CycleOutcome::Applied(report))
    }
}

/// Enumerated state signal rendered as spans behind every chart.
#[derive(Clone)]
pub struct StateFeed {
    spans: SharedSpans,
    measurement: String,
    lookback: Option<Duration>,
    redraw_tx: RedrawSender,
}

impl StateFeed {
    pub fn new(
        spans: SharedSpans,
        measurement: impl Into<String>,
        lookback: Option<Duration>,
        redraw_tx: RedrawSender,
    ) -> Self {
        Self {
            spans,
            measurement: measurement.into(),
            lookback,
            redraw_tx,
        }
    }
}

impl Feed for StateFeed {
    fn label(&self) -> String {
        format!("state feed {}", self.measurement)
    }

    async fn prepare(&self, sequencer: &RequestSequencer) -> (String, Ticket) {
        let timeline = self.spans.read().await;
        let filter = TimeFilter::from_high_water_mark(timeline.high_water_mark(), self.lookback);
        (
            batch_statements([select_values(&self.measurement, filter)]),
            sequencer.issue(),
        )
    }

    async fn apply(
        &self,
        ticket: Ticket,
        sequencer: &RequestSequencer,
        response: &QueryResponse,
    ) -> Result<CycleOutcome, FetchError> {
        let batch = decode_state_events(response, |name| name == self.measurement)?;

        let mut report = CycleReport::default();
        for name in batch.skipped {
            log_warn!("Got state data for unknown measurement {name}, skipping series");
            report.skipped_series.push(name);
        }
        let events: Vec<StateEvent> = batch.series.into_iter().flat_map(|series| series.rows).collect();

        let mut timeline = self.spans.write().await;
        if !sequencer.accept(ticket) {
            return Ok(CycleOutcome::Stale);
        }

        report.appended = events.len();
        timeline.ingest(&events);

        if report.appended > 0 {
            let _ = self.redraw_tx.send(RedrawRequest::all(RedrawReason::SpansUpdated));
        }

        Ok(CycleOutcome::Applied(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{redraw_channel, ChartState};
    use crate::settings::{ChannelConfig, ViewSettings};
    use crate::spans::{OpenSpanMarker, SpanTimeline};
    use chrono::{TimeZone, Utc};

    fn response(body: &str) -> QueryResponse {
        QueryResponse::from_slice(body.as_bytes()).unwrap()
    }

    fn sample_feed() -> (SampleFeed, SharedChart) {
        let (tx, _rx) = redraw_channel();
        let chart = ChartState::new(
            0,
            ChannelConfig::new(["sensor/temp", "sensor/humidity"]),
            &ViewSettings::default(),
            Utc::now(),
        )
        .shared();
        (SampleFeed::new(chart.clone(), Some(Duration::hours(24)), tx), chart)
    }

    #[tokio::test]
    async fn first_query_uses_lookback_for_every_channel() {
        let (feed, _chart) = sample_feed();
        let sequencer = RequestSequencer::new();

        let (query, _) = feed.prepare(&sequencer).await;
        assert_eq!(
            query,
            "SELECT value FROM \"sensor/temp\" WHERE time > now() - 24h;\
             SELECT value FROM \"sensor/humidity\" WHERE time > now() - 24h;"
        );
    }

    #[tokio::test]
    async fn later_query_starts_after_high_water_mark() {
        let (feed, _chart) = sample_feed();
        let sequencer = RequestSequencer::new();

        let (_, ticket) = feed.prepare(&sequencer).await;
        let body = r#"{"results":[{"series":[{"name":"sensor/temp","values":[["2024-01-01T00:00:00Z",21.5]]}]}]}"#;
        feed.apply(ticket, &sequencer, &response(body)).await.unwrap();

        let (query, _) = feed.prepare(&sequencer).await;
        assert!(query.contains("FROM \"sensor/temp\" WHERE time > '2024-01-01T00:00:00Z'"));
        assert!(query.contains("FROM \"sensor/humidity\" WHERE time > now() - 24h"));
    }

    #[tokio::test]
    async fn stale_ticket_changes_nothing() {
        let (feed, chart) = sample_feed();
        let sequencer = RequestSequencer::new();

        let (_, slow) = feed.prepare(&sequencer).await;
        let (_, fast) = feed.prepare(&sequencer).await;

        let body = r#"{"results":[{"series":[{"name":"sensor/temp","values":[["2024-01-01T00:00:00Z",1]]}]}]}"#;
        let applied = feed.apply(fast, &sequencer, &response(body)).await.unwrap();
        assert!(matches!(applied, CycleOutcome::Applied(_)));

        let outcome = feed.apply(slow, &sequencer, &response(body)).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Stale);
        assert_eq!(chart.read().await.store().all_samples("sensor/temp").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn state_feed_builds_spans_incrementally() {
        let (tx, mut rx) = redraw_channel();
        let spans = SpanTimeline::shared(OpenSpanMarker::Now);
        let feed = StateFeed::new(spans.clone(), "space/state", Some(Duration::hours(24)), tx);
        let sequencer = RequestSequencer::new();

        let (query, ticket) = feed.prepare(&sequencer).await;
        assert_eq!(query, "SELECT value FROM \"space/state\" WHERE time > now() - 24h;");

        let body = r#"{"results":[{"series":[{"name":"space/state","columns":["time","value"],"values":[
            ["2024-01-01T00:00:00Z","open"],["2024-01-01T01:00:00Z","open"],["2024-01-01T02:00:00Z","closed"]]}]}]}"#;
        feed.apply(ticket, &sequencer, &response(body)).await.unwrap();
        assert_eq!(spans.read().await.spans().len(), 2);
        assert!(rx.try_recv().is_ok());

        let (query, ticket) = feed.prepare(&sequencer).await;
        assert!(query.ends_with("WHERE time > '2024-01-01T02:00:00Z';"));

        let outcome = feed
            .apply(ticket, &sequencer, &response(r#"{"results":[{"statement_id":0}]}"#))
            .await
            .unwrap();
        assert_eq!(outcome, CycleOutcome::Applied(CycleReport::default()));

        let timeline = spans.read().await;
        assert_eq!(timeline.spans().len(), 2);
        assert_eq!(
            timeline.spans()[1].start,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap())
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn state_feed_skips_other_measurements_undecoded() {
        let (tx, _rx) = redraw_channel();
        let spans = SpanTimeline::shared(OpenSpanMarker::Now);
        let feed = StateFeed::new(spans.clone(), "space/state", None, tx);
        let sequencer = RequestSequencer::new();

        let (_, ticket) = feed.prepare(&sequencer).await;
        let body = r#"{"results":[{"series":[
            {"name":"space/door","values":[["2024-01-01T00:00:00Z",{"nested":1}]]},
            {"name":"space/state","values":[["2024-01-01T00:00:00Z","open"]]}
        ]}]}"#;

        let CycleOutcome::Applied(report) = feed.apply(ticket, &sequencer, &response(body)).await.unwrap() else {
            panic!("state batch was not applied");
        };
        assert_eq!(report.skipped_series, vec!["space/door".to_string()]);
        assert_eq!(report.appended, 1);
        assert_eq!(spans.read().await.current_label(), Some("open"));
    }
}
