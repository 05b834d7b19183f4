pub mod chart;
pub mod models;
pub mod polling;
pub mod query;
pub mod scheduler;
pub mod settings;
pub mod spans;
pub mod store;
pub mod utils;
pub mod view;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use chart::{redraw_channel, ChartHandle, ChartState, RedrawReceiver, RedrawSender};
use polling::{PollerController, SampleFeed, StateFeed};
use query::{InfluxClient, QuerySource};
use scheduler::Autoscroller;
use settings::{DashboardSettings, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use spans::{SharedSpans, SpanTimeline};

/// Every chart of one dashboard plus the polling that feeds them.
pub struct Dashboard {
    charts: Vec<ChartHandle>,
    spans: Option<SharedSpans>,
    poller: PollerController,
}

impl Dashboard {
    /// Builds the charts and starts one polling loop per chart, plus one
    /// for the state feed when configured.
    pub async fn start<S: QuerySource>(
        settings: &DashboardSettings,
        source: Arc<S>,
        redraw_tx: RedrawSender,
    ) -> Result<Self> {
        let now = chrono::Utc::now();
        let interval = settings.update_interval();
        let lookback = settings.lookback();
        let mut poller = PollerController::new();

        let spans = settings
            .state
            .as_ref()
            .map(|state| SpanTimeline::shared(state.open_span_marker));

        if let (Some(state), Some(spans)) = (&settings.state, &spans) {
            let feed = StateFeed::new(spans.clone(), state.measurement.clone(), lookback, redraw_tx.clone());
            poller.spawn_feed(feed, Arc::clone(&source), interval)?;
        }

        let mut charts = Vec::with_capacity(settings.charts.len());
        for (id, config) in settings.charts.iter().enumerate() {
            let chart = ChartState::new(id, config.clone(), &settings.view, now).shared();

            let feed = SampleFeed::new(chart.clone(), lookback, redraw_tx.clone());
            poller
                .spawn_feed(feed, Arc::clone(&source), interval)
                .with_context(|| format!("Failed to start polling for chart {id}"))?;

            let autoscroller = Autoscroller::new(chart.clone(), redraw_tx.clone(), settings.view.min_tick());
            let handle = ChartHandle::new(chart, spans.clone(), autoscroller, redraw_tx.clone());
            handle.follow_now().await;
            charts.push(handle);
        }

        info!(
            "dashboard started with {} charts, polling every {}ms",
            charts.len(),
            interval.as_millis()
        );

        Ok(Self {
            charts,
            spans,
            poller,
        })
    }

    pub fn charts(&self) -> &[ChartHandle] {
        &self.charts
    }

    pub fn chart(&self, id: usize) -> Option<&ChartHandle> {
        self.charts.get(id)
    }

    pub fn spans(&self) -> Option<&SharedSpans> {
        self.spans.as_ref()
    }

    pub async fn shutdown(mut self) -> Result<()> {
        for chart in &self.charts {
            chart.shutdown().await;
        }
        self.poller.stop().await
    }
}

/// Stand-in for a painting front end: takes a snapshot for every redraw
/// request and logs what would be drawn.
async fn drain_redraws(charts: Vec<ChartHandle>, mut redraw_rx: RedrawReceiver) {
    while let Some(request) = redraw_rx.recv().await {
        let targets = charts
            .iter()
            .enumerate()
            .filter(|(id, _)| request.chart.map_or(true, |target| target == *id));
        for (_, chart) in targets {
            let snapshot = chart.snapshot().await;
            debug!(
                "redraw chart {} ({:?}): {} samples, {} visible spans, domain {:?}",
                snapshot.chart,
                request.reason,
                snapshot.sample_count(),
                snapshot.visible_spans().count(),
                snapshot.domain
            );
        }
    }
}

fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub async fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("livegraph starting up...");

    let path = config_path();
    let settings = DashboardSettings::load(&path)?;
    if settings.charts.is_empty() {
        warn!("no charts configured in {}", path.display());
    }

    let client = Arc::new(InfluxClient::new(&settings.influx));
    let (redraw_tx, redraw_rx) = redraw_channel();
    let dashboard = Dashboard::start(&settings, client, redraw_tx).await?;

    let renderer = tokio::spawn(drain_redraws(dashboard.charts().to_vec(), redraw_rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("shutting down");

    dashboard.shutdown().await?;
    renderer.abort();
    Ok(())
}
