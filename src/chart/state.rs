use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::chart::snapshot::{RenderSnapshot, SeriesSnapshot};
use crate::settings::{ChannelConfig, ViewSettings};
use crate::spans::SpanTimeline;
use crate::store::TimeSeriesStore;
use crate::view::{ViewError, ViewOptions, ViewWindow};

pub type SharedChart = Arc<RwLock<ChartState>>;

/// Samples and view window of one configured chart.
#[derive(Debug, Clone)]
pub struct ChartState {
    id: usize,
    config: ChannelConfig,
    store: TimeSeriesStore,
    view: ViewWindow,
}

impl ChartState {
    pub fn new(id: usize, config: ChannelConfig, view: &ViewSettings, now: DateTime<Utc>) -> Self {
        let store = TimeSeriesStore::new(config.channel_keys());
        let view = ViewWindow::new(ViewOptions::for_chart(&config, view), now);
        Self {
            id,
            config,
            store,
            view,
        }
    }

    pub fn shared(self) -> SharedChart {
        Arc::new(RwLock::new(self))
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TimeSeriesStore {
        &mut self.store
    }

    pub fn view(&self) -> &ViewWindow {
        &self.view
    }

    pub fn autoscale(&mut self) {
        self.view.autoscale_full(&self.store);
    }

    pub fn scroll_to_now(&mut self, now: DateTime<Utc>) {
        self.view.scroll_to_now(&self.store, now);
    }

    pub fn set_width(&mut self, width: Duration, now: DateTime<Utc>) -> Result<(), ViewError> {
        self.view.set_width(width, &self.store, now)
    }

    pub fn zoom_to(
        &mut self,
        time: (DateTime<Utc>, DateTime<Utc>),
        values: Option<(f64, f64)>,
    ) -> Result<(), ViewError> {
        self.view.zoom_to(time, values, &self.store)
    }

    /// Re-enables live-follow and jumps to now with the current width.
    pub fn follow_now(&mut self, now: DateTime<Utc>) {
        self.view.set_live(true);
        self.view.scroll_to_now(&self.store, now);
    }

    /// Everything the renderer needs for one paint.
    pub fn snapshot(&self, spans: Option<&SpanTimeline>, now: DateTime<Utc>) -> RenderSnapshot {
        let series = self
            .store
            .channels()
            .zip(self.config.names())
            .map(|(channel, name)| SeriesSnapshot {
                key: channel.key().to_string(),
                name: name.clone(),
                samples: channel.samples().to_vec(),
            })
            .collect();

        RenderSnapshot {
            chart: self.id,
            title: self.config.title.clone(),
            unit: self.config.unit.clone(),
            interpolation: self.config.interpolation.clone(),
            scale: self.config.scale,
            domain: self.view.domain(),
            live_follow: self.view.is_live(),
            series,
            spans: spans.map(|timeline| timeline.resolved(now)).unwrap_or_default(),
        }
    }
}
