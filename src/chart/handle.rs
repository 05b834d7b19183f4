use chrono::{DateTime, Duration, Utc};

use crate::chart::snapshot::RenderSnapshot;
use crate::chart::state::SharedChart;
use crate::chart::{RedrawReason, RedrawRequest, RedrawSender};
use crate::scheduler::Autoscroller;
use crate::spans::SharedSpans;
use crate::view::ViewError;

/// Renderer-facing entry point of one chart: paint snapshots out, user
/// gestures in. Gestures keep the autoscroller in step with live-follow.
#[derive(Clone)]
pub struct ChartHandle {
    chart: SharedChart,
    spans: Option<SharedSpans>,
    autoscroller: Autoscroller,
    redraw_tx: RedrawSender,
}

impl ChartHandle {
    pub fn new(
        chart: SharedChart,
        spans: Option<SharedSpans>,
        autoscroller: Autoscroller,
        redraw_tx: RedrawSender,
    ) -> Self {
        Self {
            chart,
            spans,
            autoscroller,
            redraw_tx,
        }
    }

    pub fn chart(&self) -> &SharedChart {
        &self.chart
    }

    pub async fn snapshot(&self) -> RenderSnapshot {
        self.snapshot_at(Utc::now()).await
    }

    pub async fn snapshot_at(&self, now: DateTime<Utc>) -> RenderSnapshot {
        let chart = self.chart.read().await;
        match &self.spans {
            Some(spans) => {
                let timeline = spans.read().await;
                chart.snapshot(Some(&timeline), now)
            }
            None => chart.snapshot(None, now),
        }
    }

    /// Preset width button: follow now with a window of `width`.
    pub async fn set_width(&self, width: Duration) -> Result<(), ViewError> {
        self.chart.write().await.set_width(width, Utc::now())?;
        self.after_gesture().await;
        Ok(())
    }

    /// Drag or wheel gesture.
    pub async fn zoom_to(
        &self,
        time: (DateTime<Utc>, DateTime<Utc>),
        values: Option<(f64, f64)>,
    ) -> Result<(), ViewError> {
        self.chart.write().await.zoom_to(time, values)?;
        self.after_gesture().await;
        Ok(())
    }

    pub async fn autoscale(&self) {
        self.chart.write().await.autoscale();
        self.after_gesture().await;
    }

    pub async fn follow_now(&self) {
        self.chart.write().await.follow_now(Utc::now());
        self.after_gesture().await;
    }

    pub async fn shutdown(&self) {
        self.autoscroller.stop().await;
    }

    async fn after_gesture(&self) {
        let (id, live) = {
            let chart = self.chart.read().await;
            (chart.id(), chart.view().is_live())
        };
        if live {
            self.autoscroller.restart().await;
        } else {
            self.autoscroller.stop().await;
        }
        let _ = self.redraw_tx.send(RedrawRequest::chart(id, RedrawReason::Gesture));
    }
}
