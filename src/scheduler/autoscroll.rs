use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{sync::Mutex, task::JoinHandle, time};

use crate::chart::{RedrawReason, RedrawRequest, RedrawSender, SharedChart};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Time covered by one pixel of the viewport, floored at `min_tick`.
pub fn redraw_interval(visible: chrono::Duration, viewport_px: u32, min_tick: Duration) -> Duration {
    let visible_ms = visible.num_milliseconds().max(0) as f64;
    let per_px = Duration::from_secs_f64(visible_ms / 1000.0 / f64::from(viewport_px.max(1)));
    per_px.max(min_tick)
}

/// Keeps a live-following chart anchored at the current time.
#[derive(Clone)]
pub struct Autoscroller {
    chart: SharedChart,
    redraw_tx: RedrawSender,
    min_tick: Duration,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Autoscroller {
    pub fn new(chart: SharedChart, redraw_tx: RedrawSender, min_tick: Duration) -> Self {
        Self {
            chart,
            redraw_tx,
            min_tick,
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    /// Replaces any pending tick with a fresh one paced by the current
    /// window. Cancel and spawn happen under one lock, so a superseded
    /// tick can never fire.
    pub async fn restart(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let chart = self.chart.clone();
        let redraw_tx = self.redraw_tx.clone();
        let min_tick = self.min_tick;

        let handle = tokio::spawn(async move {
            loop {
                let (chart_id, interval) = {
                    let guard = chart.read().await;
                    if !guard.view().is_live() {
                        break;
                    }
                    let view = guard.view();
                    let interval = redraw_interval(view.visible_duration(), view.viewport_px(), min_tick);
                    (guard.id(), interval)
                };

                time::sleep(interval).await;

                {
                    let mut guard = chart.write().await;
                    if !guard.view().is_live() {
                        break;
                    }
                    guard.scroll_to_now(Utc::now());
                }

                let _ = redraw_tx.send(RedrawRequest::chart(chart_id, RedrawReason::Autoscroll));
            }
            log_debug!("autoscroll stopped: live-follow is off");
        });

        *ticker_guard = Some(handle);
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    pub async fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}
