pub mod handle;
pub mod snapshot;
pub mod state;

pub use handle::ChartHandle;
pub use snapshot::{RenderSnapshot, SeriesSnapshot};
pub use state::{ChartState, SharedChart};

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawReason {
    DataArrived,
    Autoscaled,
    Autoscroll,
    Gesture,
    SpansUpdated,
}

/// Asks the renderer to repaint; `chart == None` means every chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedrawRequest {
    pub chart: Option<usize>,
    pub reason: RedrawReason,
}

impl RedrawRequest {
    pub fn chart(id: usize, reason: RedrawReason) -> Self {
        Self {
            chart: Some(id),
            reason,
        }
    }

    pub fn all(reason: RedrawReason) -> Self {
        Self { chart: None, reason }
    }
}

pub type RedrawSender = mpsc::UnboundedSender<RedrawRequest>;
pub type RedrawReceiver = mpsc::UnboundedReceiver<RedrawRequest>;

pub fn redraw_channel() -> (RedrawSender, RedrawReceiver) {
    mpsc::unbounded_channel()
}
