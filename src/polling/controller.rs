use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::query::QuerySource;

use super::feeds::Feed;
use super::loop_worker::poll_loop;

/// Owns the polling tasks of every feed and shuts them down together.
pub struct PollerController {
    handles: Vec<JoinHandle<()>>,
    cancel_token: CancellationToken,
    stopped: bool,
}

impl PollerController {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
            cancel_token: CancellationToken::new(),
            stopped: false,
        }
    }

    pub fn spawn_feed<F, S>(&mut self, feed: F, source: Arc<S>, interval: Duration) -> Result<()>
    where
        F: Feed,
        S: QuerySource,
    {
        if self.stopped {
            bail!("poller already stopped");
        }
        if interval.is_zero() {
            bail!("poll interval must be greater than zero");
        }

        let token = self.cancel_token.child_token();
        self.handles.push(tokio::spawn(poll_loop(feed, source, interval, token)));
        Ok(())
    }

    pub fn active_feeds(&self) -> usize {
        self.handles.iter().filter(|handle| !handle.is_finished()).count()
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.stopped = true;
        self.cancel_token.cancel();

        let count = self.handles.len();
        for handle in self.handles.drain(..) {
            handle.await.context("polling loop task failed to join")?;
        }
        info!("stopped {count} polling loops");
        Ok(())
    }
}

impl Default for PollerController {
    fn default() -> Self {
        Self::new()
    }
}
