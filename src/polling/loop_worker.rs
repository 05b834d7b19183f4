use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::query::QuerySource;

use super::feeds::{run_cycle, CycleOutcome, Feed};
use super::sequencer::RequestSequencer;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Polls `feed` every `interval` until cancelled.
///
/// Each cycle runs as its own task so a hung request never holds back the
/// cadence; requests still in flight are aborted on shutdown.
pub async fn poll_loop<F, S>(feed: F, source: Arc<S>, interval: Duration, cancel_token: CancellationToken)
where
    F: Feed,
    S: QuerySource,
{
    let sequencer = Arc::new(RequestSequencer::new());
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut in_flight: JoinSet<CycleOutcome> = JoinSet::new();

    log_info!("{}: polling every {}ms", feed.label(), interval.as_millis());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let feed = feed.clone();
                let source = Arc::clone(&source);
                let sequencer = Arc::clone(&sequencer);
                in_flight.spawn(async move {
                    run_cycle(&feed, source.as_ref(), &sequencer).await
                });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                match joined {
                    Ok(CycleOutcome::Applied(report)) if report.appended > 0 => {
                        log_debug!("{}: ingested {} points", feed.label(), report.appended);
                    }
                    Ok(_) => {}
                    Err(err) if err.is_cancelled() => {}
                    Err(err) => log_error!("{}: poll cycle panicked: {err}", feed.label()),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("{}: polling loop shutting down", feed.label());
                break;
            }
        }
    }

    in_flight.abort_all();
}
