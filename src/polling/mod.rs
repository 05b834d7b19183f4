pub mod controller;
pub mod feeds;
pub mod loop_worker;
pub mod sequencer;

pub use controller::PollerController;
pub use feeds::{run_cycle, CycleOutcome, CycleReport, Feed, SampleFeed, StateFeed};
pub use sequencer::{RequestSequencer, Ticket};
