pub mod client;
pub mod envelope;
pub mod error;
pub mod statement;

pub use client::{InfluxClient, QuerySource};
pub use envelope::{decode_samples, decode_state_events, DecodedBatch, DecodedSeries, QueryResponse};
pub use error::FetchError;
pub use statement::{batch_statements, select_values, TimeFilter};
