use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::Sample;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),
}

/// Result of appending a batch to one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// The channel held no samples before this append.
    pub was_empty: bool,
    pub appended: usize,
}

impl AppendOutcome {
    /// True when this append delivered the channel's first data.
    pub fn is_first_data(&self) -> bool {
        self.was_empty && self.appended > 0
    }
}

#[derive(Debug, Clone)]
pub struct Channel {
    key: String,
    samples: Vec<Sample>,
    high_water_mark: Option<DateTime<Utc>>,
}

impl Channel {
    fn new(key: String) -> Self {
        Self {
            key,
            samples: Vec::new(),
            high_water_mark: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn high_water_mark(&self) -> Option<DateTime<Utc>> {
        self.high_water_mark
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Append-only sample buffers, one per configured channel.
///
/// Channels are fixed at construction and kept in configuration order.
/// Samples are never evicted.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesStore {
    channels: Vec<Channel>,
    index: HashMap<String, usize>,
}

impl TimeSeriesStore {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut store = Self::default();
        for key in keys {
            let key = key.into();
            if store.index.contains_key(&key) {
                continue;
            }
            store.index.insert(key.clone(), store.channels.len());
            store.channels.push(Channel::new(key));
        }
        store
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn channel(&self, key: &str) -> Result<&Channel, StoreError> {
        self.index
            .get(key)
            .map(|&idx| &self.channels[idx])
            .ok_or_else(|| StoreError::UnknownChannel(key.to_string()))
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    /// Extends `key` with `samples`, which must already be in timestamp order.
    pub fn append(&mut self, key: &str, samples: Vec<Sample>) -> Result<AppendOutcome, StoreError> {
        let idx = *self
            .index
            .get(key)
            .ok_or_else(|| StoreError::UnknownChannel(key.to_string()))?;
        let channel = &mut self.channels[idx];

        let was_empty = channel.samples.is_empty();
        let appended = samples.len();

        if let Some(last) = samples.last() {
            channel.high_water_mark = Some(last.timestamp);
            channel.samples.extend(samples);
        }

        Ok(AppendOutcome {
            was_empty,
            appended,
        })
    }

    pub fn high_water_mark(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.channel(key).map(Channel::high_water_mark)
    }

    pub fn all_samples(&self, key: &str) -> Result<&[Sample], StoreError> {
        self.channel(key).map(Channel::samples)
    }

    /// Samples of the given channels combined and sorted by timestamp.
    pub fn merge<'a, I>(&self, keys: I) -> Result<Vec<Sample>, StoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut merged = Vec::new();
        for key in keys {
            merged.extend_from_slice(self.all_samples(key)?);
        }
        merged.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(merged)
    }

    /// Earliest and latest timestamp across all channels.
    pub fn time_extent(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.channels
            .iter()
            .filter_map(|channel| {
                let first = channel.samples.first()?.timestamp;
                let last = channel.samples.last()?.timestamp;
                Some((first, last))
            })
            .reduce(|(lo, hi), (first, last)| (lo.min(first), hi.max(last)))
    }

    /// Values of every sample with `start <= timestamp <= end`.
    pub fn values_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<f64> {
        let mut values = Vec::new();
        for channel in &self.channels {
            let samples = &channel.samples;
            let from = samples.partition_point(|s| s.timestamp < start);
            let to = samples.partition_point(|s| s.timestamp <= end);
            if from < to {
                values.extend(samples[from..to].iter().map(|s| s.value));
            }
        }
        values
    }

    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(Channel::is_empty)
    }
}
