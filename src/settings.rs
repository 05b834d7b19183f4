use anyhow::{bail, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path, time::Duration as StdDuration};

use crate::spans::OpenSpanMarker;
use crate::view::{FollowOnZoom, PercentileBand, ScaleKind};

pub const DEFAULT_CONFIG_PATH: &str = "livegraph.json";
pub const CONFIG_PATH_ENV: &str = "LIVEGRAPH_CONFIG";
pub const DEBUG_ENV: &str = "LIVEGRAPH_DEBUG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluxSettings {
    pub url: String,
    pub database: String,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl Default for InfluxSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086/query".into(),
            database: "mqtt".into(),
            request_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateFeedSettings {
    pub measurement: String,
    pub open_span_marker: OpenSpanMarker,
}

impl Default for StateFeedSettings {
    fn default() -> Self {
        Self {
            measurement: "revspace/state".into(),
            open_span_marker: OpenSpanMarker::Now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewSettings {
    pub band: PercentileBand,
    /// Round derived domains outward to readable values.
    pub nice: bool,
    /// Lower bound of the autoscroll cadence.
    pub min_tick_ms: u64,
    pub follow_on_zoom: FollowOnZoom,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            band: PercentileBand::Standard,
            nice: true,
            min_tick_ms: 50,
            follow_on_zoom: FollowOnZoom::Disable,
        }
    }
}

impl ViewSettings {
    pub fn min_tick(&self) -> StdDuration {
        StdDuration::from_millis(self.min_tick_ms.max(1))
    }
}

/// One chart: a set of topics sharing a unit and axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    #[serde(default)]
    pub topic_prefix: String,
    pub topics: Vec<String>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub value_range: Option<[f64; 2]>,
    #[serde(default = "default_interpolation")]
    pub interpolation: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub scale: ScaleKind,
    #[serde(default = "default_viewport_width")]
    pub viewport_width_px: u32,
}

fn default_interpolation() -> String {
    "linear".into()
}

fn default_viewport_width() -> u32 {
    // 960px canvas minus 60px margins on both sides
    840
}

impl ChannelConfig {
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topic_prefix: String::new(),
            topics: topics.into_iter().map(Into::into).collect(),
            unit: String::new(),
            value_range: None,
            interpolation: default_interpolation(),
            title: String::new(),
            scale: ScaleKind::Linear,
            viewport_width_px: default_viewport_width(),
        }
    }

    /// Store keys, i.e. topics with the prefix applied.
    pub fn channel_keys(&self) -> Vec<String> {
        self.topics
            .iter()
            .map(|topic| format!("{}{}", self.topic_prefix, topic))
            .collect()
    }

    /// Legend names, i.e. topics without the prefix.
    pub fn names(&self) -> &[String] {
        &self.topics
    }

    fn validate(&self, idx: usize) -> Result<()> {
        if self.topics.is_empty() {
            bail!("chart {idx} has no topics");
        }
        if self.viewport_width_px == 0 {
            bail!("chart {idx} has a zero viewport width");
        }
        let mut seen = HashSet::new();
        if let Some(topic) = self.topics.iter().find(|topic| !seen.insert(topic.as_str())) {
            bail!("chart {idx} lists topic '{topic}' more than once");
        }
        if let Some([lo, hi]) = self.value_range {
            if !(lo < hi) {
                bail!("chart {idx} has an empty value range {lo}..{hi}");
            }
            if !self.scale.accepts(lo) {
                bail!("chart {idx} uses a log scale with non-positive value range {lo}..{hi}");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSettings {
    pub influx: InfluxSettings,
    pub update_interval_ms: u64,
    /// Window fetched before a channel has any data; `None` fetches all time.
    pub lookback_secs: Option<u64>,
    pub state: Option<StateFeedSettings>,
    pub view: ViewSettings,
    pub charts: Vec<ChannelConfig>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            influx: InfluxSettings::default(),
            update_interval_ms: 10_000,
            lookback_secs: Some(24 * 60 * 60),
            state: Some(StateFeedSettings::default()),
            view: ViewSettings::default(),
            charts: Vec::new(),
        }
    }
}

impl DashboardSettings {
    /// Reads settings from `path`, falling back to defaults when it does
    /// not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let settings: Self = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings in {}", path.display()))?
        } else {
            Self::default()
        };

        settings.validate()?;
        Ok(settings.with_env_overrides())
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(contents).context("Failed to parse settings")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.update_interval_ms == 0 {
            bail!("updateIntervalMs must be greater than zero");
        }
        for (idx, chart) in self.charts.iter().enumerate() {
            chart.validate(idx)?;
        }
        Ok(())
    }

    fn with_env_overrides(mut self) -> Self {
        let debug_mode = std::env::var(DEBUG_ENV)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.update_interval_ms = 1_000;
        }
        self
    }

    pub fn update_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.update_interval_ms)
    }

    pub fn lookback(&self) -> Option<Duration> {
        const MAX_LOOKBACK_SECS: u64 = 100 * 365 * 24 * 60 * 60;
        self.lookback_secs
            .map(|secs| Duration::seconds(secs.min(MAX_LOOKBACK_SECS) as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_chart_config() {
        let settings = DashboardSettings::from_json(
            r#"{"charts":[{"topicPrefix":"sensor/","topics":["temp","humidity"],"unit":"°C","scale":"log"}]}"#,
        )
        .unwrap();

        assert_eq!(settings.update_interval_ms, 10_000);
        assert_eq!(settings.lookback(), Some(Duration::hours(24)));
        let chart = &settings.charts[0];
        assert_eq!(chart.channel_keys(), vec!["sensor/temp", "sensor/humidity"]);
        assert_eq!(chart.names(), ["temp", "humidity"]);
        assert_eq!(chart.scale, ScaleKind::Log);
        assert_eq!(chart.viewport_width_px, 840);
        assert_eq!(chart.interpolation, "linear");
    }

    #[test]
    fn rejects_inverted_value_range() {
        let result =
            DashboardSettings::from_json(r#"{"charts":[{"topics":["a"],"valueRange":[10,0]}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_duplicate_topics() {
        let err = DashboardSettings::from_json(r#"{"charts":[{"topics":["a","a","b"]}]}"#).unwrap_err();
        assert!(err.to_string().contains("more than once"), "{err}");
    }

    #[test]
    fn log_scale_needs_positive_value_range() {
        assert!(DashboardSettings::from_json(
            r#"{"charts":[{"topics":["a"],"scale":"log","valueRange":[0,100]}]}"#
        )
        .is_err());
        assert!(DashboardSettings::from_json(
            r#"{"charts":[{"topics":["a"],"scale":"log","valueRange":[0.1,100]}]}"#
        )
        .is_ok());
        assert!(DashboardSettings::from_json(r#"{"charts":[{"topics":["a"],"valueRange":[-5,5]}]}"#).is_ok());
    }

    #[test]
    fn state_feed_can_be_disabled() {
        let settings =
            DashboardSettings::from_json(r#"{"state":null,"lookbackSecs":null}"#).unwrap();
        assert!(settings.state.is_none());
        assert_eq!(settings.lookback(), None);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let settings = DashboardSettings::load(Path::new("/nonexistent/livegraph.json")).unwrap();
        assert!(settings.charts.is_empty());
        assert_eq!(
            settings.state.map(|s| s.measurement),
            Some("revspace/state".to_string())
        );
    }
}
