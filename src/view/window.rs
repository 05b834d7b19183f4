use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::{ChannelConfig, ViewSettings};
use crate::store::TimeSeriesStore;
use crate::view::scale::{ensure_span, nice_range, nice_time_range, percentile_band, PercentileBand, ScaleKind};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("time range must end after it starts")]
    EmptyTimeRange,
    #[error("value range {0}..{1} is empty or not finite")]
    EmptyValueRange(f64, f64),
    #[error("window width must be positive")]
    NonPositiveWidth,
    #[error("window width reaches outside the representable time range")]
    WidthOutOfRange,
    #[error("value range {0}..{1} is not positive on a log scale")]
    NonPositiveLogRange(f64, f64),
}

/// What an explicit zoom or pan does to live-follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FollowOnZoom {
    #[default]
    Disable,
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub value_min: f64,
    pub value_max: f64,
}

impl Domain {
    pub fn width(&self) -> Duration {
        self.time_end - self.time_start
    }

    pub fn midpoint(&self) -> DateTime<Utc> {
        self.time_start + self.width() / 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewOptions {
    pub scale: ScaleKind,
    pub band: PercentileBand,
    pub nice: bool,
    pub follow_on_zoom: FollowOnZoom,
    pub viewport_px: u32,
    pub initial_values: Option<(f64, f64)>,
}

impl ViewOptions {
    pub fn for_chart(chart: &ChannelConfig, view: &ViewSettings) -> Self {
        Self {
            scale: chart.scale,
            band: view.band,
            nice: view.nice,
            follow_on_zoom: view.follow_on_zoom,
            viewport_px: chart.viewport_width_px,
            initial_values: chart.value_range.map(|[lo, hi]| (lo, hi)),
        }
    }
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            scale: ScaleKind::Linear,
            band: PercentileBand::Standard,
            nice: true,
            follow_on_zoom: FollowOnZoom::Disable,
            viewport_px: 840,
            initial_values: None,
        }
    }
}

/// Visible time and value window of one chart.
///
/// Every change to the time domain re-derives the value domain from the
/// samples inside it unless the caller supplies the value range itself.
#[derive(Debug, Clone)]
pub struct ViewWindow {
    domain: Domain,
    live_follow: bool,
    options: ViewOptions,
}

impl ViewWindow {
    /// Empty window covering the hour before `now`.
    pub fn new(options: ViewOptions, now: DateTime<Utc>) -> Self {
        let (value_min, value_max) = options
            .initial_values
            .map(|(lo, hi)| ensure_span(lo, hi, options.scale))
            .unwrap_or_else(|| default_values(options.scale));

        Self {
            domain: Domain {
                time_start: now - Duration::hours(1),
                time_end: now,
                value_min,
                value_max,
            },
            live_follow: false,
            options,
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn is_live(&self) -> bool {
        self.live_follow
    }

    pub fn set_live(&mut self, live: bool) {
        self.live_follow = live;
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn viewport_px(&self) -> u32 {
        self.options.viewport_px
    }

    pub fn visible_duration(&self) -> Duration {
        self.domain.width()
    }

    /// Fits the time domain to all stored samples and the value domain to
    /// the percentile band inside it. No-op on an empty store.
    pub fn autoscale_full(&mut self, store: &TimeSeriesStore) {
        let Some((first, last)) = store.time_extent() else {
            return;
        };
        let (start, end) = if self.options.nice {
            nice_time_range(first, last)
        } else if first < last {
            (first, last)
        } else {
            let pad = Duration::minutes(30);
            (
                first.checked_sub_signed(pad).unwrap_or(first),
                last.checked_add_signed(pad).unwrap_or(last),
            )
        };

        self.domain.time_start = start;
        self.domain.time_end = end;
        self.rederive_values(store);
    }

    /// Resizes the window around its midpoint, then follows now.
    pub fn set_width(&mut self, width: Duration, store: &TimeSeriesStore, now: DateTime<Utc>) -> Result<(), ViewError> {
        if width <= Duration::zero() {
            return Err(ViewError::NonPositiveWidth);
        }
        now.checked_sub_signed(width).ok_or(ViewError::WidthOutOfRange)?;

        let center = self.domain.midpoint();
        let start = center
            .checked_sub_signed(width / 2)
            .ok_or(ViewError::WidthOutOfRange)?;
        let end = start.checked_add_signed(width).ok_or(ViewError::WidthOutOfRange)?;
        self.domain.time_start = start;
        self.domain.time_end = end;

        self.live_follow = true;
        self.scroll_to_now(store, now);
        Ok(())
    }

    /// Moves the window so it ends at `now`, keeping its width.
    pub fn scroll_to_now(&mut self, store: &TimeSeriesStore, now: DateTime<Utc>) {
        let width = self.domain.width();
        self.domain.time_end = now;
        self.domain.time_start = now.checked_sub_signed(width).unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.rederive_values(store);
    }

    /// Applies a user zoom or pan. The time range is taken as given; the
    /// value range is re-derived unless `values` overrides it.
    pub fn zoom_to(
        &mut self,
        time: (DateTime<Utc>, DateTime<Utc>),
        values: Option<(f64, f64)>,
        store: &TimeSeriesStore,
    ) -> Result<(), ViewError> {
        let (start, end) = time;
        if end <= start {
            return Err(ViewError::EmptyTimeRange);
        }
        if let Some((lo, hi)) = values {
            if !(lo < hi) || !lo.is_finite() || !hi.is_finite() {
                return Err(ViewError::EmptyValueRange(lo, hi));
            }
            if !self.options.scale.accepts(lo) {
                return Err(ViewError::NonPositiveLogRange(lo, hi));
            }
        }

        self.domain.time_start = start;
        self.domain.time_end = end;
        if self.options.follow_on_zoom == FollowOnZoom::Disable {
            self.live_follow = false;
        }

        match values {
            Some((lo, hi)) => {
                self.domain.value_min = lo;
                self.domain.value_max = hi;
            }
            None => {
                self.rederive_values(store);
            }
        }
        Ok(())
    }

    /// Fits the value domain to the visible slice. Returns false and keeps
    /// the current domain when the slice holds no plottable values.
    pub fn rederive_values(&mut self, store: &TimeSeriesStore) -> bool {
        let values = store.values_between(self.domain.time_start, self.domain.time_end);
        let Some((lo, hi)) = percentile_band(&values, self.options.band, self.options.scale) else {
            return false;
        };

        let (lo, hi) = if self.options.nice {
            nice_range(lo, hi, self.options.scale)
        } else {
            ensure_span(lo, hi, self.options.scale)
        };
        self.domain.value_min = lo;
        self.domain.value_max = hi;
        true
    }
}

/// Value axis before any data arrived.
fn default_values(scale: ScaleKind) -> (f64, f64) {
    match scale {
        ScaleKind::Linear => (0.0, 1.0),
        ScaleKind::Log => (1.0, 10.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn raw_options() -> ViewOptions {
        ViewOptions {
            nice: false,
            ..ViewOptions::default()
        }
    }

    /// One sample per second, value equal to its index plus one.
    fn ramp_store(count: i64) -> TimeSeriesStore {
        let mut store = TimeSeriesStore::new(["a"]);
        let samples = (0..count).map(|i| Sample::new(t(i), (i + 1) as f64)).collect();
        store.append("a", samples).unwrap();
        store
    }

    #[test]
    fn autoscale_excludes_outliers() {
        let store = ramp_store(100);
        let mut view = ViewWindow::new(raw_options(), t(0));
        view.autoscale_full(&store);

        let domain = view.domain();
        assert_eq!(domain.time_start, t(0));
        assert_eq!(domain.time_end, t(99));
        assert!(domain.value_min > 1.0 && domain.value_max < 100.0);
        assert!(domain.value_min < domain.value_max);
    }

    #[test]
    fn autoscale_with_nice_rounding() {
        let store = ramp_store(100);
        let mut view = ViewWindow::new(ViewOptions::default(), t(0));
        view.autoscale_full(&store);

        let domain = view.domain();
        assert_eq!(domain.time_start, t(0));
        assert_eq!(domain.time_end, t(3600));
        assert_eq!((domain.value_min, domain.value_max), (0.0, 100.0));
    }

    #[test]
    fn autoscale_on_empty_store_keeps_domain() {
        let store = TimeSeriesStore::new(["a"]);
        let mut view = ViewWindow::new(raw_options(), t(0));
        let before = view.domain();
        view.autoscale_full(&store);
        assert_eq!(view.domain(), before);
    }

    #[test]
    fn set_width_then_scroll_keeps_width_and_ends_now() {
        let store = ramp_store(100);
        let mut view = ViewWindow::new(raw_options(), t(0));
        view.autoscale_full(&store);

        let width = Duration::seconds(30);
        view.set_width(width, &store, t(99)).unwrap();
        assert!(view.is_live());

        view.scroll_to_now(&store, t(100));
        let domain = view.domain();
        assert_eq!(domain.time_end, t(100));
        assert_eq!(domain.width(), width);
        // only values 71..=100 are visible
        assert!(domain.value_min > 70.0);
    }

    #[test]
    fn set_width_rejects_non_positive() {
        let store = TimeSeriesStore::new(["a"]);
        let mut view = ViewWindow::new(raw_options(), t(0));
        assert_eq!(
            view.set_width(Duration::zero(), &store, t(0)),
            Err(ViewError::NonPositiveWidth)
        );
    }

    #[test]
    fn zoom_rederives_values_and_drops_follow() {
        let store = ramp_store(100);
        let mut view = ViewWindow::new(raw_options(), t(0));
        view.set_width(Duration::seconds(60), &store, t(99)).unwrap();

        view.zoom_to((t(10), t(20)), None, &store).unwrap();
        let domain = view.domain();
        assert_eq!((domain.time_start, domain.time_end), (t(10), t(20)));
        assert!(domain.value_min >= 11.0 && domain.value_max <= 21.0);
        assert!(!view.is_live());
    }

    #[test]
    fn set_width_beyond_time_range_is_rejected() {
        let store = ramp_store(10);
        let mut view = ViewWindow::new(raw_options(), t(0));
        let before = view.domain();

        assert_eq!(
            view.set_width(Duration::days(365 * 300_000), &store, t(9)),
            Err(ViewError::WidthOutOfRange)
        );
        assert_eq!(view.domain(), before);
        assert!(!view.is_live());
    }

    #[test]
    fn log_zoom_rejects_non_positive_values() {
        let store = ramp_store(10);
        let options = ViewOptions {
            scale: ScaleKind::Log,
            ..raw_options()
        };
        let mut view = ViewWindow::new(options, t(0));

        assert_eq!(
            view.zoom_to((t(0), t(9)), Some((0.0, 10.0)), &store),
            Err(ViewError::NonPositiveLogRange(0.0, 10.0))
        );
        view.zoom_to((t(0), t(9)), Some((0.5, 10.0)), &store).unwrap();
        assert_eq!(view.domain().value_min, 0.5);
    }

    #[test]
    fn zoom_keeps_follow_when_configured() {
        let store = ramp_store(10);
        let options = ViewOptions {
            follow_on_zoom: FollowOnZoom::Keep,
            ..raw_options()
        };
        let mut view = ViewWindow::new(options, t(0));
        view.set_width(Duration::seconds(5), &store, t(9)).unwrap();

        view.zoom_to((t(0), t(9)), Some((-5.0, 5.0)), &store).unwrap();
        assert!(view.is_live());
        assert_eq!((view.domain().value_min, view.domain().value_max), (-5.0, 5.0));
    }

    #[test]
    fn zoom_rejects_empty_ranges() {
        let store = ramp_store(10);
        let mut view = ViewWindow::new(raw_options(), t(0));
        assert_eq!(
            view.zoom_to((t(5), t(5)), None, &store),
            Err(ViewError::EmptyTimeRange)
        );
        assert!(view.zoom_to((t(0), t(5)), Some((1.0, 1.0)), &store).is_err());
    }

    #[test]
    fn empty_slice_keeps_value_domain() {
        let store = ramp_store(10);
        let mut view = ViewWindow::new(raw_options(), t(0));
        view.autoscale_full(&store);
        let before = view.domain();

        view.zoom_to((t(1000), t(2000)), None, &store).unwrap();
        assert_eq!(view.domain().value_min, before.value_min);
        assert_eq!(view.domain().value_max, before.value_max);
    }

    #[test]
    fn configured_range_seeds_values() {
        let options = ViewOptions {
            initial_values: Some((10.0, 30.0)),
            ..ViewOptions::default()
        };
        let view = ViewWindow::new(options, t(0));
        assert_eq!((view.domain().value_min, view.domain().value_max), (10.0, 30.0));
    }
}
