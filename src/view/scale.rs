use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

/// Value axis kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ScaleKind {
    #[default]
    Linear,
    Log,
}

impl ScaleKind {
    /// Whether `value` can be placed on this axis.
    pub fn accepts(self, value: f64) -> bool {
        match self {
            ScaleKind::Linear => value.is_finite(),
            ScaleKind::Log => value.is_finite() && value > 0.0,
        }
    }
}

/// Fraction of outliers clipped from each end when autoscaling values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PercentileBand {
    /// 1st to 99th percentile.
    #[default]
    Standard,
    /// 0.1th to 99.9th percentile.
    Fine,
}

impl PercentileBand {
    pub fn bounds(self) -> (f64, f64) {
        match self {
            PercentileBand::Standard => (0.01, 0.99),
            PercentileBand::Fine => (0.001, 0.999),
        }
    }
}

/// Linearly interpolated quantile of an ascending slice.
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let fraction = position - lower as f64;
    let base = sorted[lower];
    match sorted.get(lower + 1) {
        Some(next) if fraction > 0.0 => Some(base + fraction * (next - base)),
        _ => Some(base),
    }
}

/// Percentile band of `values`; `None` when nothing usable is left.
pub fn percentile_band(values: &[f64], band: PercentileBand, scale: ScaleKind) -> Option<(f64, f64)> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| scale.accepts(*v)).collect();
    sorted.sort_by(f64::total_cmp);

    let (low, high) = band.bounds();
    Some((quantile(&sorted, low)?, quantile(&sorted, high)?))
}

/// Tick step for roughly `ticks` intervals over `span`, on a 1/2/5 grid.
fn tick_step(span: f64, ticks: f64) -> f64 {
    let mut step = 10f64.powi((span / ticks).log10().floor() as i32);
    let err = ticks / span * step;
    if err <= 0.15 {
        step *= 10.0;
    } else if err <= 0.35 {
        step *= 5.0;
    } else if err <= 0.75 {
        step *= 2.0;
    }
    step
}

/// Widens `(lo, hi)` outward onto tick boundaries.
pub fn nice_range(lo: f64, hi: f64, scale: ScaleKind) -> (f64, f64) {
    let (lo, hi) = ensure_span(lo, hi, scale);
    match scale {
        ScaleKind::Linear => {
            let step = tick_step(hi - lo, 10.0);
            if !step.is_finite() || step <= 0.0 {
                return (lo, hi);
            }
            if step < 1.0 {
                // divide by the integral inverse to keep decimal steps exact
                let inv = (1.0 / step).round();
                ((lo * inv).floor() / inv, (hi * inv).ceil() / inv)
            } else {
                ((lo / step).floor() * step, (hi / step).ceil() * step)
            }
        }
        ScaleKind::Log => (
            10f64.powi(lo.log10().floor() as i32),
            10f64.powi(hi.log10().ceil() as i32),
        ),
    }
}

/// Makes sure `lo < hi`, widening a collapsed range around its value.
pub fn ensure_span(lo: f64, hi: f64, scale: ScaleKind) -> (f64, f64) {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    if lo < hi {
        return (lo, hi);
    }
    match scale {
        ScaleKind::Linear => (lo - 1.0, hi + 1.0),
        ScaleKind::Log => (lo / 10.0, hi * 10.0),
    }
}

/// Widens a time range outward to whole hours.
pub fn nice_time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let hour = Duration::hours(1);
    let floor = start.duration_trunc(hour).unwrap_or(start);
    let mut ceil = end.duration_trunc(hour).unwrap_or(end);
    if ceil < end {
        ceil += hour;
    }
    if ceil <= floor {
        ceil = floor + hour;
    }
    (floor, ceil)
}
