use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Time predicate of one `SELECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFilter {
    /// Strictly newer than an already ingested instant.
    After(DateTime<Utc>),
    /// Relative to the server clock, `time > now() - <window>`.
    Lookback(Duration),
    All,
}

impl TimeFilter {
    /// Incremental filter when a high-water mark exists, else the default
    /// lookback (`None` meaning all time).
    pub fn from_high_water_mark(mark: Option<DateTime<Utc>>, lookback: Option<Duration>) -> Self {
        match (mark, lookback) {
            (Some(mark), _) => TimeFilter::After(mark),
            (None, Some(window)) => TimeFilter::Lookback(window),
            (None, None) => TimeFilter::All,
        }
    }

    fn clause(&self) -> Option<String> {
        match self {
            TimeFilter::After(mark) => Some(format!("time > '{}'", format_instant(*mark))),
            TimeFilter::Lookback(window) => Some(format!("time > now() - {}", format_duration(*window))),
            TimeFilter::All => None,
        }
    }
}

pub fn select_values(measurement: &str, filter: TimeFilter) -> String {
    let mut statement = format!("SELECT value FROM {}", quote_identifier(measurement));
    if let Some(clause) = filter.clause() {
        statement.push_str(" WHERE ");
        statement.push_str(&clause);
    }
    statement
}

pub fn batch_statements<I, S>(statements: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    statements
        .into_iter()
        .map(|statement| format!("{};", statement.as_ref()))
        .collect()
}

pub fn quote_identifier(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// RFC 3339 with full sub-second precision so `time >` never re-selects
/// the newest stored point.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn format_duration(window: Duration) -> String {
    let secs = window.num_seconds().max(0);
    if secs > 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs > 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}
