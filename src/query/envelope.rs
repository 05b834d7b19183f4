use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::models::{Sample, StateEvent};
use crate::query::error::FetchError;

/// Body of an InfluxDB 1.x `/query` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Option<Vec<StatementResult>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub statement_id: Option<u32>,
    #[serde(default)]
    pub series: Option<Vec<Series>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Series {
    pub name: String,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl Series {
    /// Column holding the payload; `value` when named, otherwise the first
    /// column after `time`.
    fn value_column(&self) -> usize {
        self.columns
            .as_ref()
            .and_then(|columns| columns.iter().position(|c| c == "value"))
            .unwrap_or(1)
    }
}

impl QueryResponse {
    pub fn from_slice(body: &[u8]) -> Result<Self, FetchError> {
        serde_json::from_slice(body).map_err(|err| FetchError::malformed(err.to_string()))
    }

    /// All series across every statement, or an error when the envelope
    /// is missing or the server reported a failure.
    pub fn series(&self) -> Result<Vec<&Series>, FetchError> {
        if let Some(message) = &self.error {
            return Err(FetchError::Server(message.clone()));
        }
        let results = self
            .results
            .as_ref()
            .ok_or_else(|| FetchError::malformed("results field missing"))?;

        let mut series = Vec::new();
        for result in results {
            if let Some(message) = &result.error {
                return Err(FetchError::Server(message.clone()));
            }
            // no series: empty data set
            if let Some(list) = &result.series {
                series.extend(list.iter());
            }
        }
        Ok(series)
    }
}

/// Rows of one returned series converted to domain values.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSeries<T> {
    pub name: String,
    pub rows: Vec<T>,
}

/// Decoded series of one response plus the names that were left undecoded
/// because no configured channel matched them.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBatch<T> {
    pub series: Vec<DecodedSeries<T>>,
    pub skipped: Vec<String>,
}

/// Decodes the numeric series accepted by `is_known`; other series are
/// only reported by name, so their rows can never fail the batch.
pub fn decode_samples<K>(response: &QueryResponse, is_known: K) -> Result<DecodedBatch<Sample>, FetchError>
where
    K: Fn(&str) -> bool,
{
    decode_with(response, is_known, |series, row| {
        let timestamp = parse_time(&series.name, row)?;
        match row.get(series.value_column()) {
            Some(Value::Number(number)) => number
                .as_f64()
                .map(|value| Some(Sample::new(timestamp, value)))
                .ok_or_else(|| FetchError::malformed(format!("non-finite value in '{}'", series.name))),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Err(FetchError::malformed(format!(
                "unexpected value {other} in '{}'",
                series.name
            ))),
        }
    })
}

pub fn decode_state_events<K>(response: &QueryResponse, is_known: K) -> Result<DecodedBatch<StateEvent>, FetchError>
where
    K: Fn(&str) -> bool,
{
    decode_with(response, is_known, |series, row| {
        let timestamp = parse_time(&series.name, row)?;
        let label = match row.get(series.value_column()) {
            Some(Value::String(label)) => label.clone(),
            Some(Value::Null) | None => return Ok(None),
            Some(other @ (Value::Number(_) | Value::Bool(_))) => other.to_string(),
            Some(other) => {
                return Err(FetchError::malformed(format!(
                    "unexpected state {other} in '{}'",
                    series.name
                )))
            }
        };
        Ok(Some(StateEvent::new(timestamp, label)))
    })
}

fn decode_with<T, K, F>(response: &QueryResponse, is_known: K, mut row_fn: F) -> Result<DecodedBatch<T>, FetchError>
where
    K: Fn(&str) -> bool,
    F: FnMut(&Series, &[Value]) -> Result<Option<T>, FetchError>,
{
    let mut batch = DecodedBatch {
        series: Vec::new(),
        skipped: Vec::new(),
    };

    for series in response.series()? {
        if !is_known(&series.name) {
            batch.skipped.push(series.name.clone());
            continue;
        }
        let mut rows = Vec::with_capacity(series.values.len());
        for row in &series.values {
            if let Some(decoded) = row_fn(series, row)? {
                rows.push(decoded);
            }
        }
        batch.series.push(DecodedSeries {
            name: series.name.clone(),
            rows,
        });
    }

    Ok(batch)
}

fn parse_time(series: &str, row: &[Value]) -> Result<DateTime<Utc>, FetchError> {
    let raw = row
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| FetchError::malformed(format!("row without timestamp in '{series}'")))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| FetchError::malformed(format!("invalid timestamp '{raw}' in '{series}': {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn any(_: &str) -> bool {
        true
    }

    fn parse(body: &str) -> QueryResponse {
        QueryResponse::from_slice(body.as_bytes()).unwrap()
    }

    #[test]
    fn decodes_samples_per_series() {
        let response = parse(
            r#"{"results":[
                {"statement_id":0,"series":[{"name":"sensor/temp","columns":["time","value"],
                  "values":[["2024-01-01T00:00:00Z",21.5],["2024-01-01T00:00:10.5Z",null],["2024-01-01T00:00:20Z",22]]}]},
                {"statement_id":1}
            ]}"#,
        );

        let decoded = decode_samples(&response, any).unwrap().series;
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].name, "sensor/temp");
        assert_eq!(
            decoded[0].rows,
            vec![
                Sample::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), 21.5),
                Sample::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 20).unwrap(), 22.0),
            ]
        );
    }

    #[test]
    fn empty_results_are_not_errors() {
        assert!(decode_samples(&parse(r#"{"results":[]}"#), any).unwrap().series.is_empty());
        assert!(decode_samples(&parse(r#"{"results":[{"statement_id":0}]}"#), any)
            .unwrap()
            .series
            .is_empty());
    }

    #[test]
    fn missing_results_is_malformed() {
        let err = decode_samples(&parse("{}"), any).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(_)));

        assert!(matches!(
            QueryResponse::from_slice(b"<html>"),
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn server_errors_are_surfaced() {
        let err = decode_samples(&parse(r#"{"error":"database not found: mqtt"}"#), any).unwrap_err();
        assert!(matches!(err, FetchError::Server(_)));

        let err = decode_samples(&parse(r#"{"results":[{"statement_id":0,"error":"bad query"}]}"#), any)
            .unwrap_err();
        assert!(matches!(err, FetchError::Server(_)));
    }

    #[test]
    fn bad_row_rejects_whole_response() {
        let response = parse(
            r#"{"results":[{"series":[
                {"name":"a","values":[["2024-01-01T00:00:00Z",1]]},
                {"name":"b","values":[["yesterday",2]]}
            ]}]}"#,
        );
        assert!(matches!(
            decode_samples(&response, any),
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn unknown_series_rows_are_never_decoded() {
        let response = parse(
            r#"{"results":[{"series":[
                {"name":"sensor/unknown","values":[["2024-01-01T00:00:00Z","on"]]},
                {"name":"sensor/temp","values":[["2024-01-01T00:00:00Z",21.5]]}
            ]}]}"#,
        );

        let batch = decode_samples(&response, |name| name == "sensor/temp").unwrap();
        assert_eq!(batch.skipped, vec!["sensor/unknown".to_string()]);
        assert_eq!(batch.series.len(), 1);
        assert_eq!(batch.series[0].rows[0].value, 21.5);
    }

    #[test]
    fn state_labels_accept_scalars() {
        let response = parse(
            r#"{"results":[{"series":[{"name":"space/state","columns":["time","value"],
                "values":[["2024-01-01T00:00:00Z","open"],["2024-01-01T00:01:00Z",true],["2024-01-01T00:02:00Z",null]]}]}]}"#,
        );

        let decoded = decode_state_events(&response, any).unwrap().series;
        let labels: Vec<&str> = decoded[0].rows.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["open", "true"]);
    }

    #[test]
    fn named_value_column_wins() {
        let response = parse(
            r#"{"results":[{"series":[{"name":"space/state","columns":["time","source","value"],
                "values":[["2024-01-01T00:00:00Z","bot","closed"]]}]}]}"#,
        );

        let decoded = decode_state_events(&response, any).unwrap().series;
        assert_eq!(decoded[0].rows[0].label, "closed");
    }
}
