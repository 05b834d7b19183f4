use std::future::Future;
use std::time::Duration;

use log::debug;

use crate::query::envelope::QueryResponse;
use crate::query::error::FetchError;
use crate::settings::InfluxSettings;

/// Pull primitive of the time-series database.
pub trait QuerySource: Send + Sync + 'static {
    fn fetch(&self, query: &str) -> impl Future<Output = Result<QueryResponse, FetchError>> + Send;
}

/// InfluxDB 1.x HTTP client (`GET /query?db=..&q=..`).
#[derive(Clone)]
pub struct InfluxClient {
    http: reqwest::Client,
    url: String,
    database: String,
}

impl InfluxClient {
    pub fn new(settings: &InfluxSettings) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout_ms) = settings.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let http = builder.build().unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            url: settings.url.clone(),
            database: settings.database.clone(),
        }
    }
}

impl QuerySource for InfluxClient {
    async fn fetch(&self, query: &str) -> Result<QueryResponse, FetchError> {
        debug!("influx query: {query}");

        let response = self
            .http
            .get(&self.url)
            .query(&[("db", self.database.as_str()), ("q", query)])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            // InfluxDB reports query errors as JSON with a 4xx status.
            if let Ok(QueryResponse { error: Some(message), .. }) = QueryResponse::from_slice(&body) {
                return Err(FetchError::Server(message));
            }
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        QueryResponse::from_slice(&body)
    }
}
