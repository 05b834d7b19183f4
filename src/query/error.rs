use thiserror::Error;

/// Failures that make a whole polling cycle unusable.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("query request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("query endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("query rejected by server: {0}")]
    Server(String),
    #[error("malformed query response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        FetchError::MalformedResponse(reason.into())
    }
}
