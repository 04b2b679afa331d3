use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("{0} is not configured")]
    MissingConfig(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    InvalidConfig { var: String, value: String },
    #[error("request to order store failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("order store returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("failed to decode orders: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AnalyzerError {
    /// True for failures detected before any query was attempted.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            AnalyzerError::MissingConfig(_) | AnalyzerError::InvalidConfig { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
