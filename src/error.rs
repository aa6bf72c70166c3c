use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure of a single page fetch, surfaced only after retries are exhausted.
/// Callers treat this as "this page unavailable", never as fatal to the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited by remote (HTTP 429)")]
    RateLimited,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    /// Timeouts, 429 and 5xx are transient. Other statuses (403, 404, ...)
    /// fail immediately.
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::RateLimited => true,
            FetchError::HttpStatus(code) => *code >= 500,
            FetchError::Network(_) => true,
        }
    }
}
