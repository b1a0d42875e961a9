use invite_common::invitation::ParseError;
use invite_common::queue::QueueError;
use reqwest::StatusCode;
use thiserror::Error;

/// Enumeration of errors that can occur while delivering an invitation to the SMS API.
/// Every variant carries the target url.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("API failed: {url} is not a valid url: {error}")]
    InvalidUrl { url: String, error: url::ParseError },
    #[error("API failed: {url} could not be reached: {error}")]
    Transport { url: String, error: reqwest::Error },
    #[error("API failed: {url} responded with {status}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
}

impl DeliveryError {
    pub fn url(&self) -> &str {
        match self {
            DeliveryError::InvalidUrl { url, .. }
            | DeliveryError::Transport { url, .. }
            | DeliveryError::Status { url, .. } => url,
        }
    }
}

/// Enumeration of errors that abort a worker run.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("invalid configuration: {0}")]
    ConfigurationError(String),
    #[error("failed to resolve queue: {0}")]
    QueueResolutionError(QueueError),
    #[error(transparent)]
    QueueError(#[from] QueueError),
    #[error(transparent)]
    ParseError(#[from] ParseError),
    #[error(transparent)]
    DeliveryError(#[from] DeliveryError),
}

impl From<envconfig::Error> for WorkerError {
    fn from(error: envconfig::Error) -> Self {
        WorkerError::ConfigurationError(error.to_string())
    }
}
