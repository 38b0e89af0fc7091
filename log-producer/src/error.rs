use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("request to collector failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("collector responded with {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProducerError {
    /// Label used for the outcome of a failed send.
    pub fn outcome(&self) -> &'static str {
        match self {
            ProducerError::Request(error) if error.is_timeout() => "timeout",
            ProducerError::Request(_) => "request_error",
            ProducerError::UnexpectedStatus { .. } => "rejected",
            ProducerError::InvalidConfig(_) => "invalid_config",
        }
    }
}
