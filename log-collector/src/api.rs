use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use log_common::{InvalidDateFormat, RecordError, StoreError};

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct IngestResponse {
    pub message: String,
}

impl IngestResponse {
    pub fn received() -> Self {
        Self {
            message: "log received successfully".to_owned(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    MalformedRequest(String),
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error(transparent)]
    InvalidDateFormat(#[from] InvalidDateFormat),
    #[error("missing or invalid bearer token")]
    Unauthorized,
    #[error("failed to {operation}")]
    StorageFailure {
        operation: &'static str,
        #[source]
        error: StoreError,
    },
}

impl From<RecordError> for ApiError {
    fn from(error: RecordError) -> Self {
        match error {
            RecordError::Malformed(_) => ApiError::MalformedRequest(error.to_string()),
            RecordError::MissingField(field) => ApiError::MissingField(field),
            RecordError::InvalidField { field, reason } => ApiError::InvalidField { field, reason },
        }
    }
}

impl ApiError {
    pub fn storage(operation: &'static str, error: StoreError) -> Self {
        ApiError::StorageFailure { operation, error }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            // Rejected payloads answer 500, not 400.
            ApiError::MalformedRequest(_)
            | ApiError::MissingField(_)
            | ApiError::InvalidField { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidDateFormat(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::StorageFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::StorageFailure { error, .. } => {
                tracing::error!(error = %error, status = %status, "{}", self);
            }
            _ => tracing::warn!(status = %status, "rejected request: {}", self),
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        let cases = [
            (
                ApiError::from(RecordError::Malformed("eof".to_owned())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(RecordError::MissingField("message")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::InvalidDateFormat(InvalidDateFormat {
                    param: "start_date",
                    value: "yesterday".to_owned(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                ApiError::storage("store log", StoreError::ConnectionError {
                    error: sqlx::Error::PoolClosed,
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.status(), status, "{error}");
        }
    }

    #[test]
    fn storage_failures_hide_the_cause() {
        let error = ApiError::storage(
            "query logs",
            StoreError::QueryError {
                command: "SELECT".to_owned(),
                error: sqlx::Error::PoolClosed,
            },
        );

        assert_eq!(error.to_string(), "failed to query logs");
    }

    #[test]
    fn record_errors_keep_their_reason() {
        let error = ApiError::from(RecordError::InvalidField {
            field: "log_level",
            reason: "must not be empty".to_owned(),
        });

        assert_eq!(
            error.to_string(),
            "invalid field 'log_level': must not be empty"
        );
    }
}
