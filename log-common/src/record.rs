use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::time::{format_timestamp, parse_timestamp};

pub const MAX_SERVICE_NAME_LEN: usize = 50;
pub const MAX_LOG_LEVEL_LEN: usize = 20;
pub const MAX_MESSAGE_LEN: usize = 200;

/// Enumeration of reasons an ingestion payload can be rejected.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    #[error("malformed request body: {0}")]
    Malformed(String),
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// A log record as submitted by a producer, before the store assigns `id` and `received_at`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewLogRecord {
    /// Event time as reported by the producer. Opaque to the collector.
    pub timestamp: String,
    pub service_name: String,
    pub log_level: String,
    pub message: String,
}

impl NewLogRecord {
    /// Parse and validate a request body. Extra fields are ignored.
    pub fn from_json(body: &[u8]) -> Result<Self, RecordError> {
        let payload: Value =
            serde_json::from_slice(body).map_err(|e| RecordError::Malformed(e.to_string()))?;
        let object = payload
            .as_object()
            .ok_or_else(|| RecordError::Malformed("expected a JSON object".to_owned()))?;

        let record = Self {
            timestamp: required_string(object, "timestamp")?,
            service_name: required_string(object, "service_name")?,
            log_level: required_string(object, "log_level")?,
            message: required_string(object, "message")?,
        };
        record.validate()?;

        Ok(record)
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        check_length("timestamp", &self.timestamp, None)?;
        check_length(
            "service_name",
            &self.service_name,
            Some(MAX_SERVICE_NAME_LEN),
        )?;
        check_length("log_level", &self.log_level, Some(MAX_LOG_LEVEL_LEN))?;
        check_length("message", &self.message, Some(MAX_MESSAGE_LEN))?;
        Ok(())
    }
}

fn required_string(object: &Map<String, Value>, field: &'static str) -> Result<String, RecordError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(RecordError::MissingField(field)),
        Some(Value::String(value)) => Ok(value.to_owned()),
        Some(_) => Err(RecordError::InvalidField {
            field,
            reason: "must be a string".to_owned(),
        }),
    }
}

fn check_length(field: &'static str, value: &str, max_len: Option<usize>) -> Result<(), RecordError> {
    if value.is_empty() {
        return Err(RecordError::InvalidField {
            field,
            reason: "must not be empty".to_owned(),
        });
    }

    match max_len {
        Some(max_len) if value.chars().count() > max_len => Err(RecordError::InvalidField {
            field,
            reason: format!("must be at most {} characters", max_len),
        }),
        _ => Ok(()),
    }
}

/// A stored log record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub id: i64,
    pub timestamp: String,
    pub service_name: String,
    pub log_level: String,
    pub message: String,
    #[serde(
        serialize_with = "serialize_received_at",
        deserialize_with = "deserialize_received_at"
    )]
    pub received_at: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(id: i64, record: NewLogRecord, received_at: DateTime<Utc>) -> Self {
        Self {
            id,
            timestamp: record.timestamp,
            service_name: record.service_name,
            log_level: record.log_level,
            message: record.message,
            received_at,
        }
    }
}

pub fn serialize_received_at<S>(datetime: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(datetime))
}

pub fn deserialize_received_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let formatted: String = Deserialize::deserialize(deserializer)?;
    parse_timestamp(&formatted).ok_or_else(|| serde::de::Error::custom("invalid received_at format"))
}
