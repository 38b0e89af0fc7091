use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{instrument, Span};

use log_common::{format_timestamp, LogRecord, NewLogRecord, TimeRange};

use crate::api::{ApiError, IngestResponse};
use crate::router;

pub const INGEST_TOTAL: &str = "log_collector_ingest_total";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LogsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl LogsQuery {
    /// Pick the bounds out of the raw query pairs. A repeated parameter keeps its first value.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "start_date" => &mut query.start_date,
                "end_date" => &mut query.end_date,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

fn report_ingest(outcome: &'static str) {
    metrics::counter!(INGEST_TOTAL, "outcome" => outcome).increment(1);
}

/// Validate a submitted record, stamp it with the receive time and store it.
#[instrument(skip_all, fields(service_name, log_level, id))]
pub async fn post_logs(
    State(state): State<router::State>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let record = match NewLogRecord::from_json(&body) {
        Ok(record) => record,
        Err(error) => {
            report_ingest("invalid");
            return Err(error.into());
        }
    };

    Span::current().record("service_name", record.service_name.as_str());
    Span::current().record("log_level", record.log_level.as_str());

    let received_at = state.timesource.current_time();

    let stored = state
        .store
        .insert(record, received_at)
        .await
        .map_err(|error| {
            report_ingest("store_error");
            ApiError::storage("store log", error)
        })?;

    Span::current().record("id", stored.id);
    tracing::debug!(
        received_at = %format_timestamp(&stored.received_at),
        "log record stored"
    );
    report_ingest("stored");

    Ok((StatusCode::CREATED, Json(IngestResponse::received())))
}

/// Return every stored record whose receive time falls within the requested bounds.
#[instrument(skip_all, fields(start_date, end_date))]
pub async fn get_logs(
    State(state): State<router::State>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<LogRecord>>, ApiError> {
    let params = LogsQuery::from_pairs(pairs);
    if let Some(start_date) = &params.start_date {
        Span::current().record("start_date", start_date.as_str());
    }
    if let Some(end_date) = &params.end_date {
        Span::current().record("end_date", end_date.as_str());
    }

    let range = TimeRange::parse(params.start_date.as_deref(), params.end_date.as_deref())?;

    let records = state
        .store
        .query(&range)
        .await
        .map_err(|error| ApiError::storage("query logs", error))?;

    tracing::debug!(count = records.len(), "log records queried");

    Ok(Json(records))
}
