use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Wire format of `received_at` in query responses, and of the timestamp producers report.
pub const RECEIVED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format accepted for the `start_date` and `end_date` query parameters.
pub const QUERY_BOUND_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub trait TimeSource {
    /// Return the current instant, in UTC.
    fn current_time(&self) -> DateTime<Utc>;
}

#[derive(Clone)]
pub struct SystemTime {}

impl TimeSource for SystemTime {
    fn current_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub fn format_timestamp(datetime: &DateTime<Utc>) -> String {
    datetime.format(RECEIVED_AT_FORMAT).to_string()
}

pub fn parse_timestamp(formatted: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(formatted, RECEIVED_AT_FORMAT)
        .ok()
        .map(|d| d.and_utc())
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid date format for '{param}', use YYYY-MM-DDTHH:MM")]
pub struct InvalidDateFormat {
    pub param: &'static str,
    pub value: String,
}

/// An inclusive range over `received_at`. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Build a range from the raw `start_date` and `end_date` query parameters.
    /// Bounds are naive wall-clock values, read on the same UTC clock that stamps `received_at`.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, InvalidDateFormat> {
        Ok(Self {
            start: parse_bound("start_date", start)?,
            end: parse_bound("end_date", end)?,
        })
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| start <= *instant)
            && self.end.map_or(true, |end| *instant <= end)
    }
}

fn parse_bound(
    param: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, InvalidDateFormat> {
    match value {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDateTime::parse_from_str(raw, QUERY_BOUND_FORMAT)
            .map(|d| Some(d.and_utc()))
            .map_err(|_| InvalidDateFormat {
                param,
                value: raw.to_owned(),
            }),
    }
}
