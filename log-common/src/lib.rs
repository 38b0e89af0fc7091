pub mod config;
pub mod metrics;
pub mod record;
pub mod store;
pub mod time;

pub use config::EnvMsDuration;
pub use record::{LogRecord, NewLogRecord, RecordError};
pub use store::{LogStore, SqliteLogStore, StoreError, StoreResult};
pub use time::{format_timestamp, InvalidDateFormat, SystemTime, TimeRange, TimeSource};
