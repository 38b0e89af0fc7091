mod health;
mod logs;

pub use health::{index, liveness, readiness};
pub use logs::{get_logs, post_logs, LogsQuery, INGEST_TOTAL};
