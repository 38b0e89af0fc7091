use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

use crate::record::{LogRecord, NewLogRecord};
use crate::time::TimeRange;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Enumeration of errors for operations with a LogStore.
/// Errors can originate from sqlx and are wrapped by us to provide additional context.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection failed with: {error}")]
    ConnectionError { error: sqlx::Error },
    #[error("migration failed with: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("{command} query failed with: {error}")]
    QueryError { command: String, error: sqlx::Error },
    #[error("log record {id} has an out of range received_at: {micros}")]
    CorruptedRecord { id: i64, micros: i64 },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable, append-only storage of log records.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Persist a record atomically, assigning it a new id.
    async fn insert(
        &self,
        record: NewLogRecord,
        received_at: DateTime<Utc>,
    ) -> StoreResult<LogRecord>;

    /// All records received within `range`, in insertion order.
    async fn query(&self, range: &TimeRange) -> StoreResult<Vec<LogRecord>>;

    async fn count(&self) -> StoreResult<i64>;

    async fn health_check(&self) -> StoreResult<()>;
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    timestamp: String,
    service_name: String,
    log_level: String,
    message: String,
    received_at: i64,
}

impl TryFrom<LogRow> for LogRecord {
    type Error = StoreError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let received_at =
            datetime_from_micros(row.received_at).ok_or(StoreError::CorruptedRecord {
                id: row.id,
                micros: row.received_at,
            })?;

        Ok(LogRecord {
            id: row.id,
            timestamp: row.timestamp,
            service_name: row.service_name,
            log_level: row.log_level,
            message: row.message,
            received_at,
        })
    }
}

/// `received_at` is stored as microseconds since the Unix epoch so range filters compare integers.
fn datetime_from_micros(micros: i64) -> Option<DateTime<Utc>> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok()?;
    DateTime::from_timestamp(secs, nanos)
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// A LogStore implemented on top of a SQLite table.
#[derive(Clone)]
pub struct SqliteLogStore {
    pool: SqlitePool,
}

impl SqliteLogStore {
    /// Open (creating it if needed) the database at `url` and apply pending migrations.
    pub async fn new(url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|error| StoreError::ConnectionError { error })?
            .create_if_missing(true);

        let pool = if is_in_memory(url) {
            // An in-memory database lives only as long as its connection, so keep exactly one.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await
        }
        .map_err(|error| StoreError::ConnectionError { error })?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        MIGRATOR.run(&pool).await?;
        tracing::debug!("log store migrations applied");

        Ok(Self { pool })
    }

    /// Close every connection. Operations issued afterwards fail.
    pub async fn close(&self) {
        self.pool.close().await
    }
}

#[async_trait]
impl LogStore for SqliteLogStore {
    async fn insert(
        &self,
        record: NewLogRecord,
        received_at: DateTime<Utc>,
    ) -> StoreResult<LogRecord> {
        let micros = received_at.timestamp_micros();

        let id: i64 = sqlx::query_scalar(
            r#"
INSERT INTO log_records
    (timestamp, service_name, log_level, message, received_at)
VALUES
    (?, ?, ?, ?, ?)
RETURNING
    id
            "#,
        )
        .bind(&record.timestamp)
        .bind(&record.service_name)
        .bind(&record.log_level)
        .bind(&record.message)
        .bind(micros)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| StoreError::QueryError {
            command: "INSERT".to_owned(),
            error,
        })?;

        let received_at =
            datetime_from_micros(micros).ok_or(StoreError::CorruptedRecord { id, micros })?;

        Ok(LogRecord::new(id, record, received_at))
    }

    async fn query(&self, range: &TimeRange) -> StoreResult<Vec<LogRecord>> {
        let start = range.start.map_or(i64::MIN, |start| start.timestamp_micros());
        let end = range.end.map_or(i64::MAX, |end| end.timestamp_micros());

        let rows: Vec<LogRow> = sqlx::query_as(
            r#"
SELECT
    id, timestamp, service_name, log_level, message, received_at
FROM
    log_records
WHERE
    received_at >= ? AND received_at <= ?
ORDER BY
    id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| StoreError::QueryError {
            command: "SELECT".to_owned(),
            error,
        })?;

        rows.into_iter().map(LogRecord::try_from).collect()
    }

    async fn count(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM log_records")
            .fetch_one(&self.pool)
            .await
            .map_err(|error| StoreError::QueryError {
                command: "COUNT".to_owned(),
                error,
            })
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|error| StoreError::QueryError {
                command: "SELECT 1".to_owned(),
                error,
            })?;

        Ok(())
    }
}
