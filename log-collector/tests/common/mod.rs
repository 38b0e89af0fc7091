#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt; // for `collect`
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower::ServiceExt;

use log_collector::auth::TokenAuth;
use log_collector::config::Config;
use log_collector::router::{router, State};
use log_collector::server::serve;
use log_common::{
    EnvMsDuration, LogRecord, LogStore, NewLogRecord, SqliteLogStore, StoreError, StoreResult,
    TimeRange, TimeSource,
};

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        max_db_connections: 1,
        max_body_size: 4096,
        concurrency_limit: 100,
        request_timeout: EnvMsDuration(Duration::from_secs(10)),
        export_prometheus: false,
        ingest_tokens: None,
    }
}

pub fn payload(message: &str) -> serde_json::Value {
    serde_json::json!({
        "timestamp": "2024-06-01T12:00:00Z",
        "service_name": "Service1",
        "log_level": "INFO",
        "message": message,
    })
}

/// A clock that only moves when told to.
#[derive(Clone)]
pub struct FixedTime {
    time: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedTime {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            time: Arc::new(Mutex::new(time)),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.time.lock().unwrap() = time;
    }
}

impl TimeSource for FixedTime {
    fn current_time(&self) -> DateTime<Utc> {
        *self.time.lock().unwrap()
    }
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .unwrap()
}

/// A store whose backend is gone.
pub struct FailingStore;

fn unavailable(command: &str) -> StoreError {
    StoreError::QueryError {
        command: command.to_string(),
        error: sqlx::Error::PoolClosed,
    }
}

#[async_trait]
impl LogStore for FailingStore {
    async fn insert(
        &self,
        _record: NewLogRecord,
        _received_at: DateTime<Utc>,
    ) -> StoreResult<LogRecord> {
        Err(unavailable("INSERT"))
    }

    async fn query(&self, _range: &TimeRange) -> StoreResult<Vec<LogRecord>> {
        Err(unavailable("SELECT"))
    }

    async fn count(&self) -> StoreResult<i64> {
        Err(unavailable("COUNT"))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Err(unavailable("SELECT 1"))
    }
}

pub struct TestHarness {
    pub store: Arc<dyn LogStore>,
    pub clock: Option<FixedTime>,
    app: Router,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::builder().build().await
    }

    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::default()
    }

    pub fn set_time(&self, time: DateTime<Utc>) {
        self.clock
            .as_ref()
            .expect("harness was built without a fixed clock")
            .set(time);
    }

    pub async fn count(&self) -> i64 {
        self.store.count().await.unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_raw(&self, body: impl Into<Body>) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/logs")
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
    }

    pub async fn post(&self, body: serde_json::Value) -> Response<Body> {
        self.post_raw(serde_json::to_string(&body).unwrap()).await
    }

    pub async fn post_with_token(&self, body: serde_json::Value, token: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/logs")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
    }

    pub async fn body_json<T: serde::de::DeserializeOwned>(response: Response<Body>) -> T {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    pub async fn body_text(response: Response<Body>) -> String {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }
}

#[derive(Default)]
pub struct TestHarnessBuilder {
    clock: Option<FixedTime>,
    tokens: Option<String>,
    failing_store: bool,
    max_body_size: Option<usize>,
}

impl TestHarnessBuilder {
    pub fn with_clock(mut self, clock: FixedTime) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_tokens(mut self, tokens: &str) -> Self {
        self.tokens = Some(tokens.to_string());
        self
    }

    pub fn with_failing_store(mut self) -> Self {
        self.failing_store = true;
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = Some(max_body_size);
        self
    }

    pub async fn build(self) -> TestHarness {
        let mut config = test_config();
        config.ingest_tokens = self.tokens;
        if let Some(max_body_size) = self.max_body_size {
            config.max_body_size = max_body_size;
        }

        let store: Arc<dyn LogStore> = if self.failing_store {
            Arc::new(FailingStore)
        } else {
            Arc::new(
                SqliteLogStore::new(&config.database_url, config.max_db_connections)
                    .await
                    .unwrap(),
            )
        };

        let timesource: Arc<dyn TimeSource + Send + Sync> = match &self.clock {
            Some(clock) => Arc::new(clock.clone()),
            None => Arc::new(log_common::SystemTime {}),
        };

        let state = State {
            store: store.clone(),
            timesource,
            auth: config
                .ingest_tokens
                .as_deref()
                .and_then(TokenAuth::parse)
                .map(Arc::new),
        };

        TestHarness {
            store,
            clock: self.clock,
            app: router(state, &config),
        }
    }
}

pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
}

impl ServerHandle {
    pub async fn for_config(config: Config) -> ServerHandle {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let notify = Arc::new(Notify::new());
        let shutdown = notify.clone();

        tokio::spawn(async move {
            serve(config, listener, async move { notify.notified().await }).await
        });
        ServerHandle { addr, shutdown }
    }

    pub fn logs_url(&self) -> String {
        format!("http://{}/logs", self.addr)
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.notify_one()
    }
}
