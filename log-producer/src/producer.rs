use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use tokio_util::sync::CancellationToken;
use url::Url;

use log_common::{format_timestamp, NewLogRecord, SystemTime, TimeSource};

use crate::config::Config;
use crate::error::ProducerError;

pub const SENDS_TOTAL: &str = "log_producer_sends_total";
pub const UNREADABLE_BODY: &str = "<unreadable body>";

/// Build the record for one send, stamped with `now`.
pub fn build_record(config: &Config, now: DateTime<Utc>) -> NewLogRecord {
    NewLogRecord {
        timestamp: format_timestamp(&now),
        service_name: config.service_name.clone(),
        log_level: config.log_level.clone(),
        message: config.message.clone(),
    }
}

pub fn build_http_client(request_timeout: Duration) -> reqwest::Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(concat!("log-producer/", env!("CARGO_PKG_VERSION")))
        .timeout(request_timeout)
        .build()
}

/// Periodically submits a fixed log record to a collector.
pub struct LogProducer {
    config: Config,
    url: Url,
    client: Client,
    timesource: Arc<dyn TimeSource + Send + Sync>,
}

impl LogProducer {
    pub fn new(config: &Config) -> Result<Self, ProducerError> {
        Self::with_timesource(config, SystemTime {})
    }

    pub fn with_timesource<T>(config: &Config, timesource: T) -> Result<Self, ProducerError>
    where
        T: TimeSource + Send + Sync + 'static,
    {
        let url = Url::parse(&config.collector_url).map_err(|error| {
            ProducerError::InvalidConfig(format!(
                "COLLECTOR_URL '{}' is not a valid URL: {}",
                config.collector_url, error
            ))
        })?;

        if config.send_interval.0.is_zero() {
            return Err(ProducerError::InvalidConfig(
                "SEND_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        // The fixed fields must satisfy the record limits.
        build_record(config, timesource.current_time())
            .validate()
            .map_err(|error| ProducerError::InvalidConfig(error.to_string()))?;

        let client = build_http_client(config.request_timeout.0)?;

        Ok(Self {
            config: config.clone(),
            url,
            client,
            timesource: Arc::new(timesource),
        })
    }

    /// Submit one record, returning the collector's response status.
    pub async fn send_once(&self) -> Result<StatusCode, ProducerError> {
        let record = build_record(&self.config, self.timesource.current_time());

        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.config.api_token)
            .json(&record)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(error) => {
                    tracing::debug!(error = %error, status = %status, "failed to read rejection body");
                    UNREADABLE_BODY.to_owned()
                }
            };
            return Err(ProducerError::UnexpectedStatus { status, body });
        }

        Ok(status)
    }

    /// Send on a fixed cadence until `shutdown` is cancelled. Returns the number of sends made.
    pub async fn run(&self, shutdown: CancellationToken) -> u64 {
        let interval = self.config.send_interval.0;
        let mut iterations: u64 = 0;

        tracing::info!(
            url = %self.url,
            service_name = %self.config.service_name,
            interval = ?interval,
            "starting log producer"
        );

        while !shutdown.is_cancelled() {
            iterations += 1;

            match self.send_once().await {
                Ok(status) => {
                    tracing::info!(status = %status, "log record sent");
                    metrics::counter!(SENDS_TOTAL, "outcome" => "sent").increment(1);
                }
                Err(error @ ProducerError::UnexpectedStatus { .. }) => {
                    tracing::warn!(error = %error, "collector rejected log record");
                    metrics::counter!(SENDS_TOTAL, "outcome" => error.outcome()).increment(1);
                }
                Err(error) => {
                    tracing::error!(error = %error, "failed to send log record");
                    metrics::counter!(SENDS_TOTAL, "outcome" => error.outcome()).increment(1);
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        tracing::info!(iterations, "log producer stopped");

        iterations
    }
}
