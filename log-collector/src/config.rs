use envconfig::Envconfig;
use log_common::EnvMsDuration;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "5001")]
    pub port: u16,

    #[envconfig(from = "DATABASE_URL", default = "sqlite://logs.db")]
    pub database_url: String,

    #[envconfig(from = "MAX_DB_CONNECTIONS", default = "10")]
    pub max_db_connections: u32,

    #[envconfig(from = "MAX_BODY_SIZE", default = "65536")]
    pub max_body_size: usize,

    #[envconfig(from = "CONCURRENCY_LIMIT", default = "100")]
    pub concurrency_limit: usize,

    #[envconfig(from = "REQUEST_TIMEOUT_MS", default = "10000")]
    pub request_timeout: EnvMsDuration,

    #[envconfig(from = "EXPORT_PROMETHEUS", default = "true")]
    pub export_prometheus: bool,

    // "<token>,<token>...", unset leaves ingestion unauthenticated
    #[envconfig(from = "INGEST_TOKENS")]
    pub ingest_tokens: Option<String>,
}

impl Config {
    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
