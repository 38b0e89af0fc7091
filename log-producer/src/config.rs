use envconfig::Envconfig;
use log_common::EnvMsDuration;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "COLLECTOR_URL", default = "http://127.0.0.1:5001/logs")]
    pub collector_url: String,

    #[envconfig(from = "SERVICE_NAME", default = "Service1")]
    pub service_name: String,

    #[envconfig(from = "LOG_LEVEL", default = "INFO")]
    pub log_level: String,

    #[envconfig(from = "LOG_MESSAGE", default = "this is an informational message")]
    pub message: String,

    #[envconfig(from = "API_TOKEN", default = "service1_token")]
    pub api_token: String,

    #[envconfig(from = "SEND_INTERVAL_MS", default = "60000")]
    pub send_interval: EnvMsDuration,

    #[envconfig(from = "REQUEST_TIMEOUT_MS", default = "5000")]
    pub request_timeout: EnvMsDuration,

    #[envconfig(from = "METRICS_BIND_HOST", default = "0.0.0.0")]
    pub metrics_host: String,

    #[envconfig(from = "METRICS_BIND_PORT", default = "3302")]
    pub metrics_port: u16,

    #[envconfig(from = "EXPORT_PROMETHEUS", default = "false")]
    pub export_prometheus: bool,
}

impl Config {
    /// Produce a host:port address for the management server.
    pub fn metrics_bind(&self) -> String {
        format!("{}:{}", self.metrics_host, self.metrics_port)
    }
}
