use envconfig::Envconfig;
use eyre::{Context, Result};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use log_collector::config::Config;
use log_collector::server::serve;

fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_layer = tracing_subscriber::fmt::layer().with_filter(filter);
    tracing_subscriber::registry().with(log_layer).init();
}

async fn shutdown() {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };

    tracing::info!("shutting down gracefully...");
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    let config = Config::init_from_env().wrap_err("invalid configuration")?;

    let listener = tokio::net::TcpListener::bind(config.bind())
        .await
        .wrap_err_with(|| format!("failed to bind {}", config.bind()))?;

    serve(config, listener, shutdown()).await
}
