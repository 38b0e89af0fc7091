use envconfig::Envconfig;
use eyre::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use log_common::metrics::{serve, setup_metrics_router};
use log_producer::config::Config;
use log_producer::LogProducer;

fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_layer = tracing_subscriber::fmt::layer().with_filter(filter);
    tracing_subscriber::registry().with(log_layer).init();
}

async fn shutdown(token: CancellationToken) {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };

    tracing::info!("shutting down gracefully...");
    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    let config = Config::init_from_env().wrap_err("invalid configuration")?;
    let producer = LogProducer::new(&config).wrap_err("failed to start producer")?;

    if config.export_prometheus {
        let router = setup_metrics_router().wrap_err("failed to install metrics recorder")?;
        let bind = config.metrics_bind();
        tokio::task::spawn(async move {
            if let Err(error) = serve(router, &bind).await {
                tracing::error!(error = %error, "metrics server failed");
            }
        });
    }

    let token = CancellationToken::new();
    tokio::spawn(shutdown(token.clone()));

    producer.run(token).await;

    Ok(())
}
