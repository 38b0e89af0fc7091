use std::future::Future;
use std::sync::Arc;

use eyre::{Context, Result};
use tokio::net::TcpListener;

use log_common::{SqliteLogStore, SystemTime};

use crate::auth::TokenAuth;
use crate::config::Config;
use crate::router;

pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = SqliteLogStore::new(&config.database_url, config.max_db_connections)
        .await
        .wrap_err_with(|| format!("failed to open log store at {}", config.database_url))?;

    let auth = config
        .ingest_tokens
        .as_deref()
        .and_then(TokenAuth::parse)
        .map(Arc::new);

    if auth.is_none() {
        tracing::warn!("INGEST_TOKENS is not set, accepting unauthenticated log submissions");
    }

    let state = router::State {
        store: Arc::new(store.clone()),
        timesource: Arc::new(SystemTime {}),
        auth,
    };

    let app = router::router(state, &config);

    tracing::info!(
        address = %listener.local_addr().wrap_err("listener has no local address")?,
        "log collector listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .wrap_err("server failed")?;

    store.close().await;
    tracing::info!("log store closed");

    Ok(())
}
