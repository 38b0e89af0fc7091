use std::future::ready;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use log_common::metrics::{setup_metrics_recorder, track_metrics};
use log_common::{LogStore, TimeSource};

use crate::auth::{require_ingest_token, TokenAuth};
use crate::config::Config;
use crate::handlers;

#[derive(Clone)]
pub struct State {
    pub store: Arc<dyn LogStore>,
    pub timesource: Arc<dyn TimeSource + Send + Sync>,
    pub auth: Option<Arc<TokenAuth>>,
}

pub fn router(state: State, config: &Config) -> Router {
    let ingest = post(handlers::post_logs).layer(middleware::from_fn_with_state(
        state.clone(),
        require_ingest_token,
    ));

    let router = Router::new()
        .route("/", get(handlers::index))
        .route("/_liveness", get(handlers::liveness))
        .route("/_readiness", get(handlers::readiness))
        .route("/logs", get(handlers::get_logs).merge(ingest))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TimeoutLayer::new(config.request_timeout.0))
        .layer(ConcurrencyLimitLayer::new(config.concurrency_limit))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(track_metrics))
        .with_state(state);

    // The global recorder can only be installed once per process, tests leave it off.
    if !config.export_prometheus {
        return router;
    }

    match setup_metrics_recorder() {
        Ok(recorder_handle) => {
            router.route("/metrics", get(move || ready(recorder_handle.render())))
        }
        Err(error) => {
            tracing::warn!(error = %error, "failed to install metrics recorder, /metrics disabled");
            router
        }
    }
}
