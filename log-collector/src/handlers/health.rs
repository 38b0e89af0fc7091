use axum::extract::State;
use axum::http::StatusCode;

use crate::router;

pub async fn index() -> &'static str {
    "log collector"
}

pub async fn liveness() -> &'static str {
    "ok"
}

pub async fn readiness(State(state): State<router::State>) -> Result<&'static str, StatusCode> {
    state.store.health_check().await.map_err(|error| {
        tracing::warn!(error = %error, "readiness check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    Ok("ok")
}
