use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Bind a `TcpListener` on the provided bind address to serve a `Router` on it.
pub async fn serve(router: Router, bind: &str) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(bind).await?;

    axum::serve(listener, router).await?;

    Ok(())
}

/// Build a Router for a standalone metrics endpoint.
pub fn setup_metrics_router() -> Result<Router, BuildError> {
    let recorder_handle = setup_metrics_recorder()?;

    Ok(Router::new().route(
        "/metrics",
        get(move || std::future::ready(recorder_handle.render())),
    ))
}

/// Install the global Prometheus recorder. Can only succeed once per process.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(EXPONENTIAL_SECONDS)?
        .install_recorder()
}

pub const HTTP_REQUESTS_TOTAL: &str = "log_http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "log_http_request_duration_seconds";

/// Collapse a response status into the outcome label shared by every route.
pub fn request_outcome(status: StatusCode) -> &'static str {
    if status.is_success() {
        "ok"
    } else if status == StatusCode::UNAUTHORIZED {
        "unauthorized"
    } else if status.is_client_error() {
        "rejected"
    } else {
        "failed"
    }
}

/// Count and time every request, labelled by route template, method, status and outcome.
pub async fn track_metrics(req: Request<Body>, next: Next) -> impl IntoResponse {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = req.method().to_string();

    let start = Instant::now();
    let response = next.run(req).await;
    let elapsed = start.elapsed().as_secs_f64();

    let status = response.status();
    let labels = [
        ("route", route),
        ("method", method),
        ("status", status.as_u16().to_string()),
        ("outcome", request_outcome(status).to_owned()),
    ];

    metrics::counter!(HTTP_REQUESTS_TOTAL, &labels).increment(1);
    metrics::histogram!(HTTP_REQUEST_DURATION, &labels).record(elapsed);

    response
}
