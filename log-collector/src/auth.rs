use std::collections::HashSet;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::ApiError;
use crate::router;

/// The set of bearer tokens allowed to submit log records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAuth {
    tokens: HashSet<String>,
}

impl TokenAuth {
    /// Parse a comma separated token list. Returns `None` when no token remains after
    /// trimming, which leaves ingestion unauthenticated.
    pub fn parse(tokens: &str) -> Option<Self> {
        let tokens: HashSet<String> = tokens
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .collect();

        if tokens.is_empty() {
            None
        } else {
            Some(Self { tokens })
        }
    }

    pub fn is_allowed(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
}

pub async fn require_ingest_token(
    State(state): State<router::State>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(auth) = &state.auth {
        match extract_bearer_token(request.headers()) {
            Some(token) if auth.is_allowed(token) => {}
            _ => return Err(ApiError::Unauthorized),
        }
    }

    Ok(next.run(request).await)
}
