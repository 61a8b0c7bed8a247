//! Upstream proxy for the gateway.
//!
//! Requests under `/api/` are forwarded to the marketplace backend with the
//! same method, path, query, headers and body. The resolved identity is
//! passed along as `x-user-id` / `x-user-role`; client-supplied copies of
//! those headers are dropped.
//!
//! The upstream client speaks `http` 0.2 types while axum speaks `http` 1,
//! so methods, headers and statuses are converted through their wire form.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};

use crate::config::GatewayConfig;
use crate::domain::foundation::AuthenticatedUser;

use super::cache_service::ErrorResponse;

/// Largest request body forwarded upstream.
const MAX_FORWARDED_BODY_BYTES: usize = 10 * 1024 * 1024;

const X_USER_ID: &str = "x-user-id";
const X_USER_ROLE: &str = "x-user-role";

/// Headers that describe one hop and must not be forwarded.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
];

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Failed to build upstream client: {0}")]
    Client(String),

    #[error("Request body could not be read: {0}")]
    RequestBody(String),

    #[error("Upstream timed out")]
    Timeout,

    #[error("Upstream request failed: {0}")]
    Upstream(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ProxyError::Client(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ProxyError::RequestBody(_) => (StatusCode::PAYLOAD_TOO_LARGE, "REQUEST_BODY"),
            ProxyError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT"),
            ProxyError::Upstream(_) => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY"),
        };
        (status, Json(ErrorResponse::new(code, self.to_string()))).into_response()
    }
}

/// Shared state for [`proxy_handler`].
#[derive(Clone, Debug)]
pub struct ProxyState {
    client: reqwest::Client,
    upstream: Arc<str>,
}

impl ProxyState {
    pub fn new(upstream_url: &str, timeout: Duration) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::Client(e.to_string()))?;

        Ok(Self {
            client,
            upstream: Arc::from(upstream_url.trim_end_matches('/')),
        })
    }

    /// `None` when no upstream is configured.
    pub fn from_config(config: &GatewayConfig) -> Result<Option<Self>, ProxyError> {
        config
            .upstream_url
            .as_deref()
            .map(|url| Self::new(url, config.upstream_timeout()))
            .transpose()
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    fn target_url(&self, request: &Request) -> String {
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| request.uri().path());
        format!("{}{}", self.upstream, path_and_query)
    }
}

/// Forward one request upstream.
pub async fn proxy_handler(
    State(state): State<ProxyState>,
    request: Request,
) -> Result<Response, ProxyError> {
    let url = state.target_url(&request);
    let user = request.extensions().get::<AuthenticatedUser>().cloned();
    let (parts, body) = request.into_parts();

    let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;
    let body = axum::body::to_bytes(body, MAX_FORWARDED_BODY_BYTES)
        .await
        .map_err(|e| ProxyError::RequestBody(e.to_string()))?;

    let mut builder = state.client.request(method, &url);
    for (name, value) in forwardable(&parts.headers) {
        builder = builder.header(name.as_str(), value.as_bytes());
    }
    if let Some(user) = &user {
        builder = builder
            .header(X_USER_ID, user.id.to_string())
            .header(X_USER_ROLE, user.role.as_str());
    }
    if !body.is_empty() {
        builder = builder.body(body.to_vec());
    }

    let upstream = builder.send().await.map_err(|e| {
        if e.is_timeout() {
            tracing::warn!(url = %url, "Upstream timed out");
            ProxyError::Timeout
        } else {
            tracing::warn!(url = %url, error = %e, "Upstream request failed");
            ProxyError::Upstream(e.to_string())
        }
    })?;

    let status = StatusCode::from_u16(upstream.status().as_u16())
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;

    let mut headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) else {
            continue;
        };
        if !is_hop_by_hop(&name) && name != axum::http::header::CONTENT_LENGTH {
            headers.append(name, value);
        }
    }

    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;

    tracing::debug!(url = %url, status = status.as_u16(), "Proxied request");

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

fn forwardable(headers: &HeaderMap) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
    headers.iter().filter(|(name, _)| {
        !is_hop_by_hop(name)
            && *name != axum::http::header::CONTENT_LENGTH
            && name.as_str() != X_USER_ID
            && name.as_str() != X_USER_ROLE
    })
}

/// `/api/*` forwarded upstream, any method.
pub fn proxy_router() -> Router<ProxyState> {
    Router::new()
        .route("/api", any(proxy_handler))
        .route("/api/*path", any(proxy_handler))
}
