//! GET-response memoization for the gateway.
//!
//! A GET whose path starts with one of the configured prefixes is looked up
//! under `response:{path?query}`. On a hit the stored response is returned
//! without running the inner service. On a miss the inner response is
//! buffered, stored when it is 2xx and fits the size limit, and returned.
//!
//! Every response that went through the lookup carries `x-cache: HIT` or
//! `x-cache: MISS`; requests outside the cacheable set carry neither.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::adapters::cache::CacheAside;
use crate::config::GatewayConfig;

pub static X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Key prefix of memoized responses.
pub const RESPONSE_KEY_PREFIX: &str = "response:";

/// Shared state for [`response_cache_middleware`].
#[derive(Clone, Debug)]
pub struct ResponseCacheState {
    cache: CacheAside,
    prefixes: Arc<Vec<String>>,
    ttl: Duration,
    max_body_bytes: usize,
}

impl ResponseCacheState {
    pub fn new(
        cache: CacheAside,
        prefixes: Vec<String>,
        ttl: Duration,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            cache,
            prefixes: Arc::new(prefixes),
            ttl,
            max_body_bytes,
        }
    }

    pub fn from_config(cache: CacheAside, config: &GatewayConfig) -> Self {
        Self::new(
            cache,
            config.cacheable_prefix_list(),
            config.response_cache_ttl(),
            config.max_cached_body_bytes,
        )
    }

    pub fn is_cacheable(&self, method: &Method, path: &str) -> bool {
        method == Method::GET && self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Cache key for a request URI: path plus query, when present.
    pub fn cache_key(uri: &Uri) -> String {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        format!("{}{}", RESPONSE_KEY_PREFIX, path_and_query)
    }
}

/// What is kept for a memoized response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub body: String,
}

impl CachedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let mut response = (status, self.body).into_response();
        if let Some(content_type) = self
            .content_type
            .and_then(|ct| HeaderValue::from_str(&ct).ok())
        {
            response.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        response
    }
}

pub async fn response_cache_middleware(
    State(state): State<ResponseCacheState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.is_cacheable(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let key = ResponseCacheState::cache_key(request.uri());

    if let Some(cached) = state.cache.get_as::<CachedResponse>(&key).await {
        tracing::debug!(key = %key, "Response cache hit");
        return mark(cached.into_response(), "HIT");
    }

    let response = next.run(request).await;
    if !response.status().is_success() {
        return mark(response, "MISS");
    }

    let fits = HttpBody::size_hint(response.body())
        .upper()
        .map_or(false, |upper| upper <= state.max_body_bytes as u64);
    if !fits {
        tracing::debug!(key = %key, "Response too large or unbounded, not cached");
        return mark(response, "MISS");
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(key = %key, "Failed to buffer response body: {}", e);
            return (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "error": "Failed to read upstream response",
                    "code": "BAD_GATEWAY"
                })),
            )
                .into_response();
        }
    };

    match std::str::from_utf8(&bytes) {
        Ok(text) => {
            let entry = CachedResponse {
                status: parts.status.as_u16(),
                content_type: parts
                    .headers
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
                body: text.to_string(),
            };
            state.cache.set_as(&key, &entry, Some(state.ttl)).await;
        }
        Err(_) => {
            tracing::debug!(key = %key, "Binary response, not cached");
        }
    }

    mark(Response::from_parts(parts, Body::from(bytes)), "MISS")
}

fn mark(mut response: Response, value: &'static str) -> Response {
    response
        .headers_mut()
        .insert(X_CACHE.clone(), HeaderValue::from_static(value));
    response
}
