//! Axum router configuration for the cache service.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    delete_entry, flush, get_entry, health, list_keys, set_entry, stats, CacheServiceState,
};

/// Create the cache service router.
///
/// # Routes
/// - `GET /health`
/// - `POST /cache`
/// - `GET /cache/stats`
/// - `POST /cache/flush`
/// - `GET /cache/keys/:pattern`
/// - `GET /cache/:key`, `DELETE /cache/:key`
///
/// Static segments win over `:key`, so keys named `stats` or `flush` are
/// not addressable through `GET /cache/:key`.
pub fn cache_service_router() -> Router<CacheServiceState> {
    Router::new()
        .route("/health", get(health))
        .route("/cache", post(set_entry))
        .route("/cache/stats", get(stats))
        .route("/cache/flush", post(flush))
        .route("/cache/keys/:pattern", get(list_keys))
        .route("/cache/:key", get(get_entry).delete(delete_entry))
}
