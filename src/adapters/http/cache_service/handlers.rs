//! HTTP handlers for the cache service.

use std::time::Duration;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::adapters::cache::CacheAside;
use crate::adapters::http::middleware::RESPONSE_KEY_PREFIX;
use crate::application::TOKEN_KEY_PREFIX;
use crate::ports::{CacheStats, TtlStatus};

use super::dto::{
    DeleteEntryResponse, EntryResponse, ErrorResponse, FlushResponse, HealthResponse,
    KeysResponse, SetEntryRequest, SetEntryResponse,
};

/// Longest accepted expiry, one year.
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Keys owned by the gateway; never readable or writable over HTTP.
const RESERVED_PREFIXES: [&str; 2] = [TOKEN_KEY_PREFIX, RESPONSE_KEY_PREFIX];

/// Shared state for the cache service routes.
#[derive(Clone, Debug)]
pub struct CacheServiceState {
    pub cache: CacheAside,
}

impl CacheServiceState {
    pub fn new(cache: CacheAside) -> Self {
        Self { cache }
    }
}

/// GET /cache/:key
pub async fn get_entry(
    State(state): State<CacheServiceState>,
    Path(key): Path<String>,
) -> Result<Json<EntryResponse>, CacheApiError> {
    ensure_public(&key)?;

    // TTL first: an entry that expires before the read is simply not found.
    let ttl = state.cache.ttl_remaining(&key).await;
    let value = match (state.cache.get(&key).await, ttl) {
        (Some(value), status) if status != TtlStatus::Missing => value,
        _ => return Err(CacheApiError::NotFound(key)),
    };

    Ok(Json(EntryResponse {
        key,
        value,
        ttl: ttl.as_seconds(),
    }))
}

/// POST /cache
pub async fn set_entry(
    State(state): State<CacheServiceState>,
    Json(request): Json<SetEntryRequest>,
) -> Result<impl IntoResponse, CacheApiError> {
    if request.key.trim().is_empty() {
        return Err(CacheApiError::Validation("key must not be empty".to_string()));
    }
    ensure_public(&request.key)?;
    match request.ttl {
        Some(0) => {
            return Err(CacheApiError::Validation(
                "ttl must be positive; omit it for no expiry".to_string(),
            ))
        }
        Some(ttl) if ttl > MAX_TTL_SECS => {
            return Err(CacheApiError::Validation(format!(
                "ttl must not exceed {} seconds",
                MAX_TTL_SECS
            )))
        }
        _ => {}
    }

    let ttl = request.ttl.map(Duration::from_secs);
    if !state.cache.set(&request.key, request.value, ttl).await {
        return Err(CacheApiError::Unavailable);
    }

    Ok((StatusCode::CREATED, Json(SetEntryResponse { success: true })))
}

/// DELETE /cache/:key
pub async fn delete_entry(
    State(state): State<CacheServiceState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteEntryResponse>, CacheApiError> {
    ensure_public(&key)?;
    Ok(Json(DeleteEntryResponse {
        deleted: state.cache.delete(&key).await,
    }))
}

/// GET /cache/keys/:pattern
pub async fn list_keys(
    State(state): State<CacheServiceState>,
    Path(pattern): Path<String>,
) -> Json<KeysResponse> {
    let keys: Vec<String> = state
        .cache
        .keys_matching(&pattern)
        .await
        .into_iter()
        .filter(|key| !is_reserved(key))
        .collect();
    Json(KeysResponse {
        count: keys.len(),
        pattern,
        keys,
    })
}

/// POST /cache/flush
pub async fn flush(State(state): State<CacheServiceState>) -> Result<Json<FlushResponse>, CacheApiError> {
    if !state.cache.flush_all().await {
        return Err(CacheApiError::Unavailable);
    }
    tracing::info!("Cache flushed");
    Ok(Json(FlushResponse { flushed: true }))
}

/// GET /cache/stats
pub async fn stats(State(state): State<CacheServiceState>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

/// GET /health
pub async fn health(State(state): State<CacheServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache: state.cache.backend(),
    })
}

fn is_reserved(key: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}

fn ensure_public(key: &str) -> Result<(), CacheApiError> {
    if is_reserved(key) {
        return Err(CacheApiError::ReservedKey(key.to_string()));
    }
    Ok(())
}

/// Errors surfaced by the cache service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheApiError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Key is reserved for the gateway: {0}")]
    ReservedKey(String),

    #[error("Cache backend rejected the operation")]
    Unavailable,
}

impl IntoResponse for CacheApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            CacheApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            CacheApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            CacheApiError::ReservedKey(_) => (StatusCode::FORBIDDEN, "RESERVED_KEY"),
            CacheApiError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "CACHE_UNAVAILABLE"),
        };

        (status, Json(ErrorResponse::new(code, self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> CacheServiceState {
        CacheServiceState::new(CacheAside::in_memory())
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let result = get_entry(State(state()), Path("nope".to_string())).await;
        assert_eq!(result.unwrap_err(), CacheApiError::NotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn set_then_get_reports_value_and_ttl() {
        let state = state();
        set_entry(
            State(state.clone()),
            Json(SetEntryRequest {
                key: "shipment_1".into(),
                value: json!({"status": "open"}),
                ttl: Some(60),
            }),
        )
        .await
        .unwrap();

        let Json(entry) = get_entry(State(state), Path("shipment_1".to_string()))
            .await
            .unwrap();

        assert_eq!(entry.value, json!({"status": "open"}));
        assert!(entry.ttl > 0 && entry.ttl <= 60);
    }

    #[tokio::test]
    async fn entry_without_ttl_reports_minus_one() {
        let state = state();
        state.cache.set("k", json!(1), None).await;

        let Json(entry) = get_entry(State(state), Path("k".to_string())).await.unwrap();
        assert_eq!(entry.ttl, -1);
    }

    #[tokio::test]
    async fn set_rejects_empty_key_and_zero_ttl() {
        let empty = set_entry(
            State(state()),
            Json(SetEntryRequest {
                key: " ".into(),
                value: json!(1),
                ttl: None,
            }),
        )
        .await;
        assert!(matches!(empty, Err(CacheApiError::Validation(_))));

        let zero = set_entry(
            State(state()),
            Json(SetEntryRequest {
                key: "k".into(),
                value: json!(1),
                ttl: Some(0),
            }),
        )
        .await;
        assert!(matches!(zero, Err(CacheApiError::Validation(_))));
    }

    #[tokio::test]
    async fn set_rejects_ttl_beyond_maximum() {
        let state = state();
        let result = set_entry(
            State(state.clone()),
            Json(SetEntryRequest {
                key: "k".into(),
                value: json!(1),
                ttl: Some(u64::MAX),
            }),
        )
        .await;

        assert!(matches!(result, Err(CacheApiError::Validation(_))));
        assert_eq!(state.cache.get("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_not_found() {
        let state = state();
        state.cache.set("k", json!(1), Some(Duration::from_secs(1))).await;
        tokio::time::advance(Duration::from_secs(2)).await;

        let result = get_entry(State(state), Path("k".to_string())).await;
        assert_eq!(result.unwrap_err(), CacheApiError::NotFound("k".to_string()));
    }

    #[tokio::test]
    async fn gateway_keys_are_not_addressable() {
        let state = state();
        state.cache.set("token:abc", json!({"id": 1, "role": "admin"}), None).await;
        state.cache.set("response:/api/shipments", json!("{}"), None).await;
        state.cache.set("shipment_1", json!(true), None).await;

        let write = set_entry(
            State(state.clone()),
            Json(SetEntryRequest {
                key: "token:forged".into(),
                value: json!({"id": 1, "role": "admin"}),
                ttl: None,
            }),
        )
        .await;
        let read = get_entry(State(state.clone()), Path("token:abc".to_string())).await;
        let delete = delete_entry(State(state.clone()), Path("response:/api/shipments".to_string())).await;
        let Json(listed) = list_keys(State(state.clone()), Path("*".to_string())).await;

        assert!(matches!(write, Err(CacheApiError::ReservedKey(_))));
        assert!(matches!(read, Err(CacheApiError::ReservedKey(_))));
        assert!(matches!(delete, Err(CacheApiError::ReservedKey(_))));
        assert_eq!(listed.keys, vec!["shipment_1"]);
        assert_eq!(state.cache.get("token:forged").await, None);
    }

    #[tokio::test]
    async fn delete_reports_whether_key_existed() {
        let state = state();
        state.cache.set("k", json!(1), None).await;

        let Json(first) = delete_entry(State(state.clone()), Path("k".to_string()))
            .await
            .unwrap();
        let Json(second) = delete_entry(State(state), Path("k".to_string()))
            .await
            .unwrap();

        assert!(first.deleted);
        assert!(!second.deleted);
    }

    #[tokio::test]
    async fn list_keys_uses_glob() {
        let state = state();
        for key in ["shipment_1", "shipment_2", "offer_1"] {
            state.cache.set(key, json!(true), None).await;
        }

        let Json(body) = list_keys(State(state), Path("shipment_*".to_string())).await;

        assert_eq!(body.keys, vec!["shipment_1", "shipment_2"]);
        assert_eq!(body.count, 2);
    }

    #[test]
    fn error_status_codes() {
        assert_eq!(
            CacheApiError::NotFound("k".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CacheApiError::Validation("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CacheApiError::ReservedKey("token:x".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            CacheApiError::Unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
