//! Assembly of the full HTTP surface.
//!
//! ```text
//! /health, /cache/*        cache service                  (no auth)
//! /socket                  WebSocket upgrade              (handshake auth)
//! /notifications           notification push              (auth, admin)
//! /api/*                   upstream proxy                 (auth → response cache → proxy)
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{http::HeaderValue, middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::cache::CacheAside;
use crate::adapters::websocket::{websocket_router, WebSocketState};
use crate::application::{IdentityResolver, RealtimeHub};
use crate::config::ServerConfig;

use super::cache_service::{cache_service_router, CacheServiceState};
use super::middleware::{auth_middleware, response_cache_middleware, ResponseCacheState};
use super::notifications::{notifications_router, NotificationState};
use super::proxy::{proxy_router, ProxyState};

/// Everything the routers need, built once at startup.
#[derive(Clone)]
pub struct AppServices {
    pub hub: Arc<RealtimeHub>,
    pub identity: IdentityResolver,
    /// Backs identity and response memoization.
    pub cache: CacheAside,
    /// Backs the public `/cache/*` surface, apart from `cache`.
    pub service_cache: CacheAside,
    pub response_cache: ResponseCacheState,
    /// Absent when no upstream is configured; `/api/*` is then not served.
    pub proxy: Option<ProxyState>,
}

/// Plain HTTP routes: cache service, notifications and the gateway.
pub fn http_routes(services: &AppServices) -> Router {
    let mut router = cache_service_router()
        .with_state(CacheServiceState::new(services.service_cache.clone()))
        .merge(
            notifications_router()
                .layer(middleware::from_fn_with_state(
                    services.identity.clone(),
                    auth_middleware,
                ))
                .with_state(NotificationState::new(services.hub.clone())),
        );

    if let Some(proxy) = &services.proxy {
        // Outermost runs first: identity before any cached body is served.
        let gateway = proxy_router()
            .layer(middleware::from_fn_with_state(
                services.response_cache.clone(),
                response_cache_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                services.identity.clone(),
                auth_middleware,
            ))
            .with_state(proxy.clone());
        router = router.merge(gateway);
    }

    router
}

/// The complete application router with cross-cutting layers.
///
/// The request timeout covers plain HTTP only; an upgraded socket outlives
/// its handshake.
pub fn build_router(services: &AppServices, server: &ServerConfig) -> Router {
    let http = http_routes(services).layer(TimeoutLayer::new(Duration::from_secs(
        server.request_timeout_secs,
    )));

    let sockets = websocket_router().with_state(WebSocketState::new(
        services.hub.clone(),
        services.identity.clone(),
    ));

    http.merge(sockets)
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if server.is_production() {
        CorsLayer::new()
    } else {
        CorsLayer::permissive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::persistence::InMemoryRealtimeStore;
    use crate::adapters::websocket::{InMemoryConnectionRegistry, RoomManager};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn services(proxy: Option<ProxyState>) -> AppServices {
        let cache = CacheAside::in_memory();
        let rooms = Arc::new(RoomManager::new(Arc::new(InMemoryConnectionRegistry::new())));
        let hub = Arc::new(RealtimeHub::new(rooms, Arc::new(InMemoryRealtimeStore::new())));
        let identity = IdentityResolver::new(
            Arc::new(MockSessionValidator::new()),
            cache.clone(),
            Duration::from_secs(300),
        );
        AppServices {
            hub,
            identity,
            response_cache: ResponseCacheState::new(
                cache.clone(),
                vec!["/api/shipments".into()],
                Duration::from_secs(300),
                1024,
            ),
            cache,
            service_cache: CacheAside::in_memory(),
            proxy,
        }
    }

    #[tokio::test]
    async fn health_is_served() {
        let app = build_router(&services(None), &ServerConfig::default());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cache_service_does_not_share_gateway_store() {
        let services = services(None);
        services.cache.set("shipment_1", serde_json::json!(true), None).await;
        let app = build_router(&services, &ServerConfig::default());

        let response = app
            .oneshot(Request::get("/cache/shipment_1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_is_not_served_without_upstream() {
        let app = build_router(&services(None), &ServerConfig::default());

        let response = app
            .oneshot(Request::get("/api/shipments").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_requires_credentials() {
        let proxy = ProxyState::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let app = build_router(&services(Some(proxy)), &ServerConfig::default());

        let response = app
            .oneshot(Request::get("/api/shipments").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn invalid_cors_origins_are_skipped() {
        let server = ServerConfig {
            cors_origins: Some("https://app.freight.example, bad\norigin".into()),
            ..ServerConfig::default()
        };
        let _ = cors_layer(&server);
    }
}
