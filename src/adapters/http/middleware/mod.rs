//! HTTP middleware for axum.
//!
//! - `auth` - Bearer credential resolution and extractors
//! - `response_cache` - GET-response memoization for the gateway

pub mod auth;
pub mod response_cache;

pub use auth::{auth_middleware, AuthRejection, AuthState, RequireAuth};
pub use response_cache::{
    response_cache_middleware, CachedResponse, ResponseCacheState, RESPONSE_KEY_PREFIX,
    X_CACHE,
};
