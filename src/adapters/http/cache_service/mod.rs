//! HTTP adapter for the cache service.
//!
//! Exposes the cache-aside layer as a small REST surface:
//! - `GET /cache/:key` - Read a value
//! - `POST /cache` - Write a value with optional TTL
//! - `DELETE /cache/:key` - Remove a key
//! - `GET /cache/keys/:pattern` - List keys matching a `*` glob
//! - `POST /cache/flush` - Drop every key
//! - `GET /cache/stats` - Backend, key count, hit/miss counters
//! - `GET /health` - Liveness and active backend
//!
//! Keys under the gateway's `token:` and `response:` prefixes are refused
//! with 403 and left out of key listings.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::CacheServiceState;
pub use routes::cache_service_router;
