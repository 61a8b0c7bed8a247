//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - JWT verification and a test double
//! - `cache` - Redis and in-process cache stores behind the cache-aside façade
//! - `http` - REST routes, gateway proxy and middleware
//! - `persistence` - PostgreSQL and in-memory real-time stores
//! - `websocket` - connection registry, rooms and the socket handler

pub mod auth;
pub mod cache;
pub mod http;
pub mod persistence;
pub mod websocket;
