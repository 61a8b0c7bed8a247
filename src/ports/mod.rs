//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Real-time Ports
//!
//! - `ConnectionRegistry` - Live connection ↔ user mapping
//! - `RealtimeStore` - Message, notification and shipment-owner persistence
//!
//! ## Gateway Ports
//!
//! - `CacheStore` - Key/value cache with expiry (Redis or in-process)
//! - `SessionValidator` - Bearer token verification

mod cache_store;
mod connection_registry;
mod realtime_store;
mod session_validator;

pub use cache_store::{CacheBackend, CacheError, CacheStats, CacheStore, TtlStatus};
pub use connection_registry::ConnectionRegistry;
pub use realtime_store::RealtimeStore;
pub use session_validator::SessionValidator;
