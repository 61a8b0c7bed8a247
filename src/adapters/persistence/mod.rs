//! Persistence adapters for the real-time layer.
//!
//! - `PostgresRealtimeStore` - the marketplace database
//! - `InMemoryRealtimeStore` - tests and database-less deployments

mod in_memory;
mod postgres;

pub use in_memory::InMemoryRealtimeStore;
pub use postgres::PostgresRealtimeStore;
