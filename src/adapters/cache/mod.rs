//! Cache adapters.
//!
//! - `InMemoryCacheStore` - process-local map with lazy expiry
//! - `RedisCacheStore` - Redis over a multiplexed connection
//! - `CacheAside` - the façade callers use; picks a backend at startup and
//!   swallows store errors

mod cache_aside;
mod in_memory;
mod pattern;
mod redis;

pub use cache_aside::CacheAside;
pub use in_memory::InMemoryCacheStore;
pub use pattern::KeyPattern;
pub use self::redis::RedisCacheStore;
