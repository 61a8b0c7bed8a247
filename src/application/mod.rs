//! Application layer - orchestrates domain logic over ports.
//!
//! - `RealtimeHub` - connection lifecycle and dispatch-plan execution
//! - `IdentityResolver` - bearer credential resolution with demo bypass and cache

pub mod identity;
pub mod realtime;

pub use identity::{bearer_token, IdentityResolver, TOKEN_KEY_PREFIX};
pub use realtime::{DispatchOutcome, RealtimeHub};
