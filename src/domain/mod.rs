//! Domain layer containing the marketplace's real-time vocabulary.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, roles, auth, errors)
//! - `realtime` - Channels, inbound/outbound events and the dispatch table

pub mod foundation;
pub mod realtime;
