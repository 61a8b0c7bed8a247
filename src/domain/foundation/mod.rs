//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, roles, timestamps, authentication types and error
//! types that form the vocabulary of the marketplace real-time layer.

mod auth;
mod errors;
mod ids;
mod role;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ConnectionId, MessageId, NotificationId, OfferId, ShipmentId, UserId};
pub use role::UserRole;
pub use timestamp::Timestamp;
