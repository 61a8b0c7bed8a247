//! Failure modes of the real-time layer.
//!
//! None of these reach the client. The connection loop logs them and keeps
//! the socket open; only authentication failures close a connection, and
//! those are `AuthError`, not `RealtimeError`.

use thiserror::Error;

use crate::domain::foundation::{ConnectionId, DomainError, UserId};

#[derive(Debug, Clone, Error)]
pub enum RealtimeError {
    /// Inbound event was unknown or missing a required field.
    #[error("Malformed '{event}' event: {reason}")]
    MalformedEvent { event: String, reason: String },

    /// The persistence write for an event failed; nothing was broadcast.
    #[error("Persistence failed: {0}")]
    PersistenceFailure(String),

    /// A connection id was registered twice for different users.
    #[error("Connection {connection_id} already registered to user {existing}, refused for {requested}")]
    DuplicateConnection {
        connection_id: ConnectionId,
        existing: UserId,
        requested: UserId,
    },

    /// The connection is not registered with the hub.
    #[error("Unknown connection {0}")]
    UnknownConnection(ConnectionId),
}

impl RealtimeError {
    pub fn malformed(event: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            event: event.into(),
            reason: reason.into(),
        }
    }
}

impl From<DomainError> for RealtimeError {
    fn from(err: DomainError) -> Self {
        RealtimeError::PersistenceFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_event_displays_event_and_reason() {
        let err = RealtimeError::malformed("send_message", "missing field `message`");
        assert_eq!(
            err.to_string(),
            "Malformed 'send_message' event: missing field `message`"
        );
    }

    #[test]
    fn domain_error_becomes_persistence_failure() {
        let err: RealtimeError = DomainError::database("timeout").into();
        assert!(matches!(err, RealtimeError::PersistenceFailure(_)));
    }
}
