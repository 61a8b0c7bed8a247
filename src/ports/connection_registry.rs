//! ConnectionRegistry port - who is online, and on which connection.
//!
//! The registry keeps a bidirectional mapping between live WebSocket
//! connections and marketplace users. It is the leaf of the real-time
//! stack: the room router asks it where to deliver direct-to-user events.
//!
//! ## Session model
//!
//! One live connection per user. When a user connects again (new tab,
//! another device) the newer connection replaces the older one for
//! direct delivery. The older connection stays registered until it
//! disconnects, but unregistering it never evicts the newer mapping.
//!
//! ## Use Case
//!
//! 1. Handshake succeeds, server generates a `ConnectionId`
//! 2. `register(connection, user)`
//! 3. An event for the user arrives: `lookup_connection(user)`
//! 4. Socket closes: `unregister(connection)` (idempotent)

use async_trait::async_trait;

use crate::domain::foundation::{ConnectionId, UserId};
use crate::domain::realtime::RealtimeError;

/// Port for tracking live connections on this server.
///
/// # Example
///
/// ```ignore
/// // WebSocket handler on connect:
/// registry.register(connection_id, user.id).await?;
///
/// // When sending a message to a user:
/// if let Some(connection) = registry.lookup_connection(&user_id).await {
///     rooms.send_to_connection(&connection, event).await;
/// }
///
/// // On disconnect:
/// registry.unregister(&connection_id).await;
/// ```
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Record the mapping in both directions.
    ///
    /// Registering the same (connection, user) pair twice is a no-op.
    /// Registering a known connection for a different user fails with
    /// `RealtimeError::DuplicateConnection`; that indicates a handshake
    /// sequencing bug, not a recoverable condition.
    async fn register(&self, connection_id: ConnectionId, user_id: UserId)
        -> Result<(), RealtimeError>;

    /// Remove the connection. Unknown connections are ignored.
    ///
    /// Returns the user the connection belonged to, if it was registered.
    async fn unregister(&self, connection_id: &ConnectionId) -> Option<UserId>;

    /// The user's most recently registered connection.
    async fn lookup_connection(&self, user_id: &UserId) -> Option<ConnectionId>;

    /// The user a connection was registered for.
    async fn lookup_user(&self, connection_id: &ConnectionId) -> Option<UserId>;

    /// Whether the user has a live connection.
    async fn is_online(&self, user_id: &UserId) -> bool;

    /// Snapshot of online users at call time.
    async fn list_online_users(&self) -> Vec<UserId>;

    /// Drop every mapping.
    async fn clear(&self);
}
