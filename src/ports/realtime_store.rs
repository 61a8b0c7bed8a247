//! RealtimeStore port - the persistence the real-time layer needs.
//!
//! The marketplace database is owned by the CRUD backend. The real-time
//! layer needs exactly three capabilities from it: store a chat message,
//! find who posted a shipment, and store a notification.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, MessageId, NotificationId, ShipmentId, UserId};
use crate::domain::realtime::{NewMessage, NewNotification, NotificationTarget};

/// Persistence collaborator for event handlers.
///
/// # Contract
///
/// - Writes either fully succeed (returning the new row id) or fail with
///   `ErrorCode::DatabaseError`. Retrying is the implementation's choice;
///   callers never retry.
/// - `shipment_owner` returns `Ok(None)` for unknown shipments.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Insert a chat message row.
    async fn insert_message(&self, message: &NewMessage) -> Result<MessageId, DomainError>;

    /// The user who posted the shipment.
    async fn shipment_owner(&self, shipment_id: ShipmentId) -> Result<Option<UserId>, DomainError>;

    /// Insert a notification row.
    async fn insert_notification(
        &self,
        target: &NotificationTarget,
        notification: &NewNotification,
    ) -> Result<NotificationId, DomainError>;
}
