//! In-Memory Realtime Store
//!
//! Keeps messages, notifications and shipment owners in memory. Used by
//! tests and by deployments without a database configured. Writes can be
//! made to fail to exercise the no-broadcast-on-failure path.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, MessageId, NotificationId, ShipmentId, UserId};
use crate::domain::realtime::{NewMessage, NewNotification, NotificationTarget};
use crate::ports::RealtimeStore;

#[derive(Debug, Default)]
struct Tables {
    messages: Vec<(MessageId, NewMessage)>,
    notifications: Vec<(NotificationId, NotificationTarget, NewNotification)>,
    shipment_owners: HashMap<ShipmentId, UserId>,
}

/// In-memory persistence for the real-time layer.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRealtimeStore {
    tables: Arc<RwLock<Tables>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryRealtimeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record who posted a shipment.
    pub async fn with_shipment(self, shipment_id: ShipmentId, owner: UserId) -> Self {
        self.tables
            .write()
            .await
            .shipment_owners
            .insert(shipment_id, owner);
        self
    }

    /// Make every subsequent insert fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Stored messages, oldest first.
    pub async fn messages(&self) -> Vec<NewMessage> {
        self.tables
            .read()
            .await
            .messages
            .iter()
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Stored notifications, oldest first.
    pub async fn notifications(&self) -> Vec<(NotificationTarget, NewNotification)> {
        self.tables
            .read()
            .await
            .notifications
            .iter()
            .map(|(_, target, n)| (*target, n.clone()))
            .collect()
    }

    /// Clear all stored data (useful for tests)
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        tables.messages.clear();
        tables.notifications.clear();
        tables.shipment_owners.clear();
    }

    fn check_writable(&self, what: &str) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database(format!("Simulated {} insert failure", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl RealtimeStore for InMemoryRealtimeStore {
    async fn insert_message(&self, message: &NewMessage) -> Result<MessageId, DomainError> {
        self.check_writable("message")?;
        let mut tables = self.tables.write().await;
        let id = MessageId::new(tables.messages.len() as i64 + 1);
        tables.messages.push((id, message.clone()));
        Ok(id)
    }

    async fn shipment_owner(&self, shipment_id: ShipmentId) -> Result<Option<UserId>, DomainError> {
        Ok(self
            .tables
            .read()
            .await
            .shipment_owners
            .get(&shipment_id)
            .copied())
    }

    async fn insert_notification(
        &self,
        target: &NotificationTarget,
        notification: &NewNotification,
    ) -> Result<NotificationId, DomainError> {
        self.check_writable("notification")?;
        let mut tables = self.tables.write().await;
        let id = NotificationId::new(tables.notifications.len() as i64 + 1);
        tables
            .notifications
            .push((id, *target, notification.clone()));
        Ok(id)
    }
}
