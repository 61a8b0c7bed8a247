//! PostgreSQL implementation of RealtimeStore.
//!
//! The tables belong to the marketplace backend; this adapter only inserts
//! into `messages` and `notifications` and reads `shipments.user_id`.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::domain::foundation::{DomainError, MessageId, NotificationId, ShipmentId, UserId};
use crate::domain::realtime::{NewMessage, NewNotification, NotificationTarget};
use crate::ports::RealtimeStore;

/// PostgreSQL implementation of RealtimeStore.
#[derive(Clone)]
pub struct PostgresRealtimeStore {
    pool: PgPool,
}

impl PostgresRealtimeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool from configuration. Connections are opened lazily.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .connect_lazy(&config.url)
            .map_err(|e| DomainError::database(format!("Invalid database URL: {}", e)))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl RealtimeStore for PostgresRealtimeStore {
    async fn insert_message(&self, message: &NewMessage) -> Result<MessageId, DomainError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO messages (sender_id, receiver_id, shipment_id, message, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id
            "#,
        )
        .bind(message.sender_id.value())
        .bind(message.receiver_id.value())
        .bind(message.shipment_id.value())
        .bind(&message.body)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to insert message: {}", e))
                .with_detail("shipment_id", message.shipment_id.to_string())
        })?;

        Ok(MessageId::new(id))
    }

    async fn shipment_owner(&self, shipment_id: ShipmentId) -> Result<Option<UserId>, DomainError> {
        let owner: Option<i64> = sqlx::query_scalar("SELECT user_id FROM shipments WHERE id = $1")
            .bind(shipment_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to look up shipment owner: {}", e)))?;

        Ok(owner.map(UserId::new))
    }

    async fn insert_notification(
        &self,
        target: &NotificationTarget,
        notification: &NewNotification,
    ) -> Result<NotificationId, DomainError> {
        let (user_id, role) = match target {
            NotificationTarget::ToUser { user_id } => (Some(user_id.value()), None),
            NotificationTarget::ToRole { role } => (None, Some(role.as_str())),
        };

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO notifications (user_id, target_role, title, message, data, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, NOW())
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(role)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(sqlx::types::Json(&notification.data))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert notification: {}", e)))?;

        Ok(NotificationId::new(id))
    }
}
