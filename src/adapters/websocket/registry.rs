//! In-process connection registry.
//!
//! Two maps behind one lock so both directions always change together:
//!
//! ```text
//! by_connection: conn-a → 7, conn-b → 7, conn-c → 12
//! by_user:       7 → conn-b, 12 → conn-c
//! ```
//!
//! User 7 reconnected on `conn-b`; `conn-a` is still registered until it
//! disconnects, but direct delivery goes to `conn-b`.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{ConnectionId, UserId};
use crate::domain::realtime::RealtimeError;
use crate::ports::ConnectionRegistry;

#[derive(Debug, Default)]
struct Maps {
    by_connection: HashMap<ConnectionId, UserId>,
    by_user: HashMap<UserId, ConnectionId>,
}

/// Connection registry for a single server process.
#[derive(Debug, Default)]
pub struct InMemoryConnectionRegistry {
    maps: RwLock<Maps>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered connections, including superseded ones.
    pub async fn connection_count(&self) -> usize {
        self.maps.read().await.by_connection.len()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
    ) -> Result<(), RealtimeError> {
        let mut maps = self.maps.write().await;

        if let Some(existing) = maps.by_connection.get(&connection_id) {
            if *existing != user_id {
                return Err(RealtimeError::DuplicateConnection {
                    connection_id,
                    existing: *existing,
                    requested: user_id,
                });
            }
        }

        maps.by_connection.insert(connection_id, user_id);
        if let Some(previous) = maps.by_user.insert(user_id, connection_id) {
            if previous != connection_id {
                tracing::debug!(
                    user_id = %user_id,
                    previous = %previous,
                    connection_id = %connection_id,
                    "User reconnected, newer connection takes direct delivery"
                );
            }
        }
        Ok(())
    }

    async fn unregister(&self, connection_id: &ConnectionId) -> Option<UserId> {
        let mut maps = self.maps.write().await;
        let user_id = maps.by_connection.remove(connection_id)?;

        if maps.by_user.get(&user_id) == Some(connection_id) {
            maps.by_user.remove(&user_id);
        }
        Some(user_id)
    }

    async fn lookup_connection(&self, user_id: &UserId) -> Option<ConnectionId> {
        self.maps.read().await.by_user.get(user_id).copied()
    }

    async fn lookup_user(&self, connection_id: &ConnectionId) -> Option<UserId> {
        self.maps.read().await.by_connection.get(connection_id).copied()
    }

    async fn is_online(&self, user_id: &UserId) -> bool {
        self.maps.read().await.by_user.contains_key(user_id)
    }

    async fn list_online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.maps.read().await.by_user.keys().copied().collect();
        users.sort_by_key(|u| u.value());
        users
    }

    async fn clear(&self) {
        let mut maps = self.maps.write().await;
        maps.by_connection.clear();
        maps.by_user.clear();
    }
}
