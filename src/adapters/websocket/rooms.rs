//! Channel (room) membership and fan-out.
//!
//! # Architecture
//!
//! ```text
//! Channel: panel_carrier   Channel: shipment_12    Channel: user_7
//! ├── conn-a               ├── conn-a              └── conn-a
//! └── conn-c               └── conn-b
//! ```
//!
//! Every attached connection owns an unbounded outbound queue drained by its
//! socket's send task. Broadcasting clones the event into each member's
//! queue; there is no acknowledgement and no backpressure. A queue whose
//! socket already closed simply drops the event.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::domain::foundation::{ConnectionId, UserId};
use crate::domain::realtime::{Channel, OutboundEvent};
use crate::ports::ConnectionRegistry;

/// Outbound queue of one connection.
pub type ConnectionSink = mpsc::UnboundedSender<OutboundEvent>;

#[derive(Debug, Default)]
struct Membership {
    /// channel → members, for fan-out.
    by_channel: HashMap<Channel, HashSet<ConnectionId>>,
    /// connection → channels, for O(1) cleanup on disconnect.
    by_connection: HashMap<ConnectionId, HashSet<Channel>>,
}

/// Routes outbound events to channel members.
///
/// # Thread Safety
///
/// Uses `RwLock` for both the sink table and membership since broadcasts
/// (reads) vastly outnumber joins/leaves (writes). Membership snapshots are
/// taken before any queue is touched, so no lock is held across sends.
pub struct RoomManager {
    registry: Arc<dyn ConnectionRegistry>,
    sinks: RwLock<HashMap<ConnectionId, ConnectionSink>>,
    membership: RwLock<Membership>,
}

impl RoomManager {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self {
            registry,
            sinks: RwLock::new(HashMap::new()),
            membership: RwLock::new(Membership::default()),
        }
    }

    /// The registry used to resolve direct-to-user delivery.
    pub fn registry(&self) -> &Arc<dyn ConnectionRegistry> {
        &self.registry
    }

    /// Bind a connection's outbound queue. Re-attaching replaces the sink.
    pub async fn attach(&self, connection_id: ConnectionId, sink: ConnectionSink) {
        self.sinks.write().await.insert(connection_id, sink);
    }

    /// Unbind a connection and leave every channel it was in.
    ///
    /// Returns the channels it left. Unknown connections yield an empty list.
    pub async fn detach(&self, connection_id: &ConnectionId) -> Vec<Channel> {
        self.sinks.write().await.remove(connection_id);

        let mut membership = self.membership.write().await;
        let Some(channels) = membership.by_connection.remove(connection_id) else {
            return Vec::new();
        };
        for channel in &channels {
            remove_member(&mut membership.by_channel, channel, connection_id);
        }
        channels.into_iter().collect()
    }

    /// Add a connection to a channel. Returns `false` if it was already a
    /// member or the connection is not attached.
    pub async fn join(&self, connection_id: &ConnectionId, channel: Channel) -> bool {
        if !self.sinks.read().await.contains_key(connection_id) {
            tracing::debug!(
                connection_id = %connection_id,
                channel = %channel,
                "Ignoring join for detached connection"
            );
            return false;
        }

        let mut membership = self.membership.write().await;
        let added = membership
            .by_channel
            .entry(channel)
            .or_default()
            .insert(*connection_id);
        membership
            .by_connection
            .entry(*connection_id)
            .or_default()
            .insert(channel);

        if added {
            tracing::debug!(connection_id = %connection_id, channel = %channel, "Joined channel");
        }
        added
    }

    /// Remove a connection from a channel. Leaving a channel never joined is
    /// a no-op returning `false`.
    pub async fn leave(&self, connection_id: &ConnectionId, channel: &Channel) -> bool {
        let mut membership = self.membership.write().await;

        let was_member = match membership.by_connection.get_mut(connection_id) {
            Some(channels) => channels.remove(channel),
            None => false,
        };
        if !was_member {
            return false;
        }
        if membership
            .by_connection
            .get(connection_id)
            .is_some_and(HashSet::is_empty)
        {
            membership.by_connection.remove(connection_id);
        }
        remove_member(&mut membership.by_channel, channel, connection_id);

        tracing::debug!(connection_id = %connection_id, channel = %channel, "Left channel");
        true
    }

    /// Deliver to every member, sender included. Returns how many queues
    /// accepted the event.
    pub async fn broadcast(&self, channel: &Channel, event: &OutboundEvent) -> usize {
        let members = self.members(channel).await;
        self.deliver(&members, event).await
    }

    /// Deliver to every member except `except`.
    pub async fn broadcast_to_others(
        &self,
        channel: &Channel,
        event: &OutboundEvent,
        except: &ConnectionId,
    ) -> usize {
        let members: Vec<ConnectionId> = self
            .members(channel)
            .await
            .into_iter()
            .filter(|member| member != except)
            .collect();
        self.deliver(&members, event).await
    }

    /// Deliver to the user's current connection. Offline users are a silent
    /// no-op; nothing is queued for later.
    pub async fn broadcast_to_user(&self, user_id: &UserId, event: &OutboundEvent) -> bool {
        match self.registry.lookup_connection(user_id).await {
            Some(connection_id) => self.send_to_connection(&connection_id, event).await,
            None => {
                tracing::debug!(
                    user_id = %user_id,
                    event = event.kind.as_str(),
                    "User offline, dropping direct event"
                );
                false
            }
        }
    }

    /// Deliver to one connection.
    pub async fn send_to_connection(
        &self,
        connection_id: &ConnectionId,
        event: &OutboundEvent,
    ) -> bool {
        self.deliver(std::slice::from_ref(connection_id), event).await == 1
    }

    /// Current members of a channel.
    pub async fn members(&self, channel: &Channel) -> Vec<ConnectionId> {
        self.membership
            .read()
            .await
            .by_channel
            .get(channel)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Channels a connection is currently in.
    pub async fn channels_of(&self, connection_id: &ConnectionId) -> Vec<Channel> {
        self.membership
            .read()
            .await
            .by_connection
            .get(connection_id)
            .map(|channels| channels.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Channels with at least one member (for monitoring/debugging).
    pub async fn active_channels(&self) -> Vec<Channel> {
        self.membership.read().await.by_channel.keys().copied().collect()
    }

    /// Number of attached connections.
    pub async fn connection_count(&self) -> usize {
        self.sinks.read().await.len()
    }

    async fn deliver(&self, targets: &[ConnectionId], event: &OutboundEvent) -> usize {
        let sinks = self.sinks.read().await;
        let mut delivered = 0;
        for connection_id in targets {
            match sinks.get(connection_id) {
                Some(sink) if sink.send(event.clone()).is_ok() => delivered += 1,
                _ => {
                    tracing::trace!(
                        connection_id = %connection_id,
                        event = event.kind.as_str(),
                        "Connection gone, event dropped"
                    );
                }
            }
        }
        delivered
    }
}

fn remove_member(
    by_channel: &mut HashMap<Channel, HashSet<ConnectionId>>,
    channel: &Channel,
    connection_id: &ConnectionId,
) {
    if let Some(members) = by_channel.get_mut(channel) {
        members.remove(connection_id);
        if members.is_empty() {
            by_channel.remove(channel);
        }
    }
}
