//! RealtimeHub - executes dispatch plans against live connections.
//!
//! The hub owns the connection lifecycle (register, auto-join, teardown)
//! and runs the plan for each inbound event in a fixed order:
//!
//! 1. the persistence write, if any; on failure stop, broadcast nothing
//! 2. the membership change, if any
//! 3. every broadcast, best-effort
//!
//! Events from one connection are handled in arrival order because the
//! socket loop awaits each call. Different connections run concurrently.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::adapters::websocket::{ConnectionSink, RoomManager};
use crate::domain::foundation::{AuthenticatedUser, ConnectionId, MessageId, NotificationId, UserId};
use crate::domain::realtime::{
    plan, plan_notification, BroadcastTarget, Channel, DispatchPlan, InboundEvent,
    MembershipChange, NewNotification, NotificationTarget, OutboundEvent, OutboundKind,
    PersistenceDirective, RealtimeError, SenderContext,
};
use crate::ports::{ConnectionRegistry, RealtimeStore};

/// What executing a plan did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub message_id: Option<MessageId>,
    pub notification_id: Option<NotificationId>,
    /// Number of connection queues that accepted an event.
    pub delivered: usize,
}

/// Entry point for everything real-time.
pub struct RealtimeHub {
    registry: Arc<dyn ConnectionRegistry>,
    rooms: Arc<RoomManager>,
    store: Arc<dyn RealtimeStore>,
}

impl RealtimeHub {
    pub fn new(rooms: Arc<RoomManager>, store: Arc<dyn RealtimeStore>) -> Self {
        Self {
            registry: rooms.registry().clone(),
            rooms,
            store,
        }
    }

    pub fn rooms(&self) -> &Arc<RoomManager> {
        &self.rooms
    }

    /// Register an authenticated connection and join its implicit channels.
    ///
    /// The client receives a `connected` event once it is reachable on its
    /// user and role channels.
    pub async fn connect(
        &self,
        user: &AuthenticatedUser,
        sink: ConnectionSink,
    ) -> Result<SenderContext, RealtimeError> {
        let ctx = SenderContext {
            connection_id: ConnectionId::new(),
            user_id: user.id,
            role: user.role,
        };

        self.registry.register(ctx.connection_id, ctx.user_id).await?;
        self.rooms.attach(ctx.connection_id, sink).await;

        let channels = Channel::implicit_for(ctx.user_id, ctx.role);
        for channel in channels {
            self.rooms.join(&ctx.connection_id, channel).await;
        }

        let greeting = OutboundEvent::new(
            OutboundKind::Connected,
            json!({
                "connectionId": ctx.connection_id.to_string(),
                "userId": ctx.user_id,
                "role": ctx.role,
                "channels": channels.iter().map(ToString::to_string).collect::<Vec<_>>(),
            }),
        );
        self.rooms.send_to_connection(&ctx.connection_id, &greeting).await;

        tracing::info!(
            connection_id = %ctx.connection_id,
            user_id = %ctx.user_id,
            role = %ctx.role,
            "Connection registered"
        );
        Ok(ctx)
    }

    /// Tear a connection down. Safe to call more than once.
    pub async fn disconnect(&self, ctx: &SenderContext) {
        let left = self.rooms.detach(&ctx.connection_id).await;
        let was_registered = self.registry.unregister(&ctx.connection_id).await.is_some();

        if was_registered {
            tracing::info!(
                connection_id = %ctx.connection_id,
                user_id = %ctx.user_id,
                channels_left = left.len(),
                "Connection closed"
            );
        }
    }

    /// Handle one inbound event from a live connection.
    pub async fn handle(
        &self,
        ctx: &SenderContext,
        event_name: &str,
        data: Value,
    ) -> Result<DispatchOutcome, RealtimeError> {
        if self.registry.lookup_user(&ctx.connection_id).await != Some(ctx.user_id) {
            return Err(RealtimeError::UnknownConnection(ctx.connection_id));
        }

        let event = InboundEvent::parse(event_name, data)?;
        tracing::debug!(
            connection_id = %ctx.connection_id,
            user_id = %ctx.user_id,
            event = event.name(),
            "Handling inbound event"
        );

        self.execute(Some(ctx), plan(ctx, event)).await
    }

    /// Store a notification and push it to its target.
    pub async fn notify(
        &self,
        target: NotificationTarget,
        notification: NewNotification,
    ) -> Result<DispatchOutcome, RealtimeError> {
        self.execute(None, plan_notification(target, notification)).await
    }

    /// Users with a live connection.
    pub async fn online_users(&self) -> Vec<UserId> {
        self.registry.list_online_users().await
    }

    async fn execute(
        &self,
        sender: Option<&SenderContext>,
        mut plan: DispatchPlan,
    ) -> Result<DispatchOutcome, RealtimeError> {
        let mut outcome = DispatchOutcome::default();

        match &plan.persistence {
            PersistenceDirective::None => {}
            PersistenceDirective::InsertMessage(message) => {
                let id = self.store.insert_message(message).await.map_err(|e| {
                    tracing::error!(
                        shipment_id = %message.shipment_id,
                        sender_id = %message.sender_id,
                        error = %e,
                        "Message not stored, skipping broadcast"
                    );
                    RealtimeError::from(e)
                })?;
                outcome.message_id = Some(id);
                plan.stamp("messageId", json!(id));
            }
            PersistenceDirective::InsertNotification {
                target,
                notification,
            } => {
                let id = self
                    .store
                    .insert_notification(target, notification)
                    .await
                    .map_err(|e| {
                        tracing::error!(error = %e, "Notification not stored, skipping broadcast");
                        RealtimeError::from(e)
                    })?;
                outcome.notification_id = Some(id);
                plan.stamp("notificationId", json!(id));
            }
        }

        if let (Some(change), Some(ctx)) = (plan.membership, sender) {
            self.apply_membership(ctx, change).await;
        }

        for broadcast in &plan.broadcasts {
            outcome.delivered += self
                .deliver(sender, broadcast.target, &broadcast.event)
                .await;
        }

        Ok(outcome)
    }

    async fn apply_membership(&self, ctx: &SenderContext, change: MembershipChange) {
        let (channel, joining) = match change {
            MembershipChange::Join(channel) => (channel, true),
            MembershipChange::Leave(channel) => (channel, false),
        };
        // User and role channels last for the whole connection.
        if !channel.is_explicit() {
            tracing::warn!(
                connection_id = %ctx.connection_id,
                channel = %channel,
                "Refusing membership change on implicit channel"
            );
            return;
        }
        if joining {
            self.rooms.join(&ctx.connection_id, channel).await;
        } else {
            self.rooms.leave(&ctx.connection_id, &channel).await;
        }
    }

    async fn deliver(
        &self,
        sender: Option<&SenderContext>,
        target: BroadcastTarget,
        event: &OutboundEvent,
    ) -> usize {
        match target {
            BroadcastTarget::Channel(channel) => self.rooms.broadcast(&channel, event).await,
            BroadcastTarget::ChannelExceptSender(channel) => match sender {
                Some(ctx) => {
                    self.rooms
                        .broadcast_to_others(&channel, event, &ctx.connection_id)
                        .await
                }
                None => self.rooms.broadcast(&channel, event).await,
            },
            BroadcastTarget::User(user_id) => {
                usize::from(self.rooms.broadcast_to_user(&user_id, event).await)
            }
            BroadcastTarget::ShipmentOwner(shipment_id) => {
                match self.store.shipment_owner(shipment_id).await {
                    Ok(Some(owner)) => usize::from(self.rooms.broadcast_to_user(&owner, event).await),
                    Ok(None) => {
                        tracing::debug!(shipment_id = %shipment_id, "Unknown shipment, no owner to notify");
                        0
                    }
                    Err(e) => {
                        tracing::warn!(shipment_id = %shipment_id, error = %e, "Shipment owner lookup failed");
                        0
                    }
                }
            }
            BroadcastTarget::Sender => match sender {
                Some(ctx) => usize::from(self.rooms.send_to_connection(&ctx.connection_id, event).await),
                None => 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::InMemoryRealtimeStore;
    use crate::adapters::websocket::InMemoryConnectionRegistry;
    use crate::domain::foundation::{ShipmentId, UserRole};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    struct Fixture {
        hub: RealtimeHub,
        store: InMemoryRealtimeStore,
    }

    fn fixture(store: InMemoryRealtimeStore) -> Fixture {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let rooms = Arc::new(RoomManager::new(registry));
        Fixture {
            hub: RealtimeHub::new(rooms, Arc::new(store.clone())),
            store,
        }
    }

    async fn connect(
        hub: &RealtimeHub,
        id: i64,
        role: UserRole,
    ) -> (SenderContext, UnboundedReceiver<OutboundEvent>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ctx = hub
            .connect(&AuthenticatedUser::new(UserId::new(id), role), tx)
            .await
            .unwrap();
        let greeting = rx.try_recv().unwrap();
        assert_eq!(greeting.kind, OutboundKind::Connected);
        (ctx, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<OutboundEvent>) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn connect_joins_user_and_role_channels() {
        let f = fixture(InMemoryRealtimeStore::new());
        let (ctx, _rx) = connect(&f.hub, 1, UserRole::Carrier).await;

        let mut channels = f.hub.rooms().channels_of(&ctx.connection_id).await;
        channels.sort_by_key(ToString::to_string);
        assert_eq!(
            channels,
            vec![Channel::Role(UserRole::Carrier), Channel::User(UserId::new(1))]
        );
        assert_eq!(f.hub.online_users().await, vec![UserId::new(1)]);
    }

    #[tokio::test]
    async fn connected_greeting_lists_channels() {
        let f = fixture(InMemoryRealtimeStore::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        f.hub
            .connect(&AuthenticatedUser::new(UserId::new(3), UserRole::Shipper), tx)
            .await
            .unwrap();

        let greeting = rx.try_recv().unwrap();
        assert_eq!(greeting.data["userId"], json!(3));
        assert_eq!(greeting.data["role"], json!("shipper"));
        assert_eq!(greeting.data["channels"], json!(["user_3", "panel_shipper"]));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_clears_state() {
        let f = fixture(InMemoryRealtimeStore::new());
        let (ctx, _rx) = connect(&f.hub, 1, UserRole::Carrier).await;

        f.hub.disconnect(&ctx).await;
        f.hub.disconnect(&ctx).await;

        assert!(f.hub.online_users().await.is_empty());
        assert!(f.hub.rooms().active_channels().await.is_empty());
    }

    #[tokio::test]
    async fn events_after_disconnect_are_rejected() {
        let f = fixture(InMemoryRealtimeStore::new());
        let (ctx, _rx) = connect(&f.hub, 1, UserRole::Carrier).await;
        f.hub.disconnect(&ctx).await;

        let err = f.hub.handle(&ctx, "ping", Value::Null).await.unwrap_err();
        assert!(matches!(err, RealtimeError::UnknownConnection(_)));
    }

    #[tokio::test]
    async fn malformed_event_has_no_side_effects() {
        let f = fixture(InMemoryRealtimeStore::new());
        let (a, mut rx_a) = connect(&f.hub, 1, UserRole::Carrier).await;
        let (_b, mut rx_b) = connect(&f.hub, 2, UserRole::Shipper).await;

        let err = f
            .hub
            .handle(&a, "send_message", json!({"shipmentId": 1, "receiverId": 2}))
            .await
            .unwrap_err();

        assert!(matches!(err, RealtimeError::MalformedEvent { .. }));
        assert!(f.store.messages().await.is_empty());
        assert!(drain(&mut rx_a).is_empty());
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn unknown_event_name_is_malformed() {
        let f = fixture(InMemoryRealtimeStore::new());
        let (a, _rx) = connect(&f.hub, 1, UserRole::Carrier).await;

        let err = f.hub.handle(&a, "teleport", json!({})).await.unwrap_err();
        assert!(matches!(err, RealtimeError::MalformedEvent { .. }));
    }

    #[tokio::test]
    async fn send_message_stamps_stored_id() {
        let f = fixture(InMemoryRealtimeStore::new());
        let (a, _rx_a) = connect(&f.hub, 1, UserRole::Carrier).await;
        let (_b, mut rx_b) = connect(&f.hub, 2, UserRole::Shipper).await;

        let outcome = f
            .hub
            .handle(
                &a,
                "send_message",
                json!({"shipmentId": 1, "receiverId": 2, "message": "hi"}),
            )
            .await
            .unwrap();

        assert_eq!(outcome.message_id, Some(MessageId::new(1)));
        let received = drain(&mut rx_b);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].kind, OutboundKind::NewMessage);
        assert_eq!(received[0].data["messageId"], json!(1));
    }

    #[tokio::test]
    async fn typing_reaches_others_in_shipment_channel_only() {
        let f = fixture(InMemoryRealtimeStore::new());
        let (a, mut rx_a) = connect(&f.hub, 1, UserRole::Carrier).await;
        let (b, mut rx_b) = connect(&f.hub, 2, UserRole::Shipper).await;
        let (_c, mut rx_c) = connect(&f.hub, 3, UserRole::Carrier).await;
        for ctx in [&a, &b] {
            f.hub
                .handle(ctx, "join_shipment", json!({"shipmentId": 5}))
                .await
                .unwrap();
        }

        f.hub
            .handle(&a, "typing_start", json!({"shipmentId": 5}))
            .await
            .unwrap();

        assert!(drain(&mut rx_a).is_empty());
        let to_b = drain(&mut rx_b);
        assert_eq!(to_b.len(), 1);
        assert_eq!(to_b[0].data, json!({"userId": 1, "shipmentId": 5, "isTyping": true}));
        assert!(drain(&mut rx_c).is_empty());
    }

    #[tokio::test]
    async fn leave_shipment_stops_channel_delivery() {
        let f = fixture(InMemoryRealtimeStore::new());
        let (a, mut rx_a) = connect(&f.hub, 1, UserRole::Carrier).await;
        let (b, _rx_b) = connect(&f.hub, 2, UserRole::Shipper).await;
        f.hub
            .handle(&a, "join_shipment", json!({"shipmentId": 5}))
            .await
            .unwrap();
        f.hub
            .handle(&a, "leave_shipment", json!({"shipmentId": 5}))
            .await
            .unwrap();
        f.hub
            .handle(&a, "leave_shipment", json!({"shipmentId": 5}))
            .await
            .unwrap();

        f.hub
            .handle(
                &b,
                "shipment_status_changed",
                json!({"shipmentId": 5, "status": "in_transit", "userId": 2}),
            )
            .await
            .unwrap();

        assert!(drain(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn offer_created_reaches_shipment_owner() {
        let store = InMemoryRealtimeStore::new()
            .with_shipment(ShipmentId::new(8), UserId::new(2))
            .await;
        let f = fixture(store);
        let (carrier, _rx_a) = connect(&f.hub, 1, UserRole::Carrier).await;
        let (_owner, mut rx_owner) = connect(&f.hub, 2, UserRole::Shipper).await;

        let outcome = f
            .hub
            .handle(
                &carrier,
                "offer_created",
                json!({"offerId": 4, "shipmentId": 8, "carrierId": 1, "price": 1200.5}),
            )
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 1);
        let events = drain(&mut rx_owner);
        assert_eq!(events[0].kind, OutboundKind::NewOffer);
        assert_eq!(events[0].data["offerId"], json!(4));
    }

    #[tokio::test]
    async fn offer_for_unknown_shipment_delivers_nothing() {
        let f = fixture(InMemoryRealtimeStore::new());
        let (carrier, _rx) = connect(&f.hub, 1, UserRole::Carrier).await;

        let outcome = f
            .hub
            .handle(
                &carrier,
                "offer_created",
                json!({"offerId": 4, "shipmentId": 8, "carrierId": 1, "price": 10}),
            )
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 0);
    }

    #[tokio::test]
    async fn offer_status_change_reaches_carrier() {
        let f = fixture(InMemoryRealtimeStore::new());
        let (_carrier, mut rx_carrier) = connect(&f.hub, 1, UserRole::Carrier).await;
        let (shipper, _rx) = connect(&f.hub, 2, UserRole::Shipper).await;

        f.hub
            .handle(
                &shipper,
                "offer_status_changed",
                json!({"offerId": 4, "shipmentId": 8, "carrierId": 1, "status": "accepted"}),
            )
            .await
            .unwrap();

        let events = drain(&mut rx_carrier);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, OutboundKind::OfferStatusChanged);
    }

    #[tokio::test]
    async fn ping_answers_only_sender() {
        let f = fixture(InMemoryRealtimeStore::new());
        let (a, mut rx_a) = connect(&f.hub, 1, UserRole::Carrier).await;
        let (_b, mut rx_b) = connect(&f.hub, 2, UserRole::Carrier).await;

        f.hub.handle(&a, "ping", Value::Null).await.unwrap();

        assert_eq!(drain(&mut rx_a)[0].kind, OutboundKind::Pong);
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn notify_role_reaches_role_channel_and_stores_row() {
        let f = fixture(InMemoryRealtimeStore::new());
        let (_a, mut rx_a) = connect(&f.hub, 1, UserRole::Carrier).await;
        let (_b, mut rx_b) = connect(&f.hub, 2, UserRole::Shipper).await;

        let outcome = f
            .hub
            .notify(
                NotificationTarget::role(UserRole::Carrier),
                NewNotification {
                    title: "New load".into(),
                    body: "A shipment matches your lanes".into(),
                    data: Value::Null,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.notification_id, Some(NotificationId::new(1)));
        let events = drain(&mut rx_a);
        assert_eq!(events[0].kind, OutboundKind::Notification);
        assert_eq!(events[0].data["notificationId"], json!(1));
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(f.store.notifications().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_notification_write_is_not_pushed() {
        let store = InMemoryRealtimeStore::new();
        store.set_fail_writes(true);
        let f = fixture(store);
        let (_a, mut rx_a) = connect(&f.hub, 1, UserRole::Carrier).await;

        let err = f
            .hub
            .notify(
                NotificationTarget::user(UserId::new(1)),
                NewNotification {
                    title: "t".into(),
                    body: "b".into(),
                    data: Value::Null,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RealtimeError::PersistenceFailure(_)));
        assert!(drain(&mut rx_a).is_empty());
    }
}
