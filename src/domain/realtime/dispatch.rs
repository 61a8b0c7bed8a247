//! Dispatch table for inbound events.
//!
//! [`plan`] is a pure function from (sender, event) to a [`DispatchPlan`]:
//! what to persist, which membership to change, and what to broadcast to
//! whom. It touches no sockets and no storage, so every row of the event
//! table is unit-testable. The hub executes plans.
//!
//! | Event | Write | Targets |
//! |---|---|---|
//! | shipment_created | - | carrier-like role channels |
//! | offer_created | - | shipment owner |
//! | offer_status_changed | - | offering carrier |
//! | shipment_status_changed | - | shipment channel |
//! | send_message | message | receiver + shipment channel |
//! | typing_start/stop | - | shipment channel minus sender |

use serde_json::Value;

use crate::domain::foundation::{ConnectionId, ShipmentId, UserId, UserRole};

use super::channel::Channel;
use super::inbound::{InboundEvent, ShipmentRef};
use super::outbound::{MessagePayload, OutboundEvent, OutboundKind, TypingPayload};
use super::records::{NewMessage, NewNotification, NotificationTarget};

/// Who sent an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderContext {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub role: UserRole,
}

/// The single write an event requires before anything is broadcast.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceDirective {
    None,
    InsertMessage(NewMessage),
    InsertNotification {
        target: NotificationTarget,
        notification: NewNotification,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Join(Channel),
    Leave(Channel),
}

/// Where one broadcast goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastTarget {
    /// Every member, sender included.
    Channel(Channel),
    /// Every member except the sending connection.
    ChannelExceptSender(Channel),
    /// The user's live connection, if any.
    User(UserId),
    /// Whoever posted the shipment; resolved through the store.
    ShipmentOwner(ShipmentId),
    /// Only the sending connection.
    Sender,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    pub target: BroadcastTarget,
    pub event: OutboundEvent,
}

impl Broadcast {
    pub fn new(target: BroadcastTarget, event: OutboundEvent) -> Self {
        Self { target, event }
    }
}

/// Everything an inbound event should cause, in execution order:
/// persistence first, membership second, broadcasts last.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPlan {
    pub persistence: PersistenceDirective,
    pub membership: Option<MembershipChange>,
    pub broadcasts: Vec<Broadcast>,
}

impl DispatchPlan {
    fn broadcast_only(broadcasts: Vec<Broadcast>) -> Self {
        Self {
            persistence: PersistenceDirective::None,
            membership: None,
            broadcasts,
        }
    }

    fn membership(change: MembershipChange) -> Self {
        Self {
            persistence: PersistenceDirective::None,
            membership: Some(change),
            broadcasts: Vec::new(),
        }
    }

    /// Copies a persisted record id into every broadcast payload.
    pub fn stamp(&mut self, field: &str, value: Value) {
        for broadcast in &mut self.broadcasts {
            broadcast.event.insert_field(field, value.clone());
        }
    }
}

/// Plan the effects of an inbound event.
pub fn plan(sender: &SenderContext, event: InboundEvent) -> DispatchPlan {
    match event {
        InboundEvent::ShipmentCreated(payload) => {
            let event = OutboundEvent::from_payload(OutboundKind::NewShipment, &payload);
            DispatchPlan::broadcast_only(
                UserRole::CARRIER_LIKE
                    .iter()
                    .map(|role| {
                        Broadcast::new(BroadcastTarget::Channel(Channel::Role(*role)), event.clone())
                    })
                    .collect(),
            )
        }
        InboundEvent::OfferCreated(payload) => {
            let target = BroadcastTarget::ShipmentOwner(payload.shipment_id);
            let event = OutboundEvent::from_payload(OutboundKind::NewOffer, &payload);
            DispatchPlan::broadcast_only(vec![Broadcast::new(target, event)])
        }
        InboundEvent::OfferStatusChanged(payload) => {
            let target = BroadcastTarget::User(payload.carrier_id);
            let event = OutboundEvent::from_payload(OutboundKind::OfferStatusChanged, &payload);
            DispatchPlan::broadcast_only(vec![Broadcast::new(target, event)])
        }
        InboundEvent::ShipmentStatusChanged(payload) => {
            let target = BroadcastTarget::Channel(Channel::Shipment(payload.shipment_id));
            let event = OutboundEvent::from_payload(OutboundKind::ShipmentStatusChanged, &payload);
            DispatchPlan::broadcast_only(vec![Broadcast::new(target, event)])
        }
        InboundEvent::SendMessage(payload) => {
            let delivered = MessagePayload {
                sender_id: sender.user_id,
                receiver_id: payload.receiver_id,
                shipment_id: payload.shipment_id,
                message: payload.message.clone(),
            };
            DispatchPlan {
                persistence: PersistenceDirective::InsertMessage(NewMessage {
                    sender_id: sender.user_id,
                    receiver_id: payload.receiver_id,
                    shipment_id: payload.shipment_id,
                    body: payload.message,
                }),
                membership: None,
                broadcasts: vec![
                    Broadcast::new(
                        BroadcastTarget::User(payload.receiver_id),
                        OutboundEvent::from_payload(OutboundKind::NewMessage, &delivered),
                    ),
                    Broadcast::new(
                        BroadcastTarget::Channel(Channel::Shipment(payload.shipment_id)),
                        OutboundEvent::from_payload(OutboundKind::MessageReceived, &delivered),
                    ),
                ],
            }
        }
        InboundEvent::JoinShipment(ShipmentRef { shipment_id }) => {
            DispatchPlan::membership(MembershipChange::Join(Channel::Shipment(shipment_id)))
        }
        InboundEvent::LeaveShipment(ShipmentRef { shipment_id }) => {
            DispatchPlan::membership(MembershipChange::Leave(Channel::Shipment(shipment_id)))
        }
        InboundEvent::TypingStart(ShipmentRef { shipment_id }) => typing(sender, shipment_id, true),
        InboundEvent::TypingStop(ShipmentRef { shipment_id }) => typing(sender, shipment_id, false),
        InboundEvent::Ping => DispatchPlan::broadcast_only(vec![Broadcast::new(
            BroadcastTarget::Sender,
            OutboundEvent::new(OutboundKind::Pong, Value::Null),
        )]),
    }
}

fn typing(sender: &SenderContext, shipment_id: ShipmentId, is_typing: bool) -> DispatchPlan {
    let payload = TypingPayload {
        user_id: sender.user_id,
        shipment_id,
        is_typing,
    };
    DispatchPlan::broadcast_only(vec![Broadcast::new(
        BroadcastTarget::ChannelExceptSender(Channel::Shipment(shipment_id)),
        OutboundEvent::from_payload(OutboundKind::UserTyping, &payload),
    )])
}

/// Plan a server-originated notification: store it, then push it.
pub fn plan_notification(target: NotificationTarget, notification: NewNotification) -> DispatchPlan {
    let broadcast_target = match target {
        NotificationTarget::ToUser { user_id } => BroadcastTarget::User(user_id),
        NotificationTarget::ToRole { role } => BroadcastTarget::Channel(Channel::Role(role)),
    };
    let event = OutboundEvent::from_payload(OutboundKind::Notification, &notification);
    DispatchPlan {
        persistence: PersistenceDirective::InsertNotification {
            target,
            notification,
        },
        membership: None,
        broadcasts: vec![Broadcast::new(broadcast_target, event)],
    }
}
