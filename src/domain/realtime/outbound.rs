//! Events the server pushes to clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{ShipmentId, Timestamp, UserId};

/// Outbound event names, as the frontend listens for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundKind {
    Connected,
    NewShipment,
    NewOffer,
    OfferStatusChanged,
    ShipmentStatusChanged,
    NewMessage,
    MessageReceived,
    UserTyping,
    Notification,
    Pong,
}

impl OutboundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboundKind::Connected => "connected",
            OutboundKind::NewShipment => "new_shipment",
            OutboundKind::NewOffer => "new_offer",
            OutboundKind::OfferStatusChanged => "offer_status_changed",
            OutboundKind::ShipmentStatusChanged => "shipment_status_changed",
            OutboundKind::NewMessage => "new_message",
            OutboundKind::MessageReceived => "message_received",
            OutboundKind::UserTyping => "user_typing",
            OutboundKind::Notification => "notification",
            OutboundKind::Pong => "pong",
        }
    }
}

/// One event ready for fan-out.
///
/// The payload is plain JSON; it is built once and cloned per recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    pub kind: OutboundKind,
    pub data: Value,
    pub timestamp: Timestamp,
}

impl OutboundEvent {
    pub fn new(kind: OutboundKind, data: Value) -> Self {
        Self {
            kind,
            data,
            timestamp: Timestamp::now(),
        }
    }

    /// Serialize a typed payload. Payload types here are plain data, so
    /// a failure degrades to `null` instead of dropping the event.
    pub fn from_payload<T: Serialize>(kind: OutboundKind, payload: &T) -> Self {
        let data = serde_json::to_value(payload).unwrap_or_else(|e| {
            tracing::error!(event = kind.as_str(), "Failed to serialize payload: {}", e);
            Value::Null
        });
        Self::new(kind, data)
    }

    /// Sets a top-level field when the payload is an object.
    pub fn insert_field(&mut self, key: &str, value: Value) {
        if let Value::Object(map) = &mut self.data {
            map.insert(key.to_string(), value);
        }
    }
}

/// Chat message as delivered to both the receiver and the shipment room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub shipment_id: ShipmentId,
    pub message: String,
}

/// Typing indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub user_id: UserId,
    pub shipment_id: ShipmentId,
    pub is_typing: bool,
}
