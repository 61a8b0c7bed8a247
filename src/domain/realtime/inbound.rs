//! Events clients send over the socket.
//!
//! Frames arrive as an event name plus a JSON payload. [`InboundEvent::parse`]
//! turns them into typed events; anything unknown or missing a required
//! field becomes [`RealtimeError::MalformedEvent`] before any side effect.
//!
//! Payloads that are echoed to other clients keep unknown fields in `extra`
//! so the frontend can attach display data without a server change.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::{OfferId, ShipmentId, UserId};

use super::errors::RealtimeError;

/// Accepts `1250`, `1250.5` or `"1250.5"`.
fn deserialize_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(value) => Ok(value),
        Raw::Str(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid price '{}'", text))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentCreated {
    pub shipment_id: ShipmentId,
    pub title: String,
    pub from_location: String,
    pub to_location: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferCreated {
    pub offer_id: OfferId,
    pub shipment_id: ShipmentId,
    pub carrier_id: UserId,
    #[serde(deserialize_with = "deserialize_price")]
    pub price: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferStatusChanged {
    pub offer_id: OfferId,
    pub shipment_id: ShipmentId,
    pub carrier_id: UserId,
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentStatusChanged {
    pub shipment_id: ShipmentId,
    pub status: String,
    pub user_id: UserId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub shipment_id: ShipmentId,
    pub message: String,
    pub receiver_id: UserId,
}

/// Payload shared by join/leave/typing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRef {
    pub shipment_id: ShipmentId,
}

/// A validated inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    ShipmentCreated(ShipmentCreated),
    OfferCreated(OfferCreated),
    OfferStatusChanged(OfferStatusChanged),
    ShipmentStatusChanged(ShipmentStatusChanged),
    SendMessage(SendMessage),
    JoinShipment(ShipmentRef),
    LeaveShipment(ShipmentRef),
    TypingStart(ShipmentRef),
    TypingStop(ShipmentRef),
    Ping,
}

impl InboundEvent {
    /// Every event name accepted from clients.
    pub const NAMES: [&'static str; 10] = [
        "shipment_created",
        "offer_created",
        "offer_status_changed",
        "shipment_status_changed",
        "send_message",
        "join_shipment",
        "leave_shipment",
        "typing_start",
        "typing_stop",
        "ping",
    ];

    /// Parse and validate a frame.
    pub fn parse(name: &str, data: Value) -> Result<Self, RealtimeError> {
        let event = match name {
            "shipment_created" => {
                let payload: ShipmentCreated = decode(name, data)?;
                require_text(name, "title", &payload.title)?;
                require_text(name, "fromLocation", &payload.from_location)?;
                require_text(name, "toLocation", &payload.to_location)?;
                InboundEvent::ShipmentCreated(payload)
            }
            "offer_created" => {
                let payload: OfferCreated = decode(name, data)?;
                if !payload.price.is_finite() || payload.price < 0.0 {
                    return Err(RealtimeError::malformed(name, "price must be a non-negative number"));
                }
                InboundEvent::OfferCreated(payload)
            }
            "offer_status_changed" => {
                let payload: OfferStatusChanged = decode(name, data)?;
                require_text(name, "status", &payload.status)?;
                InboundEvent::OfferStatusChanged(payload)
            }
            "shipment_status_changed" => {
                let payload: ShipmentStatusChanged = decode(name, data)?;
                require_text(name, "status", &payload.status)?;
                InboundEvent::ShipmentStatusChanged(payload)
            }
            "send_message" => {
                let payload: SendMessage = decode(name, data)?;
                require_text(name, "message", &payload.message)?;
                InboundEvent::SendMessage(payload)
            }
            "join_shipment" => InboundEvent::JoinShipment(decode(name, data)?),
            "leave_shipment" => InboundEvent::LeaveShipment(decode(name, data)?),
            "typing_start" => InboundEvent::TypingStart(decode(name, data)?),
            "typing_stop" => InboundEvent::TypingStop(decode(name, data)?),
            "ping" => InboundEvent::Ping,
            other => return Err(RealtimeError::malformed(other, "unknown event")),
        };
        Ok(event)
    }

    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::ShipmentCreated(_) => "shipment_created",
            InboundEvent::OfferCreated(_) => "offer_created",
            InboundEvent::OfferStatusChanged(_) => "offer_status_changed",
            InboundEvent::ShipmentStatusChanged(_) => "shipment_status_changed",
            InboundEvent::SendMessage(_) => "send_message",
            InboundEvent::JoinShipment(_) => "join_shipment",
            InboundEvent::LeaveShipment(_) => "leave_shipment",
            InboundEvent::TypingStart(_) => "typing_start",
            InboundEvent::TypingStop(_) => "typing_stop",
            InboundEvent::Ping => "ping",
        }
    }
}

fn decode<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, RealtimeError> {
    serde_json::from_value(data).map_err(|e| RealtimeError::malformed(event, e.to_string()))
}

fn require_text(event: &str, field: &str, value: &str) -> Result<(), RealtimeError> {
    if value.trim().is_empty() {
        return Err(RealtimeError::malformed(event, format!("field `{}` is empty", field)));
    }
    Ok(())
}
