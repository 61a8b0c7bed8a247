//! WebSocket wire frames.
//!
//! Every frame is a JSON text message naming an event:
//! - Client → Server: `{"event": "send_message", "data": {...}}`
//! - Server → Client: `{"event": "new_message", "data": {...}, "timestamp": "..."}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::realtime::{OutboundEvent, OutboundKind};

// ============================================
// Client → Server
// ============================================

/// A frame received from a client. `data` defaults to `null` when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

// ============================================
// Server → Client
// ============================================

/// A frame sent to a client.
#[derive(Debug, Clone, Serialize)]
pub struct ServerFrame {
    pub event: OutboundKind,
    pub data: Value,
    pub timestamp: String,
}

impl ServerFrame {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&OutboundEvent> for ServerFrame {
    fn from(event: &OutboundEvent) -> Self {
        Self {
            event: event.kind,
            data: event.data.clone(),
            timestamp: event.timestamp.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_frame_parses_event_and_data() {
        let frame =
            ClientFrame::parse(r#"{"event":"join_shipment","data":{"shipmentId":4}}"#).unwrap();
        assert_eq!(frame.event, "join_shipment");
        assert_eq!(frame.data, json!({"shipmentId": 4}));
    }

    #[test]
    fn client_frame_without_data_is_null() {
        let frame = ClientFrame::parse(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(frame.data, Value::Null);
    }

    #[test]
    fn client_frame_without_event_is_rejected() {
        assert!(ClientFrame::parse(r#"{"data":{}}"#).is_err());
        assert!(ClientFrame::parse("not json").is_err());
    }

    #[test]
    fn server_frame_serializes_wire_shape() {
        let event = OutboundEvent::new(OutboundKind::NewShipment, json!({"shipmentId": 1}));
        let text = ServerFrame::from(&event).to_text().unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed["event"], "new_shipment");
        assert_eq!(parsed["data"], json!({"shipmentId": 1}));
        assert!(parsed["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
