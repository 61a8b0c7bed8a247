//! Records the real-time layer persists.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{ShipmentId, UserId, UserRole};

/// A chat message to be stored before it is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub shipment_id: ShipmentId,
    pub body: String,
}

/// Who a notification is addressed to.
///
/// Role-addressed notifications land on the role's panel channel; user
/// notifications land on that user's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotificationTarget {
    #[serde(rename = "user", rename_all = "camelCase")]
    ToUser { user_id: UserId },
    #[serde(rename = "role")]
    ToRole { role: UserRole },
}

impl NotificationTarget {
    pub fn user(user_id: UserId) -> Self {
        NotificationTarget::ToUser { user_id }
    }

    pub fn role(role: UserRole) -> Self {
        NotificationTarget::ToRole { role }
    }
}

/// A notification to be stored and pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_deserializes_user_variant() {
        let target: NotificationTarget =
            serde_json::from_value(json!({"type": "user", "userId": 4})).unwrap();
        assert_eq!(target, NotificationTarget::user(UserId::new(4)));
    }

    #[test]
    fn target_deserializes_role_variant() {
        let target: NotificationTarget =
            serde_json::from_value(json!({"type": "role", "role": "carrier"})).unwrap();
        assert_eq!(target, NotificationTarget::role(UserRole::Carrier));
    }

    #[test]
    fn notification_omits_null_data() {
        let n = NewNotification {
            title: "Offer accepted".into(),
            body: "Your offer was accepted".into(),
            data: Value::Null,
        };
        assert_eq!(
            serde_json::to_value(&n).unwrap(),
            json!({"title": "Offer accepted", "body": "Your offer was accepted"})
        );
    }
}
