//! Request and response bodies for notification pushes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::NotificationId;
use crate::domain::realtime::{NewNotification, NotificationTarget};

/// Body of `POST /notifications`.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyRequest {
    pub target: NotificationTarget,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: Value,
}

impl NotifyRequest {
    pub fn into_parts(self) -> (NotificationTarget, NewNotification) {
        (
            self.target,
            NewNotification {
                title: self.title,
                body: self.body,
                data: self.data,
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub notification_id: NotificationId,
    /// Live connections the push reached.
    pub delivered: usize,
}
