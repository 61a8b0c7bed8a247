//! Axum router configuration for notification pushes.

use axum::{routing::post, Router};

use super::handlers::{create_notification, NotificationState};

/// `POST /notifications`. Expects `auth_middleware` to be layered on top.
pub fn notifications_router() -> Router<NotificationState> {
    Router::new().route("/notifications", post(create_notification))
}
