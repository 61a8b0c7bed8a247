//! HTTP handler for notification pushes.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::adapters::http::cache_service::ErrorResponse;
use crate::adapters::http::middleware::RequireAuth;
use crate::application::RealtimeHub;
use crate::domain::foundation::UserRole;
use crate::domain::realtime::RealtimeError;

use super::dto::{NotificationResponse, NotifyRequest};

#[derive(Clone)]
pub struct NotificationState {
    pub hub: Arc<RealtimeHub>,
}

impl NotificationState {
    pub fn new(hub: Arc<RealtimeHub>) -> Self {
        Self { hub }
    }
}

/// POST /notifications
///
/// Admin only. The row is stored before anything is pushed; a failed write
/// pushes nothing.
pub async fn create_notification(
    State(state): State<NotificationState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<NotifyRequest>,
) -> Result<impl IntoResponse, NotificationApiError> {
    if user.role != UserRole::Admin {
        return Err(NotificationApiError::Forbidden);
    }
    if request.title.trim().is_empty() {
        return Err(NotificationApiError::Validation("title must not be empty".to_string()));
    }

    let (target, notification) = request.into_parts();
    let outcome = state
        .hub
        .notify(target, notification)
        .await
        .map_err(NotificationApiError::Dispatch)?;

    let notification_id = outcome
        .notification_id
        .ok_or(NotificationApiError::Dispatch(RealtimeError::PersistenceFailure(
            "no notification id returned".to_string(),
        )))?;

    tracing::info!(
        user_id = %user.id,
        notification_id = %notification_id,
        delivered = outcome.delivered,
        "Notification pushed"
    );

    Ok((
        StatusCode::CREATED,
        Json(NotificationResponse {
            notification_id,
            delivered: outcome.delivered,
        }),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationApiError {
    #[error("Only admins may push notifications")]
    Forbidden,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Dispatch(RealtimeError),
}

impl IntoResponse for NotificationApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            NotificationApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            NotificationApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            NotificationApiError::Dispatch(RealtimeError::PersistenceFailure(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_FAILURE")
            }
            NotificationApiError::Dispatch(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        (status, Json(ErrorResponse::new(code, self.to_string()))).into_response()
    }
}
