//! Authentication middleware and extractors for axum.
//!
//! This module provides:
//! - `auth_middleware` - Layer that resolves Bearer credentials and injects the user into extensions
//! - `RequireAuth` - Extractor that requires authentication
//!
//! Resolution goes through `IdentityResolver`, so the demo bypass and the
//! `token:{raw}` identity cache apply identically here and on the WebSocket
//! handshake.
//!
//! ```text
//! Request → auth_middleware → injects AuthenticatedUser into extensions
//!                                      ↓
//!                              Handler → RequireAuth extractor reads from extensions
//! ```

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::{bearer_token, IdentityResolver};
use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Auth middleware state.
pub type AuthState = IdentityResolver;

/// Authentication middleware that requires a valid Bearer credential.
///
/// On success the resolved `AuthenticatedUser` is inserted into request
/// extensions. A missing or rejected credential ends the request with 401.
pub async fn auth_middleware(
    State(identity): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);

    let Some(token) = token else {
        return AuthRejection(AuthError::MissingCredential).into_response();
    };

    match identity.resolve(&token).await {
        Ok(user) => {
            tracing::debug!(user_id = %user.id, role = %user.role, "Request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, path = %request.uri().path(), "Request rejected");
            AuthRejection(e).into_response()
        }
    }
}

/// Extractor that requires authentication.
///
/// Returns 401 when `auth_middleware` did not run or did not inject a user.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or(AuthRejection(AuthError::MissingCredential))
    }
}

/// Rejection for authentication failures.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthRejection(pub AuthError);

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AuthError::MissingCredential => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::ServiceUnavailable(msg) => {
                tracing::error!("Auth service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Authentication service unavailable",
                )
            }
        };

        (
            status,
            Json(serde_json::json!({
                "error": message,
                "code": "AUTH_ERROR"
            })),
        )
            .into_response()
    }
}
