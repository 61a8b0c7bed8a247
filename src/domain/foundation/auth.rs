//! Authentication types for the domain layer.
//!
//! These types represent the identity behind a bearer credential. They have
//! **no provider dependencies** - the JWT adapter, the demo bypass, and test
//! mocks all produce the same `AuthenticatedUser`.
//!
//! `AuthenticatedUser` is serializable because resolved identities are
//! memoized in the cache-aside layer, keyed by the raw credential.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{UserId, UserRole};

/// Identity extracted from a validated credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    /// Marketplace account id.
    pub id: UserId,

    /// Account role; decides which panel channel the user joins.
    pub role: UserRole,

    /// Email from the token claims, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Display name, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl AuthenticatedUser {
    /// Creates a user with only the fields fan-out needs.
    pub fn new(id: UserId, role: UserRole) -> Self {
        Self {
            id,
            role,
            email: None,
            display_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Authentication errors that can occur during credential resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No bearer credential was presented.
    #[error("Authentication required")]
    MissingCredential,

    /// The token is malformed or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token signature is valid but it has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The verifier could not be reached.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_user_builder_sets_optional_fields() {
        let user = AuthenticatedUser::new(UserId::new(5), UserRole::Carrier)
            .with_email("driver@example.com")
            .with_display_name("Deniz");

        assert_eq!(user.email.as_deref(), Some("driver@example.com"));
        assert_eq!(user.display_name.as_deref(), Some("Deniz"));
    }

    #[test]
    fn authenticated_user_serializes_camel_case_without_empty_fields() {
        let user = AuthenticatedUser::new(UserId::new(5), UserRole::Shipper);
        let json = serde_json::to_value(&user).unwrap();

        assert_eq!(json, serde_json::json!({"id": 5, "role": "shipper"}));
    }

    #[test]
    fn authenticated_user_round_trips_through_json() {
        let user = AuthenticatedUser::new(UserId::new(9), UserRole::Logistics).with_email("a@b.c");
        let json = serde_json::to_value(&user).unwrap();
        let back: AuthenticatedUser = serde_json::from_value(json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn auth_error_service_unavailable_displays_message() {
        let err = AuthError::service_unavailable("Connection refused");
        assert_eq!(format!("{}", err), "Auth service unavailable: Connection refused");
    }

    #[test]
    fn auth_error_is_transient_for_service_errors() {
        assert!(AuthError::service_unavailable("timeout").is_transient());
        assert!(!AuthError::InvalidToken.is_transient());
        assert!(!AuthError::MissingCredential.is_transient());
    }
}
