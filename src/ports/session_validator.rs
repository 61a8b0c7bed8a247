//! Session validation port for bearer token verification.
//!
//! This port defines the contract for verifying a credential's signature and
//! extracting user identity. It is provider-agnostic: the production
//! implementation verifies HS256 JWTs issued by the marketplace auth
//! service, and tests use a token table.
//!
//! Verification is the slow path. The gateway consults the demo bypass and
//! the identity cache first (see `application::identity`), so a validator
//! only sees credentials that are neither demo-shaped nor recently verified.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Verifies access tokens and extracts user identity.
///
/// # Contract
///
/// Implementations must:
/// - Verify the token signature
/// - Reject expired tokens with `AuthError::TokenExpired`
/// - Return `AuthError::InvalidToken` for malformed/bad signature tokens
/// - Return `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw token (without the "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{UserId, UserRole};
    use std::collections::HashMap;
    use std::sync::RwLock;

    /// Simple mock implementation for testing the trait
    struct TestSessionValidator {
        tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    }

    impl TestSessionValidator {
        fn new() -> Self {
            Self {
                tokens: RwLock::new(HashMap::new()),
            }
        }

        fn add_valid_token(&self, token: &str, user: AuthenticatedUser) {
            self.tokens.write().unwrap().insert(token.to_string(), user);
        }
    }

    #[async_trait]
    impl SessionValidator for TestSessionValidator {
        async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
            self.tokens
                .read()
                .unwrap()
                .get(token)
                .cloned()
                .ok_or(AuthError::InvalidToken)
        }
    }

    #[tokio::test]
    async fn session_validator_returns_user_for_valid_token() {
        let validator = TestSessionValidator::new();
        validator.add_valid_token(
            "valid-token-123",
            AuthenticatedUser::new(UserId::new(123), UserRole::Carrier),
        );

        let user = validator.validate("valid-token-123").await.unwrap();

        assert_eq!(user.id, UserId::new(123));
        assert_eq!(user.role, UserRole::Carrier);
    }

    #[tokio::test]
    async fn session_validator_returns_error_for_invalid_token() {
        let validator = TestSessionValidator::new();

        let result = validator.validate("invalid-token").await;

        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn session_validator_trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn SessionValidator>();
    }
}
