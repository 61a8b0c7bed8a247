//! HS256 JWT adapter for bearer token validation.
//!
//! The marketplace auth service signs access tokens with a shared secret.
//! This adapter verifies the signature and expiry (and issuer, when
//! configured) and maps the claims to an `AuthenticatedUser`.
//!
//! The user id is read from the first present of `userId`, `id`, `sub`;
//! numeric strings are accepted. The `role` claim must name a known role.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId, UserRole};
use crate::ports::SessionValidator;

#[derive(Debug, Deserialize)]
struct MarketplaceClaims {
    #[serde(default, rename = "userId")]
    user_id: Option<UserId>,

    #[serde(default)]
    id: Option<UserId>,

    #[serde(default)]
    sub: Option<UserId>,

    role: String,

    #[serde(default)]
    email: Option<String>,

    #[serde(default)]
    name: Option<String>,
}

impl MarketplaceClaims {
    fn into_user(self) -> Result<AuthenticatedUser, AuthError> {
        let id = self.user_id.or(self.id).or(self.sub).ok_or_else(|| {
            tracing::warn!("Token carries no user id claim");
            AuthError::InvalidToken
        })?;
        let role: UserRole = self.role.parse().map_err(|_| {
            tracing::warn!(role = %self.role, "Token carries unknown role");
            AuthError::InvalidToken
        })?;

        let mut user = AuthenticatedUser::new(id, role);
        user.email = self.email;
        user.display_name = self.name;
        Ok(user)
    }
}

/// Verifies HS256 access tokens.
pub struct JwtSessionValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtSessionValidator {
    pub fn new(secret: &SecretString, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_issuer.as_deref())
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<MarketplaceClaims>(token, &self.key, &self.validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer => {
                    tracing::warn!("Invalid issuer in token");
                    AuthError::InvalidToken
                }
                ErrorKind::InvalidSignature => {
                    tracing::warn!("Invalid token signature");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!(error = %e, "Token rejected");
                    AuthError::InvalidToken
                }
            }
        })?;

        data.claims.into_user()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};

    const SECRET: &str = "test-signing-secret";

    fn validator() -> JwtSessionValidator {
        JwtSessionValidator::new(&SecretString::new(SECRET.to_string()), None)
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn sign(claims: Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn valid_token_maps_claims() {
        let token = sign(
            json!({"userId": 42, "role": "carrier", "email": "c@example.com", "name": "Cara", "exp": now() + 600}),
            SECRET,
        );

        let user = validator().validate(&token).await.unwrap();

        assert_eq!(user.id, UserId::new(42));
        assert_eq!(user.role, UserRole::Carrier);
        assert_eq!(user.email.as_deref(), Some("c@example.com"));
        assert_eq!(user.display_name.as_deref(), Some("Cara"));
    }

    #[tokio::test]
    async fn numeric_string_subject_is_accepted() {
        let token = sign(json!({"sub": "7", "role": "shipper", "exp": now() + 600}), SECRET);

        let user = validator().validate(&token).await.unwrap();
        assert_eq!(user.id, UserId::new(7));
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let token = sign(json!({"id": 1, "role": "shipper", "exp": now() - 3600}), SECRET);

        assert_eq!(
            validator().validate(&token).await.unwrap_err(),
            AuthError::TokenExpired
        );
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let token = sign(json!({"id": 1, "role": "shipper", "exp": now() + 600}), "other");

        assert_eq!(
            validator().validate(&token).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn unknown_role_is_invalid() {
        let token = sign(json!({"id": 1, "role": "pirate", "exp": now() + 600}), SECRET);

        assert_eq!(
            validator().validate(&token).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn missing_user_id_is_invalid() {
        let token = sign(json!({"role": "admin", "exp": now() + 600}), SECRET);

        assert_eq!(
            validator().validate(&token).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn garbage_is_invalid() {
        assert_eq!(
            validator().validate("not.a.jwt").await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn issuer_is_checked_when_configured() {
        let validator = JwtSessionValidator::new(
            &SecretString::new(SECRET.to_string()),
            Some("https://auth.freight.example"),
        );
        let wrong = sign(
            json!({"id": 1, "role": "shipper", "iss": "https://evil.example", "exp": now() + 600}),
            SECRET,
        );
        let right = sign(
            json!({"id": 1, "role": "shipper", "iss": "https://auth.freight.example", "exp": now() + 600}),
            SECRET,
        );

        assert_eq!(validator.validate(&wrong).await.unwrap_err(), AuthError::InvalidToken);
        assert!(validator.validate(&right).await.is_ok());
    }
}
