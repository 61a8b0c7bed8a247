//! IdentityResolver - turns a raw bearer credential into a user.
//!
//! Resolution order:
//!
//! 1. Demo credentials (`demo-{role}-{userId}`), when enabled, are accepted
//!    as-is. No cache, no signature check.
//! 2. The cache, under `token:{raw}`. A hit is trusted until it expires.
//! 3. The validator. On success the identity is cached; failures are not.
//!
//! Used by both the gateway middleware and the WebSocket handshake.

use std::sync::Arc;
use std::time::Duration;

use crate::adapters::cache::CacheAside;
use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId, UserRole};
use crate::ports::SessionValidator;

const DEMO_PREFIX: &str = "demo-";

/// Key prefix of memoized identities.
pub const TOKEN_KEY_PREFIX: &str = "token:";

/// Resolves bearer credentials, memoizing verified identities.
#[derive(Clone)]
pub struct IdentityResolver {
    validator: Arc<dyn SessionValidator>,
    cache: CacheAside,
    cache_ttl: Duration,
    allow_demo: bool,
}

impl IdentityResolver {
    pub fn new(validator: Arc<dyn SessionValidator>, cache: CacheAside, cache_ttl: Duration) -> Self {
        Self {
            validator,
            cache,
            cache_ttl,
            allow_demo: false,
        }
    }

    /// Enable or disable the demo bypass.
    pub fn with_demo_tokens(mut self, allow: bool) -> Self {
        self.allow_demo = allow;
        self
    }

    /// Cache key for a raw credential.
    pub fn cache_key(raw: &str) -> String {
        format!("{}{}", TOKEN_KEY_PREFIX, raw)
    }

    /// Parse a demo credential such as `demo-carrier-42`.
    pub fn parse_demo(raw: &str) -> Option<AuthenticatedUser> {
        let rest = raw.strip_prefix(DEMO_PREFIX)?;
        let (role, id) = rest.rsplit_once('-')?;
        let role: UserRole = role.parse().ok()?;
        let id: i64 = id.parse().ok().filter(|id| *id > 0)?;
        Some(AuthenticatedUser::new(UserId::new(id), role))
    }

    pub async fn resolve(&self, raw: &str) -> Result<AuthenticatedUser, AuthError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        if self.allow_demo {
            if let Some(user) = Self::parse_demo(raw) {
                tracing::debug!(user_id = %user.id, role = %user.role, "Demo credential accepted");
                return Ok(user);
            }
        }

        let key = Self::cache_key(raw);
        if let Some(user) = self.cache.get_as::<AuthenticatedUser>(&key).await {
            return Ok(user);
        }

        let user = self.validator.validate(raw).await?;
        self.cache.set_as(&key, &user, Some(self.cache_ttl)).await;
        tracing::debug!(user_id = %user.id, "Verified credential cached");
        Ok(user)
    }
}

/// The credential from an `Authorization: Bearer ...` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
