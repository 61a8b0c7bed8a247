//! Authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Minimum HS256 secret length accepted in production.
pub const MIN_PRODUCTION_SECRET_BYTES: usize = 32;

/// Bearer credential settings shared by the gateway and the socket handshake
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret shared with the marketplace auth service
    #[serde(default = "default_secret")]
    pub jwt_secret: SecretString,

    /// Expected `iss` claim; unchecked when absent
    #[serde(default)]
    pub jwt_issuer: Option<String>,

    /// How long a verified identity is reused from the cache, in seconds
    #[serde(default = "default_token_cache_ttl")]
    pub token_cache_ttl_secs: u64,

    /// Accept `demo-{role}-{userId}` credentials without verification
    #[serde(default)]
    pub allow_demo_tokens: bool,
}

impl AuthConfig {
    pub fn token_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.token_cache_ttl_secs)
    }

    /// Validate authentication configuration
    ///
    /// Production requires a long secret and refuses the demo bypass.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let secret_len = self.jwt_secret.expose_secret().len();
        if secret_len == 0 {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        if self.token_cache_ttl_secs == 0 {
            return Err(ValidationError::ZeroTtl("auth.token_cache_ttl_secs"));
        }

        if *environment == Environment::Production {
            if secret_len < MIN_PRODUCTION_SECRET_BYTES {
                return Err(ValidationError::JwtSecretTooShort(MIN_PRODUCTION_SECRET_BYTES));
            }
            if self.allow_demo_tokens {
                return Err(ValidationError::DemoTokensInProduction);
            }
        }

        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_secret(),
            jwt_issuer: None,
            token_cache_ttl_secs: default_token_cache_ttl(),
            allow_demo_tokens: false,
        }
    }
}

fn default_secret() -> SecretString {
    SecretString::new(String::new())
}

fn default_token_cache_ttl() -> u64 {
    300
}
