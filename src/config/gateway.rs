//! Gateway configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Settings for the `/api` proxy and its response cache
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Marketplace backend base URL; the proxy is disabled when absent
    #[serde(default)]
    pub upstream_url: Option<String>,

    /// Path prefixes whose GET responses are memoized (comma-separated)
    #[serde(default = "default_cacheable_prefixes")]
    pub cacheable_prefixes: String,

    /// Lifetime of a memoized response, in seconds
    #[serde(default = "default_response_cache_ttl")]
    pub response_cache_ttl_secs: u64,

    /// Responses larger than this are passed through uncached
    #[serde(default = "default_max_cached_body_bytes")]
    pub max_cached_body_bytes: usize,

    /// Upstream request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,
}

impl GatewayConfig {
    pub fn response_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.response_cache_ttl_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn cacheable_prefix_list(&self) -> Vec<String> {
        self.cacheable_prefixes
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = &self.upstream_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidUpstreamUrl);
            }
        }
        if let Some(bad) = self
            .cacheable_prefix_list()
            .into_iter()
            .find(|prefix| !prefix.starts_with('/'))
        {
            return Err(ValidationError::InvalidCacheablePrefix(bad));
        }
        if self.response_cache_ttl_secs == 0 {
            return Err(ValidationError::ZeroTtl("gateway.response_cache_ttl_secs"));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            upstream_url: None,
            cacheable_prefixes: default_cacheable_prefixes(),
            response_cache_ttl_secs: default_response_cache_ttl(),
            max_cached_body_bytes: default_max_cached_body_bytes(),
            upstream_timeout_secs: default_upstream_timeout(),
        }
    }
}

fn default_cacheable_prefixes() -> String {
    "/api/shipments,/api/offers".to_string()
}

fn default_response_cache_ttl() -> u64 {
    300
}

fn default_max_cached_body_bytes() -> usize {
    1024 * 1024
}

fn default_upstream_timeout() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.upstream_url, None);
        assert_eq!(
            config.cacheable_prefix_list(),
            vec!["/api/shipments", "/api/offers"]
        );
        assert_eq!(config.response_cache_ttl(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_upstream_rejected() {
        let config = GatewayConfig {
            upstream_url: Some("ftp://backend".to_string()),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidUpstreamUrl));
    }

    #[test]
    fn test_relative_prefix_rejected() {
        let config = GatewayConfig {
            cacheable_prefixes: "/api/shipments, api/offers".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidCacheablePrefix("api/offers".to_string()))
        );
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = GatewayConfig {
            response_cache_ttl_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
