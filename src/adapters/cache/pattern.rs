//! Glob patterns for cache key listing.
//!
//! Only `*` is a wildcard (any run of characters, including none). Every
//! other character matches itself, including regex metacharacters and the
//! characters Redis treats specially (`?`, `[`, `]`, `\`).

use regex::Regex;

use crate::ports::CacheError;

/// A compiled key pattern.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    pub fn new(pattern: &str) -> Result<Self, CacheError> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^(?s:{})$", body))
            .map_err(|e| CacheError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The same pattern in Redis `KEYS` syntax, with Redis's other glob
    /// metacharacters escaped so they match literally.
    pub fn to_redis_glob(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        for ch in self.source.chars() {
            if matches!(ch, '?' | '[' | ']' | '\\') {
                out.push('\\');
            }
            out.push(ch);
        }
        out
    }
}
