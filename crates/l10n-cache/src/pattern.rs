// SPDX-License-Identifier: MIT OR Apache-2.0
//! The restricted invalidation-pattern grammar: a literal prefix followed
//! by exactly one trailing `*`.

use crate::CacheError;

/// A compiled invalidation pattern.
///
/// The grammar is deliberately narrow — `prefix*` — so that every tier can
/// evaluate it cheaply (local tier: `starts_with`; Redis: `SCAN MATCH`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    prefix: String,
}

impl Pattern {
    /// Parse a pattern string of the form `prefix*`.
    ///
    /// A `*` anywhere but the final position, a missing `*`, or an empty
    /// prefix is rejected.
    pub fn parse(pattern: &str) -> Result<Self, CacheError> {
        let Some(prefix) = pattern.strip_suffix('*') else {
            return Err(CacheError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern must end with '*'",
            });
        };
        if prefix.is_empty() {
            return Err(CacheError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern prefix must not be empty",
            });
        }
        if prefix.contains('*') {
            return Err(CacheError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "only a single trailing '*' is allowed",
            });
        }
        Ok(Self {
            prefix: prefix.to_string(),
        })
    }

    /// The literal prefix before the wildcard.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The pattern in `SCAN MATCH` form (`prefix*`).
    pub fn as_match_arg(&self) -> String {
        format!("{}*", self.prefix)
    }

    /// Whether `key` falls under this pattern.
    pub fn matches(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefix_star() {
        let p = Pattern::parse("l10n:catalog:en:*").unwrap();
        assert_eq!(p.prefix(), "l10n:catalog:en:");
        assert_eq!(p.to_string(), "l10n:catalog:en:*");
    }

    #[test]
    fn matches_by_prefix() {
        let p = Pattern::parse("l10n:catalog:en:*").unwrap();
        assert!(p.matches("l10n:catalog:en:-"));
        assert!(p.matches("l10n:catalog:en:app"));
        assert!(!p.matches("l10n:catalog:de:-"));
    }

    #[test]
    fn rejects_missing_star() {
        assert!(Pattern::parse("l10n:catalog:en:").is_err());
    }

    #[test]
    fn rejects_embedded_star() {
        assert!(Pattern::parse("l10n:*:en:*").is_err());
    }

    #[test]
    fn rejects_bare_star() {
        assert!(Pattern::parse("*").is_err());
    }
}
