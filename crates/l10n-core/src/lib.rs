// SPDX-License-Identifier: MIT OR Apache-2.0
//! Core domain types for the localization catalog service.
//!
//! This crate holds everything the other service crates agree on: the
//! persistent entities ([`Language`], [`LocalizationKey`], [`Localization`],
//! [`CatalogSnapshot`], [`LocalizationVersion`], [`AuditRecord`]), the typed
//! event taxonomy published on the bus ([`CatalogEvent`]), semantic catalog
//! versions ([`SemVersion`]), and the canonical content checksum.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod checksum;
mod event;
mod model;
mod version;

pub use checksum::{canonical_encoding, catalog_checksum};
pub use event::{CatalogEvent, EventKind, EventMeta};
pub use model::{
    AuditRecord, CatalogSnapshot, Language, Localization, LocalizationKey, LocalizationVersion,
};
pub use version::{SemVersion, SemVersionError, VersionBump};

/// Cache keyspace prefix shared by every tier.
pub const CACHE_PREFIX: &str = "l10n:";

/// Build the cache key for the current catalog of a language.
///
/// The category component is the literal `-` when no category filter is
/// applied, keeping the keyspace unambiguous for pattern invalidation.
pub fn catalog_cache_key(language_code: &str, category: Option<&str>) -> String {
    format!(
        "{CACHE_PREFIX}catalog:{language_code}:{}",
        category.unwrap_or("-")
    )
}

/// Build the cache key for a versioned (immutable) catalog.
pub fn versioned_cache_key(language_code: &str, version: &SemVersion) -> String {
    format!("{CACHE_PREFIX}catalog:{language_code}:version:{version}")
}

/// The invalidation pattern covering every catalog entry of one language,
/// excluding nothing — versioned entries are filtered out by the cache
/// itself, which never pattern-deletes version-bound keys.
pub fn language_invalidation_pattern(language_code: &str) -> String {
    format!("{CACHE_PREFIX}catalog:{language_code}:*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_are_namespaced() {
        assert_eq!(catalog_cache_key("en", None), "l10n:catalog:en:-");
        assert_eq!(catalog_cache_key("en", Some("app")), "l10n:catalog:en:app");
        let v = SemVersion::new(1, 2, 0);
        assert_eq!(versioned_cache_key("de", &v), "l10n:catalog:de:version:1.2.0");
    }

    #[test]
    fn invalidation_pattern_covers_language() {
        assert_eq!(language_invalidation_pattern("fr"), "l10n:catalog:fr:*");
    }
}
