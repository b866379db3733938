// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical catalog encoding and content checksum.
//!
//! Two snapshots with identical contents must produce identical checksums,
//! so the encoding is fully deterministic: entries in ascending key order,
//! each key and value length-prefixed with a big-endian `u64`.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Produce the canonical byte encoding of a catalog mapping.
///
/// Layout per entry: `len(key) as u64 BE || key || len(value) as u64 BE ||
/// value`, iterated in ascending key order. Length prefixes make the
/// encoding injective — no concatenation of entries can collide with a
/// different mapping.
pub fn canonical_encoding(catalog: &BTreeMap<String, String>) -> Vec<u8> {
    let mut out = Vec::with_capacity(catalog.len() * 32);
    for (key, value) in catalog {
        out.extend_from_slice(&(key.len() as u64).to_be_bytes());
        out.extend_from_slice(key.as_bytes());
        out.extend_from_slice(&(value.len() as u64).to_be_bytes());
        out.extend_from_slice(value.as_bytes());
    }
    out
}

/// Compute the hex-encoded SHA-256 checksum of a catalog mapping.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use l10n_core::catalog_checksum;
///
/// let catalog = BTreeMap::from([("app.welcome".to_string(), "Welcome!".to_string())]);
/// let a = catalog_checksum(&catalog);
/// let b = catalog_checksum(&catalog.clone());
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64); // SHA-256 hex
/// ```
pub fn catalog_checksum(catalog: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_encoding(catalog));
    format!("{:x}", hasher.finalize())
}
