// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persistent entities of the catalog store.
//!
//! All entities are plain data: ownership lives in the store adapter, and
//! cross-component communication happens via events or read-only snapshots.

use crate::version::{SemVersion, VersionBump};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// A target language for localization.
///
/// At most one non-deleted language is the default at any instant, and the
/// IETF-like `code` is unique among non-deleted rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Stable identifier.
    pub id: Uuid,
    /// Short IETF-like code (e.g. `"en"`, `"pt-BR"`).
    pub code: String,
    /// English display name.
    pub name: String,
    /// Name in the language itself.
    pub native_name: String,
    /// Right-to-left script flag.
    pub is_rtl: bool,
    /// Whether the language is served to clients.
    pub is_active: bool,
    /// Whether this is the fallback language.
    pub is_default: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete flag.
    pub deleted: bool,
}

// ---------------------------------------------------------------------------
// LocalizationKey
// ---------------------------------------------------------------------------

/// A canonical dotted identifier clients use to look up a localized string.
///
/// `name` is unique among non-deleted keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizationKey {
    /// Stable identifier.
    pub id: Uuid,
    /// Dotted path (e.g. `"app.welcome"`).
    pub name: String,
    /// Optional grouping category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Optional translator-facing description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional usage context hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete flag.
    pub deleted: bool,
}

// ---------------------------------------------------------------------------
// Localization
// ---------------------------------------------------------------------------

/// A row binding `(key, language)` to a translated value.
///
/// `(key_id, language_id)` is unique among non-deleted rows, and `version`
/// is strictly increasing across the row's lifetime (the optimistic-lock
/// token for concurrent edits).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localization {
    /// Stable identifier.
    pub id: Uuid,
    /// The key this value translates.
    pub key_id: Uuid,
    /// The language of the value.
    pub language_id: Uuid,
    /// The translated string.
    pub value: String,
    /// Plural-category tag → string, ordered by tag.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plural_forms: BTreeMap<String, String>,
    /// Declared variable names, in declaration order. Interpolation is the
    /// caller's job; the server only reports the names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<String>,
    /// Whether the value has been approved for serving.
    pub approved: bool,
    /// Identity of the approver, when approved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    /// Monotonic edit version (≥ 1), incremented on every in-place edit.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete flag.
    pub deleted: bool,
}

// ---------------------------------------------------------------------------
// CatalogSnapshot
// ---------------------------------------------------------------------------

/// An immutable, content-checksummed materialization of a language catalog.
///
/// `(language, category, version)` is unique; the checksum is deterministic
/// in the mapping contents (see [`crate::catalog_checksum`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Stable identifier.
    pub id: Uuid,
    /// The language this snapshot materializes.
    pub language_id: Uuid,
    /// Denormalized language code, fixed at snapshot time.
    pub language_code: String,
    /// Optional category filter the snapshot was built under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Snapshot version, monotonic per `(language, category)`.
    pub version: i64,
    /// Full key name → value mapping at snapshot time.
    pub catalog: BTreeMap<String, String>,
    /// SHA-256 over the canonical encoding of `catalog`.
    pub checksum: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// LocalizationVersion
// ---------------------------------------------------------------------------

/// A user-visible semantic version of the whole catalog.
///
/// Version numbers are strictly increasing; the current version is the
/// highest, and it cannot be deleted while current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizationVersion {
    /// Stable identifier.
    pub id: Uuid,
    /// `MAJOR.MINOR.PATCH` number.
    pub number: SemVersion,
    /// Which component was advanced to create this version.
    pub version_type: VersionBump,
    /// Optional release description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of non-deleted keys at creation time.
    pub keys_count: i64,
    /// Number of non-deleted languages at creation time.
    pub languages_count: i64,
    /// Number of non-deleted localizations at creation time.
    pub localizations_count: i64,
    /// Optional free-form metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Identity of the creator.
    pub created_by: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// AuditRecord
// ---------------------------------------------------------------------------

/// One append-only audit entry, written for every admin mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Stable identifier.
    pub id: Uuid,
    /// Operation tag (e.g. `"create"`, `"update"`, `"delete"`, `"import"`).
    pub operation: String,
    /// Entity type the operation touched.
    pub entity_type: String,
    /// Identifier of the touched entity.
    pub entity_id: String,
    /// Actor identity (username).
    pub actor: String,
    /// Optional change payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Client network address.
    pub client_addr: String,
    /// Client agent string.
    pub client_agent: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
