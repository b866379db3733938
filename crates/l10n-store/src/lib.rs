// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persistence adapter for the localization catalog service.
//!
//! The [`CatalogStore`] trait is the single point of durable mutation:
//! handlers and the catalog engine never touch the database directly.
//! Every operation either fully applies or reports one [`StoreError`]
//! variant; multi-statement mutations run inside a transaction so that no
//! torn writes are observable.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use l10n_core::{
    AuditRecord, CatalogSnapshot, Language, Localization, LocalizationKey, LocalizationVersion,
    SemVersion,
};
use std::collections::BTreeMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure set of the store adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The referenced entity does not exist (or is soft-deleted).
    #[error("{entity} not found")]
    NotFound {
        /// Entity type name.
        entity: &'static str,
    },

    /// A uniqueness invariant would be violated.
    #[error("{entity} already exists: {detail}")]
    AlreadyExists {
        /// Entity type name.
        entity: &'static str,
        /// The conflicting attribute value.
        detail: String,
    },

    /// The caller-supplied optimistic-lock version does not match the row.
    #[error("version conflict: expected {expected}, stored {stored}")]
    VersionConflict {
        /// Version the caller based its edit on.
        expected: i64,
        /// Version currently stored.
        stored: i64,
    },

    /// The payload failed semantic validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The database is unreachable or transiently failing.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Unexpected internal failure (corrupt row, codec error).
    #[error("internal store error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(e) => StoreError::Unavailable(e.to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Internal(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Write payloads
// ---------------------------------------------------------------------------

/// Attributes for creating a [`Language`].
#[derive(Debug, Clone)]
pub struct NewLanguage {
    /// Short IETF-like code.
    pub code: String,
    /// English display name.
    pub name: String,
    /// Name in the language itself.
    pub native_name: String,
    /// Right-to-left script flag.
    pub is_rtl: bool,
    /// Whether the language is served.
    pub is_active: bool,
    /// Whether this becomes the fallback language (clearing any previous
    /// default).
    pub is_default: bool,
}

/// In-place update of a [`Language`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct LanguagePatch {
    /// New display name.
    pub name: Option<String>,
    /// New native name.
    pub native_name: Option<String>,
    /// New right-to-left flag.
    pub is_rtl: Option<bool>,
    /// New active flag.
    pub is_active: Option<bool>,
    /// New default flag.
    pub is_default: Option<bool>,
}

/// Attributes for creating a [`LocalizationKey`].
#[derive(Debug, Clone)]
pub struct NewKey {
    /// Dotted key name.
    pub name: String,
    /// Optional category.
    pub category: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Optional context hint.
    pub context: Option<String>,
}

/// In-place update of a [`LocalizationKey`]. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct KeyPatch {
    /// New category.
    pub category: Option<Option<String>>,
    /// New description.
    pub description: Option<Option<String>>,
    /// New context hint.
    pub context: Option<Option<String>>,
}

/// Create-or-update payload for a localization row.
#[derive(Debug, Clone)]
pub struct UpsertLocalization {
    /// The key being translated.
    pub key_id: Uuid,
    /// The target language.
    pub language_id: Uuid,
    /// The translated value.
    pub value: String,
    /// Plural-category tag → string.
    pub plural_forms: BTreeMap<String, String>,
    /// Declared variable names.
    pub variables: Vec<String>,
    /// Approval state after the write.
    pub approved: bool,
    /// Approver identity when `approved` is set.
    pub approved_by: Option<String>,
    /// Optimistic-lock token; when `Some`, the write fails with
    /// [`StoreError::VersionConflict`] unless it matches the stored
    /// version exactly.
    pub expected_version: Option<i64>,
}

/// Aggregate store counts for stats and version rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    /// Non-deleted languages.
    pub languages: i64,
    /// Non-deleted keys.
    pub keys: i64,
    /// Non-deleted localizations.
    pub localizations: i64,
    /// Non-deleted, approved localizations.
    pub approved_localizations: i64,
    /// Semantic versions created.
    pub versions: i64,
}

// ---------------------------------------------------------------------------
// CatalogStore
// ---------------------------------------------------------------------------

/// The store adapter: primitive CRUD over languages, keys, localizations,
/// snapshots, versions, and the audit log.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // -- Languages -------------------------------------------------------

    /// Create a language. Fails with [`StoreError::AlreadyExists`] when the
    /// code is taken by a non-deleted row; setting `is_default` clears any
    /// previous default atomically.
    async fn create_language(&self, new: NewLanguage) -> Result<Language, StoreError>;

    /// Patch a language in place.
    async fn update_language(&self, id: Uuid, patch: LanguagePatch) -> Result<Language, StoreError>;

    /// Soft-delete a language.
    async fn delete_language(&self, id: Uuid) -> Result<Language, StoreError>;

    /// Fetch a non-deleted language by id.
    async fn get_language(&self, id: Uuid) -> Result<Language, StoreError>;

    /// Fetch a non-deleted language by code.
    async fn get_language_by_code(&self, code: &str) -> Result<Language, StoreError>;

    /// List non-deleted languages, optionally restricted to active ones.
    async fn list_languages(&self, active_only: bool) -> Result<Vec<Language>, StoreError>;

    /// The current default language, if one exists.
    async fn default_language(&self) -> Result<Option<Language>, StoreError>;

    // -- Keys ------------------------------------------------------------

    /// Create a key. Fails with [`StoreError::AlreadyExists`] when the name
    /// is taken by a non-deleted row.
    async fn create_key(&self, new: NewKey) -> Result<LocalizationKey, StoreError>;

    /// Patch a key in place.
    async fn update_key(&self, id: Uuid, patch: KeyPatch) -> Result<LocalizationKey, StoreError>;

    /// Soft-delete a key.
    async fn delete_key(&self, id: Uuid) -> Result<LocalizationKey, StoreError>;

    /// Fetch a non-deleted key by id.
    async fn get_key(&self, id: Uuid) -> Result<LocalizationKey, StoreError>;

    /// Fetch a non-deleted key by name.
    async fn get_key_by_name(&self, name: &str) -> Result<LocalizationKey, StoreError>;

    /// List non-deleted keys, optionally restricted to one category.
    async fn list_keys(&self, category: Option<&str>) -> Result<Vec<LocalizationKey>, StoreError>;

    // -- Localizations ---------------------------------------------------

    /// Create or update the `(key, language)` localization. Returns the
    /// stored row and whether it was created. The stored version is
    /// incremented by one on update, and starts at 1 on create.
    async fn upsert_localization(
        &self,
        upsert: UpsertLocalization,
    ) -> Result<(Localization, bool), StoreError>;

    /// Fetch a non-deleted localization by id.
    async fn get_localization(&self, id: Uuid) -> Result<Localization, StoreError>;

    /// Fetch the non-deleted localization for `(key, language)`.
    async fn get_localization_for(
        &self,
        key_id: Uuid,
        language_id: Uuid,
    ) -> Result<Option<Localization>, StoreError>;

    /// List non-deleted localizations, optionally filtered.
    async fn list_localizations(
        &self,
        language_id: Option<Uuid>,
        key_id: Option<Uuid>,
    ) -> Result<Vec<Localization>, StoreError>;

    /// Set `approved = true` and record the approver. Bumps the edit
    /// version (an approval is an in-place edit of the row).
    async fn approve_localization(
        &self,
        id: Uuid,
        approver: &str,
    ) -> Result<Localization, StoreError>;

    /// Soft-delete a localization.
    async fn delete_localization(&self, id: Uuid) -> Result<Localization, StoreError>;

    // -- Catalog build ---------------------------------------------------

    /// The sole source of truth for snapshot contents: the key-name →
    /// value mapping over non-deleted (and optionally approved-only)
    /// localizations of a language, in canonical key order.
    async fn build_catalog(
        &self,
        language_id: Uuid,
        category: Option<&str>,
        only_approved: bool,
    ) -> Result<BTreeMap<String, String>, StoreError>;

    // -- Snapshots -------------------------------------------------------

    /// Persist an immutable snapshot.
    async fn insert_snapshot(&self, snapshot: &CatalogSnapshot) -> Result<(), StoreError>;

    /// The newest snapshot for `(language, category)`, if any.
    async fn latest_snapshot(
        &self,
        language_id: Uuid,
        category: Option<&str>,
    ) -> Result<Option<CatalogSnapshot>, StoreError>;

    // -- Versions --------------------------------------------------------

    /// Persist a semantic version row.
    async fn insert_version(&self, version: &LocalizationVersion) -> Result<(), StoreError>;

    /// The version with the highest number, if any.
    async fn current_version(&self) -> Result<Option<LocalizationVersion>, StoreError>;

    /// Fetch a version by number.
    async fn get_version(&self, number: SemVersion) -> Result<LocalizationVersion, StoreError>;

    /// All versions, newest first.
    async fn list_versions(&self) -> Result<Vec<LocalizationVersion>, StoreError>;

    /// Delete a version row and its bound catalogs. The caller is
    /// responsible for refusing to delete the current version.
    async fn delete_version(&self, number: SemVersion) -> Result<LocalizationVersion, StoreError>;

    /// Freeze a catalog under `(version, language)`.
    async fn bind_version_catalog(
        &self,
        number: SemVersion,
        language_code: &str,
        catalog: &BTreeMap<String, String>,
        checksum: &str,
    ) -> Result<(), StoreError>;

    /// Fetch the frozen catalog for `(version, language)`.
    async fn version_catalog(
        &self,
        number: SemVersion,
        language_code: &str,
    ) -> Result<Option<(BTreeMap<String, String>, String)>, StoreError>;

    // -- Stats, audit, health -------------------------------------------

    /// Aggregate non-deleted entity counts.
    async fn counts(&self) -> Result<StoreCounts, StoreError>;

    /// Append one audit record.
    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError>;

    /// Read back audit records, newest first.
    async fn list_audit(
        &self,
        entity_type: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AuditRecord>, StoreError>;

    /// Liveness probe for `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}
