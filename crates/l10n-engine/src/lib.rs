// SPDX-License-Identifier: MIT OR Apache-2.0
//! The catalog engine: converts edits on normalized localization data into
//! consistent, versioned, content-addressed snapshots and coordinates
//! concurrent edits.
//!
//! Snapshots are eventually materialized and singleflight-protected: a
//! per-`(language, category)` freshness marker records whether the latest
//! stored snapshot still matches the store, and concurrent rebuilds for the
//! same scope collapse onto one build slot. Event publication is
//! best-effort — a failed publish never rolls back a committed write.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use chrono::Utc;
use l10n_bus::EventBus;
use l10n_cache::LayeredCache;
use l10n_core::{
    AuditRecord, CatalogEvent, CatalogSnapshot, EventKind, EventMeta, Language, Localization,
    LocalizationKey, LocalizationVersion, SemVersion, VersionBump, catalog_checksum,
    language_invalidation_pattern, versioned_cache_key,
};
use l10n_error::{CatalogError, Code};
use l10n_store::{
    CatalogStore, KeyPatch, LanguagePatch, NewKey, NewLanguage, StoreError, UpsertLocalization,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Map a store failure onto the service taxonomy.
fn store_err(err: StoreError) -> CatalogError {
    match err {
        StoreError::NotFound { entity } => CatalogError::not_found(format!("{entity} not found")),
        StoreError::AlreadyExists { entity, detail } => CatalogError::new(
            Code::AlreadyExists,
            format!("{entity} already exists: {detail}"),
        ),
        StoreError::VersionConflict { expected, stored } => {
            CatalogError::conflict("localization was modified concurrently")
                .with_context("expected", expected)
                .with_context("stored", stored)
        }
        StoreError::Validation(msg) => CatalogError::validation(msg),
        StoreError::Unavailable(msg) => CatalogError::new(Code::StoreUnavailable, msg),
        StoreError::Internal(msg) => CatalogError::internal(msg),
    }
}

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// A resolved `(key, language)` lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The requested key.
    pub key: String,
    /// The language the value came from (the default language when
    /// fallback applied).
    pub language_code: String,
    /// The localized value.
    pub value: String,
    /// Declared variable names; interpolation is the caller's job.
    pub variables: Vec<String>,
    /// Whether the serving localization is approved.
    pub approved: bool,
}

/// Payload for [`CatalogEngine::edit_localization`].
#[derive(Debug, Clone)]
pub struct EditLocalization {
    /// Dotted key name (must exist).
    pub key: String,
    /// Language code (must exist).
    pub language: String,
    /// The new value.
    pub value: String,
    /// Plural-category tag → string.
    pub plural_forms: BTreeMap<String, String>,
    /// Declared variable names.
    pub variables: Vec<String>,
    /// Approval state after the edit.
    pub approved: bool,
    /// Optimistic-lock token; mismatch fails with `CONFLICT`.
    pub expected_version: Option<i64>,
}

/// Who performed an operation, for audit records and event metadata.
#[derive(Debug, Clone)]
pub struct Actor {
    /// Username from the verified credential.
    pub username: String,
    /// Client network address.
    pub client_addr: String,
    /// Client agent string.
    pub client_agent: String,
}

impl Actor {
    fn meta(&self) -> EventMeta {
        EventMeta {
            actor_id: None,
            actor: Some(self.username.clone()),
            correlation_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Build bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BuildKey {
    language_id: Uuid,
    category: Option<String>,
}

// ---------------------------------------------------------------------------
// CatalogEngine
// ---------------------------------------------------------------------------

/// The catalog engine. Cheap to share behind an [`Arc`].
pub struct CatalogEngine {
    store: Arc<dyn CatalogStore>,
    cache: Arc<LayeredCache>,
    bus: Arc<EventBus>,
    /// Scopes whose latest stored snapshot is known to match the store.
    fresh: Mutex<HashSet<BuildKey>>,
    /// Per-scope singleflight build slots.
    slots: Mutex<HashMap<BuildKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl CatalogEngine {
    /// Wire the engine to its collaborators.
    pub fn new(store: Arc<dyn CatalogStore>, cache: Arc<LayeredCache>, bus: Arc<EventBus>) -> Self {
        Self {
            store,
            cache,
            bus,
            fresh: Mutex::new(HashSet::new()),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The store this engine persists through.
    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// The cache this engine invalidates.
    pub fn cache(&self) -> &Arc<LayeredCache> {
        &self.cache
    }

    /// The bus this engine publishes to.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    fn publish(&self, kind: EventKind, meta: Option<EventMeta>) {
        let mut event = CatalogEvent::now(kind);
        event.meta = meta;
        self.bus.publish(event);
    }

    // -- Staleness -------------------------------------------------------

    /// Flip every scope of `language_id` to stale; the next
    /// [`get_or_build_snapshot`](Self::get_or_build_snapshot) rebuilds.
    pub fn mark_language_stale(&self, language_id: Uuid) {
        self.fresh
            .lock()
            .expect("fresh set lock poisoned")
            .retain(|key| key.language_id != language_id);
    }

    /// Flip every scope to stale (bulk import).
    pub fn mark_all_stale(&self) {
        self.fresh.lock().expect("fresh set lock poisoned").clear();
    }

    fn is_fresh(&self, key: &BuildKey) -> bool {
        self.fresh
            .lock()
            .expect("fresh set lock poisoned")
            .contains(key)
    }

    fn mark_fresh(&self, key: BuildKey) {
        self.fresh
            .lock()
            .expect("fresh set lock poisoned")
            .insert(key);
    }

    fn build_slot(&self, key: &BuildKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut slots = self.slots.lock().expect("slots lock poisoned");
        Arc::clone(
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    async fn invalidate_language_cache(&self, language_code: &str) {
        let pattern = language_invalidation_pattern(language_code);
        if let Err(e) = self.cache.delete_pattern(&pattern).await {
            warn!(pattern, error = %e, "cache invalidation failed");
        }
    }

    // -- 1. GetOrBuildSnapshot ------------------------------------------

    /// Return the newest snapshot for `(language, category)` if no edits
    /// have been committed since it was stored; otherwise build, version,
    /// checksum, and persist a new one.
    ///
    /// With `include_unapproved` the build is an ephemeral preview: it is
    /// computed from the store but neither persisted nor version-advanced,
    /// so the persisted snapshot sequence always reflects approved content.
    pub async fn get_or_build_snapshot(
        &self,
        language_code: &str,
        category: Option<&str>,
        include_unapproved: bool,
    ) -> Result<CatalogSnapshot, CatalogError> {
        let language = self
            .store
            .get_language_by_code(language_code)
            .await
            .map_err(store_err)?;

        let key = BuildKey {
            language_id: language.id,
            category: category.map(str::to_string),
        };

        if include_unapproved {
            let catalog = self
                .store
                .build_catalog(language.id, category, false)
                .await
                .map_err(store_err)?;
            let version = self
                .store
                .latest_snapshot(language.id, category)
                .await
                .map_err(store_err)?
                .map(|s| s.version)
                .unwrap_or(0);
            return Ok(CatalogSnapshot {
                id: Uuid::new_v4(),
                language_id: language.id,
                language_code: language.code,
                category: key.category,
                version,
                checksum: catalog_checksum(&catalog),
                catalog,
                created_at: Utc::now(),
            });
        }

        if self.is_fresh(&key)
            && let Some(snapshot) = self
                .store
                .latest_snapshot(language.id, category)
                .await
                .map_err(store_err)?
        {
            return Ok(snapshot);
        }

        // Serialize builds for this scope; unrelated scopes proceed in
        // parallel.
        let slot = self.build_slot(&key);
        let _guard = slot.lock().await;

        // A concurrent builder may have finished while we waited.
        if self.is_fresh(&key)
            && let Some(snapshot) = self
                .store
                .latest_snapshot(language.id, category)
                .await
                .map_err(store_err)?
        {
            return Ok(snapshot);
        }

        let catalog = self
            .store
            .build_catalog(language.id, category, true)
            .await
            .map_err(store_err)?;
        let previous = self
            .store
            .latest_snapshot(language.id, category)
            .await
            .map_err(store_err)?
            .map(|s| s.version)
            .unwrap_or(0);

        let snapshot = CatalogSnapshot {
            id: Uuid::new_v4(),
            language_id: language.id,
            language_code: language.code.clone(),
            category: key.category.clone(),
            version: previous + 1,
            checksum: catalog_checksum(&catalog),
            catalog,
            created_at: Utc::now(),
        };
        self.store
            .insert_snapshot(&snapshot)
            .await
            .map_err(store_err)?;
        // The slot is held until after the snapshot is durably stored.
        self.mark_fresh(key);

        info!(
            language = %snapshot.language_code,
            version = snapshot.version,
            entries = snapshot.catalog.len(),
            "catalog snapshot rebuilt"
        );
        self.publish(
            EventKind::CatalogRebuilt {
                language_code: Some(snapshot.language_code.clone()),
                snapshot_version: snapshot.version,
                checksum: snapshot.checksum.clone(),
            },
            None,
        );

        Ok(snapshot)
    }

    // -- 2. ResolveOne ---------------------------------------------------

    /// Resolve the approved value for `(key, language)`, falling back to
    /// the default language when `fallback` is set.
    pub async fn resolve_one(
        &self,
        key_name: &str,
        language_code: &str,
        fallback: bool,
    ) -> Result<Resolved, CatalogError> {
        let key = self
            .store
            .get_key_by_name(key_name)
            .await
            .map_err(store_err)?;
        let language = self
            .store
            .get_language_by_code(language_code)
            .await
            .map_err(store_err)?;

        if let Some(resolved) = self.approved_localization(&key.name, key.id, &language).await? {
            return Ok(resolved);
        }

        if fallback {
            let default = self.store.default_language().await.map_err(store_err)?;
            if let Some(default) = default
                && default.id != language.id
                && let Some(resolved) =
                    self.approved_localization(&key.name, key.id, &default).await?
            {
                return Ok(resolved);
            }
        }

        Err(CatalogError::not_found(format!(
            "no approved localization for key {key_name:?} in {language_code:?}"
        )))
    }

    async fn approved_localization(
        &self,
        key_name: &str,
        key_id: Uuid,
        language: &Language,
    ) -> Result<Option<Resolved>, CatalogError> {
        let localization = self
            .store
            .get_localization_for(key_id, language.id)
            .await
            .map_err(store_err)?;
        Ok(localization
            .filter(|loc| loc.approved)
            .map(|loc| Resolved {
                key: key_name.to_string(),
                language_code: language.code.clone(),
                value: loc.value,
                variables: loc.variables,
                approved: loc.approved,
            }))
    }

    // -- 3. ResolveBatch -------------------------------------------------

    /// Resolve many keys at once. Missing keys are omitted from the
    /// result, not errored; input order is not preserved.
    pub async fn resolve_batch(
        &self,
        language_code: &str,
        keys: &[String],
        fallback: bool,
    ) -> Result<BTreeMap<String, String>, CatalogError> {
        let language = self
            .store
            .get_language_by_code(language_code)
            .await
            .map_err(store_err)?;

        let catalog = self
            .store
            .build_catalog(language.id, None, true)
            .await
            .map_err(store_err)?;
        let fallback_catalog = if fallback {
            match self.store.default_language().await.map_err(store_err)? {
                Some(default) if default.id != language.id => self
                    .store
                    .build_catalog(default.id, None, true)
                    .await
                    .map_err(store_err)?,
                _ => BTreeMap::new(),
            }
        } else {
            BTreeMap::new()
        };

        let mut out = BTreeMap::new();
        for key in keys {
            if let Some(value) = catalog.get(key).or_else(|| fallback_catalog.get(key)) {
                out.insert(key.clone(), value.clone());
            }
        }
        Ok(out)
    }

    // -- 4. EditLocalization --------------------------------------------

    /// Create or update a localization with optimistic concurrency, then
    /// audit, publish, and invalidate.
    pub async fn edit_localization(
        &self,
        edit: EditLocalization,
        actor: &Actor,
    ) -> Result<Localization, CatalogError> {
        let key = self
            .store
            .get_key_by_name(&edit.key)
            .await
            .map_err(store_err)?;
        let language = self
            .store
            .get_language_by_code(&edit.language)
            .await
            .map_err(store_err)?;

        let (localization, created) = self
            .store
            .upsert_localization(UpsertLocalization {
                key_id: key.id,
                language_id: language.id,
                value: edit.value,
                plural_forms: edit.plural_forms,
                variables: edit.variables,
                approved: edit.approved,
                approved_by: edit.approved.then(|| actor.username.clone()),
                expected_version: edit.expected_version,
            })
            .await
            .map_err(store_err)?;

        self.audit(
            if created { "create" } else { "update" },
            "localization",
            &localization.id.to_string(),
            actor,
            Some(serde_json::json!({
                "key": key.name,
                "language": language.code,
                "version": localization.version,
            })),
        )
        .await;

        let kind = if created {
            EventKind::LocalizationAdded {
                localization_id: localization.id,
                key_id: key.id,
                key_name: key.name.clone(),
                language_id: language.id,
                language_code: language.code.clone(),
                value: localization.value.clone(),
                approved: localization.approved,
            }
        } else {
            EventKind::LocalizationUpdated {
                localization_id: localization.id,
                key_id: key.id,
                key_name: key.name.clone(),
                language_id: language.id,
                language_code: language.code.clone(),
                value: localization.value.clone(),
                approved: localization.approved,
            }
        };
        self.publish(kind, Some(actor.meta()));

        self.mark_language_stale(language.id);
        self.invalidate_language_cache(&language.code).await;

        Ok(localization)
    }

    // -- 5. ApproveLocalization -----------------------------------------

    /// Approve a localization, recording the approver.
    pub async fn approve_localization(
        &self,
        localization_id: Uuid,
        actor: &Actor,
    ) -> Result<Localization, CatalogError> {
        let localization = self
            .store
            .approve_localization(localization_id, &actor.username)
            .await
            .map_err(store_err)?;
        let key = self
            .store
            .get_key(localization.key_id)
            .await
            .map_err(store_err)?;
        let language = self
            .store
            .get_language(localization.language_id)
            .await
            .map_err(store_err)?;

        self.audit(
            "approve",
            "localization",
            &localization.id.to_string(),
            actor,
            Some(serde_json::json!({ "key": key.name, "language": language.code })),
        )
        .await;

        self.publish(
            EventKind::LocalizationApproved {
                localization_id: localization.id,
                key_name: key.name,
                language_code: language.code.clone(),
                approver: actor.username.clone(),
            },
            Some(actor.meta()),
        );

        self.mark_language_stale(language.id);
        self.invalidate_language_cache(&language.code).await;

        Ok(localization)
    }

    /// Soft-delete a localization.
    pub async fn delete_localization(
        &self,
        localization_id: Uuid,
        actor: &Actor,
    ) -> Result<Localization, CatalogError> {
        let localization = self
            .store
            .delete_localization(localization_id)
            .await
            .map_err(store_err)?;
        let key = self
            .store
            .get_key(localization.key_id)
            .await
            .map_err(store_err)?;
        let language = self
            .store
            .get_language(localization.language_id)
            .await
            .map_err(store_err)?;

        self.audit(
            "delete",
            "localization",
            &localization.id.to_string(),
            actor,
            None,
        )
        .await;

        self.publish(
            EventKind::LocalizationDeleted {
                localization_id: localization.id,
                key_name: key.name,
                language_code: language.code.clone(),
            },
            Some(actor.meta()),
        );

        self.mark_language_stale(language.id);
        self.invalidate_language_cache(&language.code).await;

        Ok(localization)
    }

    // -- 6. AdvanceVersion ----------------------------------------------

    /// Advance the semantic catalog version, freezing a catalog for every
    /// active language under the new number before the version row is
    /// stored.
    pub async fn advance_version(
        &self,
        bump: VersionBump,
        description: Option<String>,
        metadata: BTreeMap<String, String>,
        actor: &Actor,
    ) -> Result<LocalizationVersion, CatalogError> {
        let current = self
            .store
            .current_version()
            .await
            .map_err(store_err)?
            .map(|v| v.number)
            .unwrap_or(SemVersion::ZERO);
        let next = current.bump(bump);

        // Freeze first: once the version row exists, GetCatalogByVersion
        // must be stable.
        let languages = self.store.list_languages(true).await.map_err(store_err)?;
        for language in &languages {
            let catalog = self
                .store
                .build_catalog(language.id, None, true)
                .await
                .map_err(store_err)?;
            let checksum = catalog_checksum(&catalog);
            self.store
                .bind_version_catalog(next, &language.code, &catalog, &checksum)
                .await
                .map_err(store_err)?;
        }

        let counts = self.store.counts().await.map_err(store_err)?;
        let version = LocalizationVersion {
            id: Uuid::new_v4(),
            number: next,
            version_type: bump,
            description,
            keys_count: counts.keys,
            languages_count: counts.languages,
            localizations_count: counts.localizations,
            metadata,
            created_by: actor.username.clone(),
            created_at: Utc::now(),
        };
        self.store
            .insert_version(&version)
            .await
            .map_err(store_err)?;

        self.audit(
            "create",
            "version",
            &version.number.to_string(),
            actor,
            Some(serde_json::json!({ "type": bump.as_str() })),
        )
        .await;

        info!(number = %version.number, languages = languages.len(), "catalog version created");
        self.publish(
            EventKind::VersionCreated {
                version_id: version.id,
                number: version.number.to_string(),
                description: version.description.clone(),
                keys_count: version.keys_count,
                languages_count: version.languages_count,
                localizations_count: version.localizations_count,
            },
            Some(actor.meta()),
        );

        Ok(version)
    }

    // -- 7. GetCatalogByVersion -----------------------------------------

    /// The frozen catalog bound to `(version, language)`.
    pub async fn catalog_by_version(
        &self,
        number: SemVersion,
        language_code: &str,
    ) -> Result<(BTreeMap<String, String>, String), CatalogError> {
        self.store
            .version_catalog(number, language_code)
            .await
            .map_err(store_err)?
            .ok_or_else(|| {
                CatalogError::not_found(format!(
                    "no catalog for version {number} and language {language_code:?}"
                ))
            })
    }

    // -- Version lifecycle ----------------------------------------------

    /// The current (highest) version, if any.
    pub async fn current_version(&self) -> Result<Option<LocalizationVersion>, CatalogError> {
        self.store.current_version().await.map_err(store_err)
    }

    /// All versions, newest first.
    pub async fn version_history(&self) -> Result<Vec<LocalizationVersion>, CatalogError> {
        self.store.list_versions().await.map_err(store_err)
    }

    /// Fetch one version row by number.
    pub async fn get_version(&self, number: SemVersion) -> Result<LocalizationVersion, CatalogError> {
        self.store.get_version(number).await.map_err(store_err)
    }

    /// Delete a non-current version and its frozen catalogs (including
    /// their long-TTL cache entries, which only explicit deletion may
    /// remove).
    pub async fn delete_version(
        &self,
        number: SemVersion,
        actor: &Actor,
    ) -> Result<LocalizationVersion, CatalogError> {
        if let Some(current) = self.store.current_version().await.map_err(store_err)?
            && current.number == number
        {
            return Err(CatalogError::conflict(format!(
                "version {number} is current and cannot be deleted"
            )));
        }

        let version = self
            .store
            .delete_version(number)
            .await
            .map_err(store_err)?;

        for language in self.store.list_languages(false).await.map_err(store_err)? {
            self.cache
                .delete(&versioned_cache_key(&language.code, &number))
                .await;
        }

        self.audit("delete", "version", &number.to_string(), actor, None)
            .await;
        self.publish(
            EventKind::VersionDeleted {
                version_id: version.id,
                number: number.to_string(),
            },
            Some(actor.meta()),
        );

        Ok(version)
    }

    // -- Cache control ---------------------------------------------------

    /// Invalidate the current-catalog entries of one language, or every
    /// `l10n:` entry when `language_code` is `None` (versioned entries are
    /// exempt by construction). Emits `cache.invalidated`.
    pub async fn invalidate_cache(
        &self,
        language_code: Option<&str>,
        reason: &str,
        actor: Option<&Actor>,
    ) -> Result<u64, CatalogError> {
        let removed = match language_code {
            Some(code) => {
                let language = self
                    .store
                    .get_language_by_code(code)
                    .await
                    .map_err(store_err)?;
                self.mark_language_stale(language.id);
                self.cache
                    .delete_pattern(&language_invalidation_pattern(code))
                    .await
            }
            None => {
                self.mark_all_stale();
                self.cache
                    .delete_pattern(&format!("{}*", l10n_core::CACHE_PREFIX))
                    .await
            }
        }
        .map_err(|e| CatalogError::new(Code::CacheDegraded, e.to_string()))?;

        self.publish(
            EventKind::CacheInvalidated {
                language_code: language_code.map(str::to_string),
                reason: reason.to_string(),
            },
            actor.map(Actor::meta),
        );
        Ok(removed)
    }

    // -- Language administration ----------------------------------------

    /// Create a language, audit it, and announce it.
    pub async fn create_language(
        &self,
        new: NewLanguage,
        actor: &Actor,
    ) -> Result<Language, CatalogError> {
        let language = self.store.create_language(new).await.map_err(store_err)?;
        self.audit(
            "create",
            "language",
            &language.id.to_string(),
            actor,
            Some(serde_json::json!({ "code": language.code })),
        )
        .await;
        self.publish(
            EventKind::LanguageAdded {
                language_id: language.id,
                code: language.code.clone(),
                name: language.name.clone(),
                native_name: language.native_name.clone(),
                is_rtl: language.is_rtl,
                is_active: language.is_active,
            },
            Some(actor.meta()),
        );
        Ok(language)
    }

    /// Patch a language, audit it, announce it, and invalidate its
    /// catalogs (an activity or default change alters fallback behavior).
    pub async fn update_language(
        &self,
        id: Uuid,
        patch: LanguagePatch,
        actor: &Actor,
    ) -> Result<Language, CatalogError> {
        let language = self
            .store
            .update_language(id, patch)
            .await
            .map_err(store_err)?;
        self.audit("update", "language", &language.id.to_string(), actor, None)
            .await;
        self.publish(
            EventKind::LanguageUpdated {
                language_id: language.id,
                code: language.code.clone(),
                name: language.name.clone(),
                native_name: language.native_name.clone(),
                is_rtl: language.is_rtl,
                is_active: language.is_active,
            },
            Some(actor.meta()),
        );
        self.mark_language_stale(language.id);
        self.invalidate_language_cache(&language.code).await;
        Ok(language)
    }

    /// Soft-delete a language, audit it, announce it, and invalidate its
    /// catalogs.
    pub async fn delete_language(
        &self,
        id: Uuid,
        actor: &Actor,
    ) -> Result<Language, CatalogError> {
        let language = self.store.delete_language(id).await.map_err(store_err)?;
        self.audit("delete", "language", &language.id.to_string(), actor, None)
            .await;
        self.publish(
            EventKind::LanguageDeleted {
                language_id: language.id,
                code: language.code.clone(),
            },
            Some(actor.meta()),
        );
        self.mark_language_stale(language.id);
        self.invalidate_language_cache(&language.code).await;
        Ok(language)
    }

    /// Non-deleted languages, optionally active-only.
    pub async fn list_languages(&self, active_only: bool) -> Result<Vec<Language>, CatalogError> {
        self.store
            .list_languages(active_only)
            .await
            .map_err(store_err)
    }

    // -- Key administration ----------------------------------------------

    /// Create a key, audit it, and announce it.
    pub async fn create_key(
        &self,
        new: NewKey,
        actor: &Actor,
    ) -> Result<LocalizationKey, CatalogError> {
        let key = self.store.create_key(new).await.map_err(store_err)?;
        self.audit(
            "create",
            "key",
            &key.id.to_string(),
            actor,
            Some(serde_json::json!({ "name": key.name })),
        )
        .await;
        self.publish(
            EventKind::KeyAdded {
                key_id: key.id,
                name: key.name.clone(),
                category: key.category.clone(),
                description: key.description.clone(),
            },
            Some(actor.meta()),
        );
        Ok(key)
    }

    /// Patch a key, audit it, and announce it.
    pub async fn update_key(
        &self,
        id: Uuid,
        patch: KeyPatch,
        actor: &Actor,
    ) -> Result<LocalizationKey, CatalogError> {
        let key = self.store.update_key(id, patch).await.map_err(store_err)?;
        self.audit("update", "key", &key.id.to_string(), actor, None)
            .await;
        self.publish(
            EventKind::KeyUpdated {
                key_id: key.id,
                name: key.name.clone(),
                category: key.category.clone(),
                description: key.description.clone(),
            },
            Some(actor.meta()),
        );
        Ok(key)
    }

    /// Soft-delete a key, audit it, announce it, and drop every cached
    /// catalog (the key disappears from all languages at once).
    pub async fn delete_key(
        &self,
        id: Uuid,
        actor: &Actor,
    ) -> Result<LocalizationKey, CatalogError> {
        let key = self.store.delete_key(id).await.map_err(store_err)?;
        self.audit("delete", "key", &key.id.to_string(), actor, None)
            .await;
        self.publish(
            EventKind::KeyDeleted {
                key_id: key.id,
                name: key.name.clone(),
            },
            Some(actor.meta()),
        );
        self.mark_all_stale();
        if let Err(e) = self
            .cache
            .delete_pattern(&format!("{}catalog:*", l10n_core::CACHE_PREFIX))
            .await
        {
            warn!(error = %e, "cache invalidation after key delete failed");
        }
        Ok(key)
    }

    /// Non-deleted keys, optionally restricted to one category.
    pub async fn list_keys(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<LocalizationKey>, CatalogError> {
        self.store.list_keys(category).await.map_err(store_err)
    }

    /// Non-deleted localizations, optionally filtered by language code.
    pub async fn list_localizations(
        &self,
        language_code: Option<&str>,
        key_name: Option<&str>,
    ) -> Result<Vec<Localization>, CatalogError> {
        let language_id = match language_code {
            Some(code) => Some(
                self.store
                    .get_language_by_code(code)
                    .await
                    .map_err(store_err)?
                    .id,
            ),
            None => None,
        };
        let key_id = match key_name {
            Some(name) => Some(
                self.store
                    .get_key_by_name(name)
                    .await
                    .map_err(store_err)?
                    .id,
            ),
            None => None,
        };
        self.store
            .list_localizations(language_id, key_id)
            .await
            .map_err(store_err)
    }

    // -- Point lookups ---------------------------------------------------

    /// Fetch a non-deleted localization by id.
    pub async fn get_localization(&self, id: Uuid) -> Result<Localization, CatalogError> {
        self.store.get_localization(id).await.map_err(store_err)
    }

    /// Fetch a non-deleted key by id.
    pub async fn get_key(&self, id: Uuid) -> Result<LocalizationKey, CatalogError> {
        self.store.get_key(id).await.map_err(store_err)
    }

    /// Fetch a non-deleted language by id.
    pub async fn get_language(&self, id: Uuid) -> Result<Language, CatalogError> {
        self.store.get_language(id).await.map_err(store_err)
    }

    // -- Stats and health ------------------------------------------------

    /// Aggregate store counts.
    pub async fn counts(&self) -> Result<l10n_store::StoreCounts, CatalogError> {
        self.store.counts().await.map_err(store_err)
    }

    /// Audit records, newest first.
    pub async fn audit_log(
        &self,
        entity_type: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AuditRecord>, CatalogError> {
        self.store
            .list_audit(entity_type, limit)
            .await
            .map_err(store_err)
    }

    /// Store liveness, for `/health`.
    pub async fn ping(&self) -> Result<(), CatalogError> {
        self.store.ping().await.map_err(store_err)
    }

    // -- Audit -----------------------------------------------------------

    /// Append an audit record; failures are logged, never surfaced.
    pub async fn audit(
        &self,
        operation: &str,
        entity_type: &str,
        entity_id: &str,
        actor: &Actor,
        payload: Option<serde_json::Value>,
    ) {
        let record = AuditRecord {
            id: Uuid::new_v4(),
            operation: operation.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            actor: actor.username.clone(),
            payload,
            client_addr: actor.client_addr.clone(),
            client_agent: actor.client_agent.clone(),
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.append_audit(&record).await {
            warn!(operation, entity_type, error = %e, "audit write failed");
        }
    }
}
