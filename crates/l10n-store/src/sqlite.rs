// SPDX-License-Identifier: MIT OR Apache-2.0
//! SQLite implementation of the [`CatalogStore`].

use crate::{
    CatalogStore, KeyPatch, LanguagePatch, NewKey, NewLanguage, StoreCounts, StoreError,
    UpsertLocalization,
};
use async_trait::async_trait;
use chrono::Utc;
use l10n_core::{
    AuditRecord, CatalogSnapshot, Language, Localization, LocalizationKey, LocalizationVersion,
    SemVersion, VersionBump,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

/// Schema applied idempotently at startup.
///
/// Partial unique indexes enforce the non-deleted uniqueness invariants
/// (language code, key name, `(key, language)` pair, single default) so
/// that the application-level checks have a durable backstop.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS languages (
  id TEXT PRIMARY KEY,
  code TEXT NOT NULL,
  name TEXT NOT NULL,
  native_name TEXT NOT NULL,
  is_rtl INTEGER NOT NULL DEFAULT 0,
  is_active INTEGER NOT NULL DEFAULT 1,
  is_default INTEGER NOT NULL DEFAULT 0,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL,
  deleted INTEGER NOT NULL DEFAULT 0
);
CREATE UNIQUE INDEX IF NOT EXISTS languages_code_live
  ON languages(code) WHERE deleted = 0;
CREATE UNIQUE INDEX IF NOT EXISTS languages_single_default
  ON languages(is_default) WHERE deleted = 0 AND is_default = 1;

CREATE TABLE IF NOT EXISTS keys (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  category TEXT,
  description TEXT,
  context TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL,
  deleted INTEGER NOT NULL DEFAULT 0
);
CREATE UNIQUE INDEX IF NOT EXISTS keys_name_live
  ON keys(name) WHERE deleted = 0;

CREATE TABLE IF NOT EXISTS localizations (
  id TEXT PRIMARY KEY,
  key_id TEXT NOT NULL REFERENCES keys(id),
  language_id TEXT NOT NULL REFERENCES languages(id),
  value TEXT NOT NULL,
  plural_forms TEXT NOT NULL DEFAULT '{}',
  variables TEXT NOT NULL DEFAULT '[]',
  approved INTEGER NOT NULL DEFAULT 0,
  approved_by TEXT,
  version INTEGER NOT NULL DEFAULT 1,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL,
  deleted INTEGER NOT NULL DEFAULT 0
);
CREATE UNIQUE INDEX IF NOT EXISTS localizations_pair_live
  ON localizations(key_id, language_id) WHERE deleted = 0;
CREATE INDEX IF NOT EXISTS localizations_by_language
  ON localizations(language_id) WHERE deleted = 0;

CREATE TABLE IF NOT EXISTS snapshots (
  id TEXT PRIMARY KEY,
  language_id TEXT NOT NULL REFERENCES languages(id),
  language_code TEXT NOT NULL,
  category TEXT,
  version INTEGER NOT NULL,
  catalog TEXT NOT NULL,
  checksum TEXT NOT NULL,
  created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS snapshots_version_per_scope
  ON snapshots(language_id, ifnull(category, '-'), version);

CREATE TABLE IF NOT EXISTS versions (
  id TEXT PRIMARY KEY,
  number TEXT NOT NULL UNIQUE,
  major INTEGER NOT NULL,
  minor INTEGER NOT NULL,
  patch INTEGER NOT NULL,
  version_type TEXT NOT NULL,
  description TEXT,
  keys_count INTEGER NOT NULL,
  languages_count INTEGER NOT NULL,
  localizations_count INTEGER NOT NULL,
  metadata TEXT NOT NULL DEFAULT '{}',
  created_by TEXT NOT NULL,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS version_catalogs (
  version_number TEXT NOT NULL,
  language_code TEXT NOT NULL,
  catalog TEXT NOT NULL,
  checksum TEXT NOT NULL,
  created_at TEXT NOT NULL,
  PRIMARY KEY (version_number, language_code)
);

CREATE TABLE IF NOT EXISTS audit_log (
  id TEXT PRIMARY KEY,
  operation TEXT NOT NULL,
  entity_type TEXT NOT NULL,
  entity_id TEXT NOT NULL,
  actor TEXT NOT NULL,
  payload TEXT,
  client_addr TEXT NOT NULL,
  client_agent TEXT NOT NULL,
  created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS audit_by_entity
  ON audit_log(entity_type, created_at);
"#;

/// SQLite-backed [`CatalogStore`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and apply the
    /// schema.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Validation(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|e| StoreError::Internal(format!("corrupt uuid {s:?}: {e}")))
}

fn from_json<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, StoreError> {
    serde_json::from_str(s).map_err(|e| StoreError::Internal(format!("corrupt json column: {e}")))
}

fn to_json<T: serde::Serialize>(v: &T) -> Result<String, StoreError> {
    serde_json::to_string(v).map_err(|e| StoreError::Internal(e.to_string()))
}

fn language_from_row(row: &SqliteRow) -> Result<Language, StoreError> {
    Ok(Language {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        native_name: row.try_get("native_name")?,
        is_rtl: row.try_get("is_rtl")?,
        is_active: row.try_get("is_active")?,
        is_default: row.try_get("is_default")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted: row.try_get("deleted")?,
    })
}

fn key_from_row(row: &SqliteRow) -> Result<LocalizationKey, StoreError> {
    Ok(LocalizationKey {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        context: row.try_get("context")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted: row.try_get("deleted")?,
    })
}

fn localization_from_row(row: &SqliteRow) -> Result<Localization, StoreError> {
    Ok(Localization {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        key_id: parse_uuid(&row.try_get::<String, _>("key_id")?)?,
        language_id: parse_uuid(&row.try_get::<String, _>("language_id")?)?,
        value: row.try_get("value")?,
        plural_forms: from_json(&row.try_get::<String, _>("plural_forms")?)?,
        variables: from_json(&row.try_get::<String, _>("variables")?)?,
        approved: row.try_get("approved")?,
        approved_by: row.try_get("approved_by")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted: row.try_get("deleted")?,
    })
}

fn snapshot_from_row(row: &SqliteRow) -> Result<CatalogSnapshot, StoreError> {
    Ok(CatalogSnapshot {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        language_id: parse_uuid(&row.try_get::<String, _>("language_id")?)?,
        language_code: row.try_get("language_code")?,
        category: row.try_get("category")?,
        version: row.try_get("version")?,
        catalog: from_json(&row.try_get::<String, _>("catalog")?)?,
        checksum: row.try_get("checksum")?,
        created_at: row.try_get("created_at")?,
    })
}

fn version_from_row(row: &SqliteRow) -> Result<LocalizationVersion, StoreError> {
    let number: String = row.try_get("number")?;
    let version_type: String = row.try_get("version_type")?;
    Ok(LocalizationVersion {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        number: number
            .parse::<SemVersion>()
            .map_err(|e| StoreError::Internal(e.to_string()))?,
        version_type: version_type
            .parse::<VersionBump>()
            .map_err(|e| StoreError::Internal(e.to_string()))?,
        description: row.try_get("description")?,
        keys_count: row.try_get("keys_count")?,
        languages_count: row.try_get("languages_count")?,
        localizations_count: row.try_get("localizations_count")?,
        metadata: from_json(&row.try_get::<String, _>("metadata")?)?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
    })
}

fn audit_from_row(row: &SqliteRow) -> Result<AuditRecord, StoreError> {
    let payload: Option<String> = row.try_get("payload")?;
    Ok(AuditRecord {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        operation: row.try_get("operation")?,
        entity_type: row.try_get("entity_type")?,
        entity_id: row.try_get("entity_id")?,
        actor: row.try_get("actor")?,
        payload: payload.as_deref().map(from_json).transpose()?,
        client_addr: row.try_get("client_addr")?,
        client_agent: row.try_get("client_agent")?,
        created_at: row.try_get("created_at")?,
    })
}

// ---------------------------------------------------------------------------
// CatalogStore impl
// ---------------------------------------------------------------------------

#[async_trait]
impl CatalogStore for SqliteStore {
    // -- Languages -------------------------------------------------------

    async fn create_language(&self, new: NewLanguage) -> Result<Language, StoreError> {
        if new.code.trim().is_empty() {
            return Err(StoreError::Validation("language code must not be empty".into()));
        }
        if new.name.trim().is_empty() {
            return Err(StoreError::Validation("language name must not be empty".into()));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let taken: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM languages WHERE code = ?1 AND deleted = 0")
                .bind(&new.code)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(StoreError::AlreadyExists {
                entity: "language",
                detail: new.code,
            });
        }

        if new.is_default {
            sqlx::query(
                "UPDATE languages SET is_default = 0, updated_at = ?1 \
                 WHERE is_default = 1 AND deleted = 0",
            )
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let language = Language {
            id: Uuid::new_v4(),
            code: new.code,
            name: new.name,
            native_name: new.native_name,
            is_rtl: new.is_rtl,
            is_active: new.is_active,
            is_default: new.is_default,
            created_at: now,
            updated_at: now,
            deleted: false,
        };

        sqlx::query(
            "INSERT INTO languages \
             (id, code, name, native_name, is_rtl, is_active, is_default, created_at, updated_at, deleted) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
        )
        .bind(language.id.to_string())
        .bind(&language.code)
        .bind(&language.name)
        .bind(&language.native_name)
        .bind(language.is_rtl)
        .bind(language.is_active)
        .bind(language.is_default)
        .bind(language.created_at)
        .bind(language.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(language)
    }

    async fn update_language(
        &self,
        id: Uuid,
        patch: LanguagePatch,
    ) -> Result<Language, StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM languages WHERE id = ?1 AND deleted = 0")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound { entity: "language" })?;
        let mut language = language_from_row(&row)?;

        if let Some(name) = patch.name {
            language.name = name;
        }
        if let Some(native_name) = patch.native_name {
            language.native_name = native_name;
        }
        if let Some(is_rtl) = patch.is_rtl {
            language.is_rtl = is_rtl;
        }
        if let Some(is_active) = patch.is_active {
            language.is_active = is_active;
        }
        if let Some(is_default) = patch.is_default {
            if is_default && !language.is_default {
                sqlx::query(
                    "UPDATE languages SET is_default = 0, updated_at = ?1 \
                     WHERE is_default = 1 AND deleted = 0",
                )
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            language.is_default = is_default;
        }
        language.updated_at = now;

        sqlx::query(
            "UPDATE languages SET name = ?1, native_name = ?2, is_rtl = ?3, is_active = ?4, \
             is_default = ?5, updated_at = ?6 WHERE id = ?7",
        )
        .bind(&language.name)
        .bind(&language.native_name)
        .bind(language.is_rtl)
        .bind(language.is_active)
        .bind(language.is_default)
        .bind(language.updated_at)
        .bind(language.id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(language)
    }

    async fn delete_language(&self, id: Uuid) -> Result<Language, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE languages SET deleted = 1, is_default = 0, updated_at = ?1 \
             WHERE id = ?2 AND deleted = 0",
        )
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "language" });
        }
        let row = sqlx::query("SELECT * FROM languages WHERE id = ?1")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;
        language_from_row(&row)
    }

    async fn get_language(&self, id: Uuid) -> Result<Language, StoreError> {
        let row = sqlx::query("SELECT * FROM languages WHERE id = ?1 AND deleted = 0")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { entity: "language" })?;
        language_from_row(&row)
    }

    async fn get_language_by_code(&self, code: &str) -> Result<Language, StoreError> {
        let row = sqlx::query("SELECT * FROM languages WHERE code = ?1 AND deleted = 0")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { entity: "language" })?;
        language_from_row(&row)
    }

    async fn list_languages(&self, active_only: bool) -> Result<Vec<Language>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM languages WHERE deleted = 0 AND (?1 = 0 OR is_active = 1) \
             ORDER BY code",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(language_from_row).collect()
    }

    async fn default_language(&self) -> Result<Option<Language>, StoreError> {
        let row = sqlx::query("SELECT * FROM languages WHERE is_default = 1 AND deleted = 0")
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(language_from_row).transpose()
    }

    // -- Keys ------------------------------------------------------------

    async fn create_key(&self, new: NewKey) -> Result<LocalizationKey, StoreError> {
        if new.name.trim().is_empty() {
            return Err(StoreError::Validation("key name must not be empty".into()));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let taken: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM keys WHERE name = ?1 AND deleted = 0")
                .bind(&new.name)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(StoreError::AlreadyExists {
                entity: "key",
                detail: new.name,
            });
        }

        let key = LocalizationKey {
            id: Uuid::new_v4(),
            name: new.name,
            category: new.category,
            description: new.description,
            context: new.context,
            created_at: now,
            updated_at: now,
            deleted: false,
        };

        sqlx::query(
            "INSERT INTO keys (id, name, category, description, context, created_at, updated_at, deleted) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
        )
        .bind(key.id.to_string())
        .bind(&key.name)
        .bind(&key.category)
        .bind(&key.description)
        .bind(&key.context)
        .bind(key.created_at)
        .bind(key.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(key)
    }

    async fn update_key(&self, id: Uuid, patch: KeyPatch) -> Result<LocalizationKey, StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM keys WHERE id = ?1 AND deleted = 0")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound { entity: "key" })?;
        let mut key = key_from_row(&row)?;

        if let Some(category) = patch.category {
            key.category = category;
        }
        if let Some(description) = patch.description {
            key.description = description;
        }
        if let Some(context) = patch.context {
            key.context = context;
        }
        key.updated_at = now;

        sqlx::query(
            "UPDATE keys SET category = ?1, description = ?2, context = ?3, updated_at = ?4 \
             WHERE id = ?5",
        )
        .bind(&key.category)
        .bind(&key.description)
        .bind(&key.context)
        .bind(key.updated_at)
        .bind(key.id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(key)
    }

    async fn delete_key(&self, id: Uuid) -> Result<LocalizationKey, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE keys SET deleted = 1, updated_at = ?1 WHERE id = ?2 AND deleted = 0",
        )
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "key" });
        }
        let row = sqlx::query("SELECT * FROM keys WHERE id = ?1")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;
        key_from_row(&row)
    }

    async fn get_key(&self, id: Uuid) -> Result<LocalizationKey, StoreError> {
        let row = sqlx::query("SELECT * FROM keys WHERE id = ?1 AND deleted = 0")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { entity: "key" })?;
        key_from_row(&row)
    }

    async fn get_key_by_name(&self, name: &str) -> Result<LocalizationKey, StoreError> {
        let row = sqlx::query("SELECT * FROM keys WHERE name = ?1 AND deleted = 0")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { entity: "key" })?;
        key_from_row(&row)
    }

    async fn list_keys(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<LocalizationKey>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM keys WHERE deleted = 0 AND (?1 IS NULL OR category = ?1) \
             ORDER BY name",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(key_from_row).collect()
    }

    // -- Localizations ---------------------------------------------------

    async fn upsert_localization(
        &self,
        upsert: UpsertLocalization,
    ) -> Result<(Localization, bool), StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(
            "SELECT * FROM localizations WHERE key_id = ?1 AND language_id = ?2 AND deleted = 0",
        )
        .bind(upsert.key_id.to_string())
        .bind(upsert.language_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            Some(row) => {
                let mut localization = localization_from_row(&row)?;
                if let Some(expected) = upsert.expected_version
                    && expected != localization.version
                {
                    return Err(StoreError::VersionConflict {
                        expected,
                        stored: localization.version,
                    });
                }

                localization.value = upsert.value;
                localization.plural_forms = upsert.plural_forms;
                localization.variables = upsert.variables;
                localization.approved = upsert.approved;
                localization.approved_by = if upsert.approved {
                    upsert.approved_by
                } else {
                    None
                };
                localization.updated_at = now;

                // The WHERE version guard makes concurrent lost updates
                // surface as a conflict even without expected_version.
                let result = sqlx::query(
                    "UPDATE localizations SET value = ?1, plural_forms = ?2, variables = ?3, \
                     approved = ?4, approved_by = ?5, version = version + 1, updated_at = ?6 \
                     WHERE id = ?7 AND version = ?8",
                )
                .bind(&localization.value)
                .bind(to_json(&localization.plural_forms)?)
                .bind(to_json(&localization.variables)?)
                .bind(localization.approved)
                .bind(&localization.approved_by)
                .bind(localization.updated_at)
                .bind(localization.id.to_string())
                .bind(localization.version)
                .execute(&mut *tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::VersionConflict {
                        expected: localization.version,
                        stored: localization.version + 1,
                    });
                }
                localization.version += 1;

                tx.commit().await?;
                Ok((localization, false))
            }
            None => {
                if let Some(expected) = upsert.expected_version {
                    // The caller edited against a row that no longer exists.
                    return Err(StoreError::VersionConflict { expected, stored: 0 });
                }

                let key_live: Option<(i64,)> =
                    sqlx::query_as("SELECT 1 FROM keys WHERE id = ?1 AND deleted = 0")
                        .bind(upsert.key_id.to_string())
                        .fetch_optional(&mut *tx)
                        .await?;
                if key_live.is_none() {
                    return Err(StoreError::NotFound { entity: "key" });
                }
                let language_live: Option<(i64,)> =
                    sqlx::query_as("SELECT 1 FROM languages WHERE id = ?1 AND deleted = 0")
                        .bind(upsert.language_id.to_string())
                        .fetch_optional(&mut *tx)
                        .await?;
                if language_live.is_none() {
                    return Err(StoreError::NotFound { entity: "language" });
                }

                let localization = Localization {
                    id: Uuid::new_v4(),
                    key_id: upsert.key_id,
                    language_id: upsert.language_id,
                    value: upsert.value,
                    plural_forms: upsert.plural_forms,
                    variables: upsert.variables,
                    approved: upsert.approved,
                    approved_by: if upsert.approved {
                        upsert.approved_by
                    } else {
                        None
                    },
                    version: 1,
                    created_at: now,
                    updated_at: now,
                    deleted: false,
                };

                sqlx::query(
                    "INSERT INTO localizations \
                     (id, key_id, language_id, value, plural_forms, variables, approved, \
                      approved_by, version, created_at, updated_at, deleted) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?10, 0)",
                )
                .bind(localization.id.to_string())
                .bind(localization.key_id.to_string())
                .bind(localization.language_id.to_string())
                .bind(&localization.value)
                .bind(to_json(&localization.plural_forms)?)
                .bind(to_json(&localization.variables)?)
                .bind(localization.approved)
                .bind(&localization.approved_by)
                .bind(localization.created_at)
                .bind(localization.updated_at)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;
                Ok((localization, true))
            }
        }
    }

    async fn get_localization(&self, id: Uuid) -> Result<Localization, StoreError> {
        let row = sqlx::query("SELECT * FROM localizations WHERE id = ?1 AND deleted = 0")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { entity: "localization" })?;
        localization_from_row(&row)
    }

    async fn get_localization_for(
        &self,
        key_id: Uuid,
        language_id: Uuid,
    ) -> Result<Option<Localization>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM localizations WHERE key_id = ?1 AND language_id = ?2 AND deleted = 0",
        )
        .bind(key_id.to_string())
        .bind(language_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(localization_from_row).transpose()
    }

    async fn list_localizations(
        &self,
        language_id: Option<Uuid>,
        key_id: Option<Uuid>,
    ) -> Result<Vec<Localization>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM localizations WHERE deleted = 0 \
             AND (?1 IS NULL OR language_id = ?1) \
             AND (?2 IS NULL OR key_id = ?2) \
             ORDER BY updated_at DESC",
        )
        .bind(language_id.map(|id| id.to_string()))
        .bind(key_id.map(|id| id.to_string()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(localization_from_row).collect()
    }

    async fn approve_localization(
        &self,
        id: Uuid,
        approver: &str,
    ) -> Result<Localization, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE localizations SET approved = 1, approved_by = ?1, version = version + 1, \
             updated_at = ?2 WHERE id = ?3 AND deleted = 0",
        )
        .bind(approver)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "localization" });
        }
        self.get_localization(id).await
    }

    async fn delete_localization(&self, id: Uuid) -> Result<Localization, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE localizations SET deleted = 1, updated_at = ?1 WHERE id = ?2 AND deleted = 0",
        )
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "localization" });
        }
        let row = sqlx::query("SELECT * FROM localizations WHERE id = ?1")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;
        localization_from_row(&row)
    }

    // -- Catalog build ---------------------------------------------------

    async fn build_catalog(
        &self,
        language_id: Uuid,
        category: Option<&str>,
        only_approved: bool,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        let rows = sqlx::query(
            "SELECT k.name AS key_name, l.value AS value \
             FROM localizations l \
             JOIN keys k ON k.id = l.key_id AND k.deleted = 0 \
             WHERE l.language_id = ?1 AND l.deleted = 0 \
               AND (?2 IS NULL OR k.category = ?2) \
               AND (?3 = 0 OR l.approved = 1) \
             ORDER BY k.name",
        )
        .bind(language_id.to_string())
        .bind(category)
        .bind(only_approved)
        .fetch_all(&self.pool)
        .await?;

        let mut catalog = BTreeMap::new();
        for row in &rows {
            catalog.insert(
                row.try_get::<String, _>("key_name")?,
                row.try_get::<String, _>("value")?,
            );
        }
        Ok(catalog)
    }

    // -- Snapshots -------------------------------------------------------

    async fn insert_snapshot(&self, snapshot: &CatalogSnapshot) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO snapshots \
             (id, language_id, language_code, category, version, catalog, checksum, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(snapshot.id.to_string())
        .bind(snapshot.language_id.to_string())
        .bind(&snapshot.language_code)
        .bind(&snapshot.category)
        .bind(snapshot.version)
        .bind(to_json(&snapshot.catalog)?)
        .bind(&snapshot.checksum)
        .bind(snapshot.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_snapshot(
        &self,
        language_id: Uuid,
        category: Option<&str>,
    ) -> Result<Option<CatalogSnapshot>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM snapshots WHERE language_id = ?1 AND category IS ?2 \
             ORDER BY version DESC LIMIT 1",
        )
        .bind(language_id.to_string())
        .bind(category)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(snapshot_from_row).transpose()
    }

    // -- Versions --------------------------------------------------------

    async fn insert_version(&self, version: &LocalizationVersion) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO versions \
             (id, number, major, minor, patch, version_type, description, keys_count, \
              languages_count, localizations_count, metadata, created_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(version.id.to_string())
        .bind(version.number.to_string())
        .bind(version.number.major as i64)
        .bind(version.number.minor as i64)
        .bind(version.number.patch as i64)
        .bind(version.version_type.as_str())
        .bind(&version.description)
        .bind(version.keys_count)
        .bind(version.languages_count)
        .bind(version.localizations_count)
        .bind(to_json(&version.metadata)?)
        .bind(&version.created_by)
        .bind(version.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.message().contains("UNIQUE") => {
                StoreError::AlreadyExists {
                    entity: "version",
                    detail: version.number.to_string(),
                }
            }
            other => other.into(),
        })?;
        Ok(())
    }

    async fn current_version(&self) -> Result<Option<LocalizationVersion>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM versions ORDER BY major DESC, minor DESC, patch DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(version_from_row).transpose()
    }

    async fn get_version(&self, number: SemVersion) -> Result<LocalizationVersion, StoreError> {
        let row = sqlx::query("SELECT * FROM versions WHERE number = ?1")
            .bind(number.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { entity: "version" })?;
        version_from_row(&row)
    }

    async fn list_versions(&self) -> Result<Vec<LocalizationVersion>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM versions ORDER BY major DESC, minor DESC, patch DESC")
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(version_from_row).collect()
    }

    async fn delete_version(
        &self,
        number: SemVersion,
    ) -> Result<LocalizationVersion, StoreError> {
        let version = self.get_version(number).await?;
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM versions WHERE number = ?1")
            .bind(number.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM version_catalogs WHERE version_number = ?1")
            .bind(number.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(version)
    }

    async fn bind_version_catalog(
        &self,
        number: SemVersion,
        language_code: &str,
        catalog: &BTreeMap<String, String>,
        checksum: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO version_catalogs \
             (version_number, language_code, catalog, checksum, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(number.to_string())
        .bind(language_code)
        .bind(to_json(catalog)?)
        .bind(checksum)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn version_catalog(
        &self,
        number: SemVersion,
        language_code: &str,
    ) -> Result<Option<(BTreeMap<String, String>, String)>, StoreError> {
        let row = sqlx::query(
            "SELECT catalog, checksum FROM version_catalogs \
             WHERE version_number = ?1 AND language_code = ?2",
        )
        .bind(number.to_string())
        .bind(language_code)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => {
                let catalog = from_json(&row.try_get::<String, _>("catalog")?)?;
                let checksum: String = row.try_get("checksum")?;
                Ok(Some((catalog, checksum)))
            }
            None => Ok(None),
        }
    }

    // -- Stats, audit, health -------------------------------------------

    async fn counts(&self) -> Result<StoreCounts, StoreError> {
        let (languages, keys, localizations, approved, versions): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT \
                 (SELECT COUNT(*) FROM languages WHERE deleted = 0), \
                 (SELECT COUNT(*) FROM keys WHERE deleted = 0), \
                 (SELECT COUNT(*) FROM localizations WHERE deleted = 0), \
                 (SELECT COUNT(*) FROM localizations WHERE deleted = 0 AND approved = 1), \
                 (SELECT COUNT(*) FROM versions)",
            )
            .fetch_one(&self.pool)
            .await?;
        Ok(StoreCounts {
            languages,
            keys,
            localizations,
            approved_localizations: approved,
            versions,
        })
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO audit_log \
             (id, operation, entity_type, entity_id, actor, payload, client_addr, client_agent, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(record.id.to_string())
        .bind(&record.operation)
        .bind(&record.entity_type)
        .bind(&record.entity_id)
        .bind(&record.actor)
        .bind(record.payload.as_ref().map(to_json).transpose()?)
        .bind(&record.client_addr)
        .bind(&record.client_agent)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_audit(
        &self,
        entity_type: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM audit_log WHERE (?1 IS NULL OR entity_type = ?1) \
             ORDER BY created_at DESC LIMIT ?2",
        )
        .bind(entity_type)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(audit_from_row).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
