// SPDX-License-Identifier: MIT OR Apache-2.0
//! Admin handlers: role-gated mutations and operator tooling.
//!
//! Every mutation lands one audit record (the engine writes it) before the
//! success response is returned.

use crate::AppState;
use crate::api::{
    ApiError, BatchItemError, BatchUpsertRequest, BatchUpsertResponse, CreateKeyBody,
    CreateLanguageBody, CreateVersionBody, EditLocalizationBody, Envelope, InvalidateCacheBody,
    InvalidateCacheResponse, StatsResponse, UpdateKeyBody, UpdateLanguageBody,
    UpdateLocalizationBody,
};
use crate::handlers::{BUILD_DEADLINE, READ_DEADLINE, with_deadline};
use crate::middleware::ActorInfo;
use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::Response;
use l10n_core::{CatalogEvent, EventKind, Language, Localization, LocalizationKey, SemVersion};
use l10n_engine::EditLocalization;
use l10n_error::ErrorDto;
use l10n_exchange::{ExportDocument, ImportSummary};
use l10n_store::{KeyPatch, LanguagePatch, NewKey, NewLanguage};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Languages
// ---------------------------------------------------------------------------

/// `POST /v1/admin/languages`.
pub(crate) async fn create_language(
    State(state): State<Arc<AppState>>,
    ActorInfo(actor): ActorInfo,
    Json(body): Json<CreateLanguageBody>,
) -> Result<Json<Envelope<Language>>, ApiError> {
    let language = with_deadline(
        READ_DEADLINE,
        state.engine.create_language(
            NewLanguage {
                native_name: body.native_name.unwrap_or_else(|| body.name.clone()),
                code: body.code,
                name: body.name,
                is_rtl: body.is_rtl,
                is_active: body.is_active,
                is_default: body.is_default,
            },
            &actor,
        ),
    )
    .await?;
    Ok(Json(Envelope::ok(language)))
}

/// `PUT /v1/admin/languages/{id}`.
pub(crate) async fn update_language(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ActorInfo(actor): ActorInfo,
    Json(body): Json<UpdateLanguageBody>,
) -> Result<Json<Envelope<Language>>, ApiError> {
    let language = with_deadline(
        READ_DEADLINE,
        state.engine.update_language(
            id,
            LanguagePatch {
                name: body.name,
                native_name: body.native_name,
                is_rtl: body.is_rtl,
                is_active: body.is_active,
                is_default: body.is_default,
            },
            &actor,
        ),
    )
    .await?;
    Ok(Json(Envelope::ok(language)))
}

/// `DELETE /v1/admin/languages/{id}` — soft delete.
pub(crate) async fn delete_language(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ActorInfo(actor): ActorInfo,
) -> Result<Json<Envelope<Language>>, ApiError> {
    let language =
        with_deadline(READ_DEADLINE, state.engine.delete_language(id, &actor)).await?;
    Ok(Json(Envelope::ok(language)))
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// `POST /v1/admin/keys`.
pub(crate) async fn create_key(
    State(state): State<Arc<AppState>>,
    ActorInfo(actor): ActorInfo,
    Json(body): Json<CreateKeyBody>,
) -> Result<Json<Envelope<LocalizationKey>>, ApiError> {
    let key = with_deadline(
        READ_DEADLINE,
        state.engine.create_key(
            NewKey {
                name: body.name,
                category: body.category,
                description: body.description,
                context: body.context,
            },
            &actor,
        ),
    )
    .await?;
    Ok(Json(Envelope::ok(key)))
}

/// `PUT /v1/admin/keys/{id}`.
pub(crate) async fn update_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ActorInfo(actor): ActorInfo,
    Json(body): Json<UpdateKeyBody>,
) -> Result<Json<Envelope<LocalizationKey>>, ApiError> {
    let key = with_deadline(
        READ_DEADLINE,
        state.engine.update_key(
            id,
            KeyPatch {
                category: body.category,
                description: body.description,
                context: body.context,
            },
            &actor,
        ),
    )
    .await?;
    Ok(Json(Envelope::ok(key)))
}

/// `DELETE /v1/admin/keys/{id}` — soft delete.
pub(crate) async fn delete_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ActorInfo(actor): ActorInfo,
) -> Result<Json<Envelope<LocalizationKey>>, ApiError> {
    let key = with_deadline(READ_DEADLINE, state.engine.delete_key(id, &actor)).await?;
    Ok(Json(Envelope::ok(key)))
}

// ---------------------------------------------------------------------------
// Localizations
// ---------------------------------------------------------------------------

fn to_edit(body: EditLocalizationBody) -> EditLocalization {
    EditLocalization {
        key: body.key,
        language: body.language,
        value: body.value,
        plural_forms: body.plural_forms,
        variables: body.variables,
        approved: body.approved,
        expected_version: body.expected_version,
    }
}

/// `POST /v1/admin/localizations` — create or update by key and language.
pub(crate) async fn edit_localization(
    State(state): State<Arc<AppState>>,
    ActorInfo(actor): ActorInfo,
    Json(body): Json<EditLocalizationBody>,
) -> Result<Json<Envelope<Localization>>, ApiError> {
    let localization = with_deadline(
        READ_DEADLINE,
        state.engine.edit_localization(to_edit(body), &actor),
    )
    .await?;
    Ok(Json(Envelope::ok(localization)))
}

/// `PUT /v1/admin/localizations/{id}` — update by row id.
pub(crate) async fn update_localization(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ActorInfo(actor): ActorInfo,
    Json(body): Json<UpdateLocalizationBody>,
) -> Result<Json<Envelope<Localization>>, ApiError> {
    // Resolve the row's key and language, then reuse the engine edit path.
    let engine = &state.engine;
    let localization = with_deadline(READ_DEADLINE, async {
        let existing = engine.get_localization(id).await?;
        let key = engine.get_key(existing.key_id).await?;
        let language = engine.get_language(existing.language_id).await?;
        engine
            .edit_localization(
                EditLocalization {
                    key: key.name,
                    language: language.code,
                    value: body.value,
                    plural_forms: body.plural_forms,
                    variables: body.variables,
                    approved: body.approved,
                    expected_version: body.expected_version,
                },
                &actor,
            )
            .await
    })
    .await?;
    Ok(Json(Envelope::ok(localization)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListLocalizationsQuery {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    key: Option<String>,
}

/// `GET /v1/admin/localizations?language=&key=`.
pub(crate) async fn list_localizations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListLocalizationsQuery>,
) -> Result<Json<Envelope<Vec<Localization>>>, ApiError> {
    let localizations = with_deadline(
        READ_DEADLINE,
        state
            .engine
            .list_localizations(query.language.as_deref(), query.key.as_deref()),
    )
    .await?;
    Ok(Json(Envelope::ok(localizations)))
}

/// `POST /v1/admin/localizations/{id}/approve`.
pub(crate) async fn approve_localization(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ActorInfo(actor): ActorInfo,
) -> Result<Json<Envelope<Localization>>, ApiError> {
    let localization =
        with_deadline(READ_DEADLINE, state.engine.approve_localization(id, &actor)).await?;
    Ok(Json(Envelope::ok(localization)))
}

/// `DELETE /v1/admin/localizations/{id}` — soft delete.
pub(crate) async fn delete_localization(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ActorInfo(actor): ActorInfo,
) -> Result<Json<Envelope<Localization>>, ApiError> {
    let localization =
        with_deadline(READ_DEADLINE, state.engine.delete_localization(id, &actor)).await?;
    Ok(Json(Envelope::ok(localization)))
}

/// `POST /v1/admin/localizations/batch` — items fail independently; one
/// `batch.completed` event closes the run.
pub(crate) async fn batch_upsert(
    State(state): State<Arc<AppState>>,
    ActorInfo(actor): ActorInfo,
    Json(body): Json<BatchUpsertRequest>,
) -> Result<Json<Envelope<BatchUpsertResponse>>, ApiError> {
    let started = Instant::now();
    let mut processed = 0u64;
    let mut errors = Vec::new();

    for item in body.items {
        let label = format!("{}/{}", item.key, item.language);
        match with_deadline(
            READ_DEADLINE,
            state.engine.edit_localization(to_edit(item), &actor),
        )
        .await
        {
            Ok(_) => processed += 1,
            Err(ApiError(err)) => errors.push(BatchItemError {
                item: label,
                code: err.code,
                reason: ErrorDto::from(err).message,
            }),
        }
    }

    let response = BatchUpsertResponse {
        processed,
        failed: errors.len() as u64,
        errors,
    };
    state.engine.bus().publish(CatalogEvent::now(EventKind::BatchCompleted {
        operation: "batch_upsert".into(),
        processed: response.processed,
        failed: response.failed,
        duration_ms: started.elapsed().as_millis() as u64,
    }));

    Ok(Json(Envelope::ok(response)))
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct ImportQuery {
    #[serde(default)]
    overwrite: bool,
}

/// `POST /v1/admin/import?overwrite=` — the body is a JSON export
/// document; items fail independently.
pub(crate) async fn import(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImportQuery>,
    ActorInfo(actor): ActorInfo,
    Json(document): Json<ExportDocument>,
) -> Result<Json<Envelope<ImportSummary>>, ApiError> {
    let summary = with_deadline(BUILD_DEADLINE, async {
        state
            .exchange
            .import_document(&document, query.overwrite)
            .await
            .map_err(|e| l10n_error::CatalogError::new(l10n_error::Code::StoreUnavailable, e.to_string()))
    })
    .await?;

    state
        .engine
        .audit(
            "import",
            "catalog",
            "-",
            &actor,
            Some(serde_json::json!({
                "processed": summary.processed,
                "failed": summary.failed(),
                "overwrite": query.overwrite,
            })),
        )
        .await;

    // Bulk import is the one operation that flushes the whole keyspace.
    let _ = state
        .engine
        .invalidate_cache(None, "bulk import", Some(&actor))
        .await;

    state.engine.bus().publish(CatalogEvent::now(EventKind::BatchCompleted {
        operation: "import".into(),
        processed: summary.processed,
        failed: summary.failed(),
        duration_ms: summary.duration_ms,
    }));

    Ok(Json(Envelope::ok(summary)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportQuery {
    #[serde(default)]
    format: Option<String>,
}

/// `GET /v1/admin/export?format=json|csv|xliff`.
pub(crate) async fn export(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
    ActorInfo(actor): ActorInfo,
) -> Result<Response, ApiError> {
    let format = query.format.as_deref().unwrap_or("json");
    let exchange = &state.exchange;

    let (bytes, content_type) = match format {
        "json" => {
            let document = with_deadline(BUILD_DEADLINE, async {
                exchange
                    .export_document()
                    .await
                    .map_err(|e| l10n_error::CatalogError::internal(e.to_string()))
            })
            .await?;
            let bytes = serde_json::to_vec_pretty(&document)
                .map_err(|e| ApiError::from(l10n_error::CatalogError::internal(e.to_string())))?;
            (bytes, "application/json")
        }
        "csv" => {
            let bytes = with_deadline(BUILD_DEADLINE, async {
                exchange
                    .export_csv()
                    .await
                    .map_err(|e| l10n_error::CatalogError::internal(e.to_string()))
            })
            .await?;
            (bytes, "text/csv")
        }
        "xliff" => {
            let bytes = with_deadline(BUILD_DEADLINE, async {
                exchange
                    .export_xliff()
                    .await
                    .map_err(|e| l10n_error::CatalogError::internal(e.to_string()))
            })
            .await?;
            (bytes, "application/xliff+xml")
        }
        other => {
            return Err(ApiError::validation(format!(
                "unknown export format {other:?} (expected json, csv, or xliff)"
            )));
        }
    };

    state
        .engine
        .audit("export", "catalog", "-", &actor, Some(serde_json::json!({ "format": format })))
        .await;

    Ok(Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(bytes))
        .expect("static response parts are valid"))
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// `POST /v1/admin/version/create`.
pub(crate) async fn create_version(
    State(state): State<Arc<AppState>>,
    ActorInfo(actor): ActorInfo,
    Json(body): Json<CreateVersionBody>,
) -> Result<Json<Envelope<l10n_core::LocalizationVersion>>, ApiError> {
    let bump = body
        .version_type
        .parse()
        .map_err(|_| ApiError::validation(format!(
            "invalid version_type {:?} (expected major, minor, or patch)",
            body.version_type
        )))?;

    let version = with_deadline(
        BUILD_DEADLINE,
        state
            .engine
            .advance_version(bump, body.description, body.metadata, &actor),
    )
    .await?;
    Ok(Json(Envelope::ok(version)))
}

/// `DELETE /v1/admin/version/{version}` — conflicts on the current
/// version.
pub(crate) async fn delete_version(
    State(state): State<Arc<AppState>>,
    Path(version): Path<String>,
    ActorInfo(actor): ActorInfo,
) -> Result<Json<Envelope<l10n_core::LocalizationVersion>>, ApiError> {
    let number: SemVersion = version
        .parse()
        .map_err(|_| ApiError::validation(format!("invalid version number {version:?}")))?;
    let deleted =
        with_deadline(READ_DEADLINE, state.engine.delete_version(number, &actor)).await?;
    Ok(Json(Envelope::ok(deleted)))
}

// ---------------------------------------------------------------------------
// Cache, stats, audit
// ---------------------------------------------------------------------------

/// `POST /v1/admin/cache/invalidate`.
pub(crate) async fn invalidate_cache(
    State(state): State<Arc<AppState>>,
    ActorInfo(actor): ActorInfo,
    Json(body): Json<InvalidateCacheBody>,
) -> Result<Json<Envelope<InvalidateCacheResponse>>, ApiError> {
    let removed = with_deadline(
        READ_DEADLINE,
        state
            .engine
            .invalidate_cache(body.language.as_deref(), "manual", Some(&actor)),
    )
    .await?;

    state
        .engine
        .audit(
            "invalidate",
            "cache",
            body.language.as_deref().unwrap_or("*"),
            &actor,
            None,
        )
        .await;

    Ok(Json(Envelope::ok(InvalidateCacheResponse { removed })))
}

/// `GET /v1/admin/stats` — real counts, not placeholders.
pub(crate) async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Envelope<StatsResponse>>, ApiError> {
    let counts = with_deadline(READ_DEADLINE, state.engine.counts()).await?;
    let bus = state.engine.bus().stats();
    Ok(Json(Envelope::ok(StatsResponse {
        languages: counts.languages,
        keys: counts.keys,
        localizations: counts.localizations,
        approved_localizations: counts.approved_localizations,
        versions: counts.versions,
        events_published: bus.total_published,
        events_dropped: bus.dropped_events,
        subscribers: state.subscriptions.subscriber_count(),
        cache_degraded: state.engine.cache().is_degraded(),
    })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuditQuery {
    #[serde(default)]
    entity_type: Option<String>,
    #[serde(default = "default_audit_limit")]
    limit: i64,
}

fn default_audit_limit() -> i64 {
    100
}

/// `GET /v1/admin/audit?entity_type=&limit=`.
pub(crate) async fn audit_log(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Envelope<Vec<l10n_core::AuditRecord>>>, ApiError> {
    let records = with_deadline(
        READ_DEADLINE,
        state
            .engine
            .audit_log(query.entity_type.as_deref(), query.limit.clamp(1, 1_000)),
    )
    .await?;
    Ok(Json(Envelope::ok(records)))
}
