// SPDX-License-Identifier: MIT OR Apache-2.0
//! Public and read-path handlers.

use crate::AppState;
use crate::api::{
    ApiError, BatchLocalizeRequest, BatchLocalizeResponse, CatalogResponse, Envelope,
    HealthChecks, HealthResponse, KeysResponse, LanguagesResponse, LocalizeQuery,
    LocalizeResponse, VersionHistoryResponse, VersionedCatalogResponse,
};
use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use l10n_core::{SemVersion, catalog_cache_key, versioned_cache_key};
use l10n_error::{CatalogError, Code};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Deadline for point reads.
pub(crate) const READ_DEADLINE: Duration = Duration::from_secs(5);
/// Deadline for catalog builds and imports.
pub(crate) const BUILD_DEADLINE: Duration = Duration::from_secs(10);

/// Run `fut` under a deadline, mapping expiry onto the `CANCELLED` code.
///
/// Store transactions are atomic, so an expired operation leaves no torn
/// writes; engine freshness markers stay stale so the next build retries.
pub(crate) async fn with_deadline<T>(
    deadline: Duration,
    fut: impl Future<Output = Result<T, CatalogError>>,
) -> Result<T, ApiError> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => Err(ApiError::from(CatalogError::new(
            Code::Cancelled,
            "request deadline exceeded",
        ))),
    }
}

/// Respond with pre-serialized envelope bytes (the cache stores responses
/// in their canonical JSON form).
pub(crate) fn json_bytes(bytes: Vec<u8>) -> Response {
    Response::builder()
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("static response parts are valid")
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// `GET /health` — 200 when the store answers, 503 otherwise.
pub(crate) async fn health(State(state): State<Arc<AppState>>) -> Response {
    let database_ok = state.engine.ping().await.is_ok();
    let cache = if !state.engine.cache().has_shared_tier() {
        "disabled"
    } else if state.engine.cache().is_degraded() {
        "degraded"
    } else {
        "ok"
    };

    let body = HealthResponse {
        status: if database_ok { "ok" } else { "unavailable" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            database: if database_ok { "ok" } else { "unavailable" }.to_string(),
            cache: cache.to_string(),
        },
    };
    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct CatalogQuery {
    #[serde(default)]
    category: Option<String>,
}

/// `GET /v1/catalog/{language}?category=` — current catalog, short-TTL
/// cached, singleflight-filled.
pub(crate) async fn get_catalog(
    State(state): State<Arc<AppState>>,
    Path(language): Path<String>,
    Query(query): Query<CatalogQuery>,
) -> Result<Response, ApiError> {
    let category = query.category.filter(|c| !c.is_empty());
    let cache_key = catalog_cache_key(&language, category.as_deref());
    let ttl = Duration::from_secs(state.config.current_ttl_secs);

    let engine = Arc::clone(&state.engine);
    let bytes = with_deadline(
        BUILD_DEADLINE,
        state.engine.cache().get_or_fill(&cache_key, ttl, move || async move {
            let snapshot = engine
                .get_or_build_snapshot(&language, category.as_deref(), false)
                .await?;
            let dto = CatalogResponse {
                language: snapshot.language_code,
                version: snapshot.version,
                checksum: snapshot.checksum,
                catalog: snapshot.catalog,
            };
            serde_json::to_vec(&Envelope::ok(dto))
                .map_err(|e| CatalogError::internal(e.to_string()))
        }),
    )
    .await?;

    Ok(json_bytes(bytes))
}

/// `GET /v1/version/{version}/catalog/{language}` — immutable, long-TTL
/// cached.
pub(crate) async fn versioned_catalog(
    State(state): State<Arc<AppState>>,
    Path((version, language)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let number: SemVersion = version
        .parse()
        .map_err(|_| ApiError::validation(format!("invalid version number {version:?}")))?;
    let cache_key = versioned_cache_key(&language, &number);
    let ttl = Duration::from_secs(state.config.versioned_ttl_secs);

    let engine = Arc::clone(&state.engine);
    let bytes = with_deadline(
        READ_DEADLINE,
        state.engine.cache().get_or_fill(&cache_key, ttl, move || async move {
            let (catalog, checksum) = engine.catalog_by_version(number, &language).await?;
            let dto = VersionedCatalogResponse {
                language,
                version: number.to_string(),
                checksum,
                catalog,
            };
            serde_json::to_vec(&Envelope::ok(dto))
                .map_err(|e| CatalogError::internal(e.to_string()))
        }),
    )
    .await?;

    Ok(json_bytes(bytes))
}

// ---------------------------------------------------------------------------
// Localization reads
// ---------------------------------------------------------------------------

/// `GET /v1/localize/{key}?language=&fallback=`.
pub(crate) async fn localize_one(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<LocalizeQuery>,
) -> Result<Json<Envelope<LocalizeResponse>>, ApiError> {
    let language = query
        .language
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ApiError::validation("query parameter 'language' is required"))?;

    let resolved = with_deadline(
        READ_DEADLINE,
        state.engine.resolve_one(&key, &language, query.fallback),
    )
    .await?;

    Ok(Json(Envelope::ok(LocalizeResponse {
        key: resolved.key,
        language: resolved.language_code,
        value: resolved.value,
        variables: resolved.variables,
        approved: resolved.approved,
    })))
}

/// `POST /v1/localize/batch` — unresolved keys are omitted, not errored.
pub(crate) async fn localize_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BatchLocalizeRequest>,
) -> Result<Json<Envelope<BatchLocalizeResponse>>, ApiError> {
    let localizations = with_deadline(
        BUILD_DEADLINE,
        state
            .engine
            .resolve_batch(&body.language, &body.keys, body.fallback),
    )
    .await?;

    Ok(Json(Envelope::ok(BatchLocalizeResponse {
        language: body.language,
        localizations,
    })))
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct LanguagesQuery {
    #[serde(default)]
    active_only: bool,
}

/// `GET /v1/languages?active_only=`.
pub(crate) async fn list_languages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LanguagesQuery>,
) -> Result<Json<Envelope<LanguagesResponse>>, ApiError> {
    let languages =
        with_deadline(READ_DEADLINE, state.engine.list_languages(query.active_only)).await?;
    Ok(Json(Envelope::ok(LanguagesResponse { languages })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeysQuery {
    #[serde(default)]
    category: Option<String>,
}

/// `GET /v1/keys?category=`.
pub(crate) async fn list_keys(
    State(state): State<Arc<AppState>>,
    Query(query): Query<KeysQuery>,
) -> Result<Json<Envelope<KeysResponse>>, ApiError> {
    let keys = with_deadline(
        READ_DEADLINE,
        state.engine.list_keys(query.category.as_deref()),
    )
    .await?;
    Ok(Json(Envelope::ok(KeysResponse { keys })))
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// `GET /v1/version/current`.
pub(crate) async fn current_version(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Envelope<l10n_core::LocalizationVersion>>, ApiError> {
    let version = with_deadline(READ_DEADLINE, state.engine.current_version())
        .await?
        .ok_or_else(|| ApiError::from(CatalogError::not_found("no versions created yet")))?;
    Ok(Json(Envelope::ok(version)))
}

/// `GET /v1/version/history`.
pub(crate) async fn version_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Envelope<VersionHistoryResponse>>, ApiError> {
    let versions = with_deadline(READ_DEADLINE, state.engine.version_history()).await?;
    Ok(Json(Envelope::ok(VersionHistoryResponse { versions })))
}

/// `GET /v1/version/{version}`.
pub(crate) async fn get_version(
    State(state): State<Arc<AppState>>,
    Path(version): Path<String>,
) -> Result<Json<Envelope<l10n_core::LocalizationVersion>>, ApiError> {
    let number: SemVersion = version
        .parse()
        .map_err(|_| ApiError::validation(format!("invalid version number {version:?}")))?;
    let row = with_deadline(READ_DEADLINE, state.engine.get_version(number)).await?;
    Ok(Json(Envelope::ok(row)))
}
