// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP API types: the response envelope, request/response bodies, and the
//! error type handlers return.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use l10n_core::{Language, LocalizationKey, LocalizationVersion};
use l10n_error::{CatalogError, Code, ErrorDto};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The uniform JSON envelope every endpoint answers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the request succeeded.
    pub success: bool,
    /// Payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Machine-readable error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDto>,
}

impl<T> Envelope<T> {
    /// Wrap a successful payload.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Wrap an error.
    pub fn err(error: ErrorDto) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Handler-level error: a [`CatalogError`] rendered as the envelope with
/// its mapped HTTP status.
#[derive(Debug)]
pub struct ApiError(pub CatalogError);

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        Self(err)
    }
}

impl From<l10n_auth::AuthError> for ApiError {
    fn from(err: l10n_auth::AuthError) -> Self {
        Self(CatalogError::new(Code::Unauthorized, err.to_string()))
    }
}

impl ApiError {
    /// Convenience constructor for handler-side validation failures.
    pub fn validation(message: impl Into<String>) -> Self {
        Self(CatalogError::validation(message))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(Envelope::<()>::err(ErrorDto::from(&self.0)));
        (status, body).into_response()
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"unavailable"`.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Dependency probes.
    pub checks: HealthChecks,
}

/// Dependency states reported by `/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthChecks {
    /// `"ok"` or `"unavailable"`.
    pub database: String,
    /// `"ok"`, `"degraded"`, or `"disabled"` (no shared tier configured).
    pub cache: String,
}

// ---------------------------------------------------------------------------
// Catalog & localization
// ---------------------------------------------------------------------------

/// Response body for `GET /v1/catalog/{language}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogResponse {
    /// Language code.
    pub language: String,
    /// Snapshot version.
    pub version: i64,
    /// Content checksum of the catalog.
    pub checksum: String,
    /// Key name → value.
    pub catalog: BTreeMap<String, String>,
}

/// Response body for `GET /v1/version/{version}/catalog/{language}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedCatalogResponse {
    /// Language code.
    pub language: String,
    /// The semantic version the catalog is frozen under.
    pub version: String,
    /// Content checksum of the catalog.
    pub checksum: String,
    /// Key name → value.
    pub catalog: BTreeMap<String, String>,
}

/// Query string for `GET /v1/localize/{key}`.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalizeQuery {
    /// Required language code.
    #[serde(default)]
    pub language: Option<String>,
    /// Fall back to the default language (default true).
    #[serde(default = "default_true")]
    pub fallback: bool,
}

pub(crate) fn default_true() -> bool {
    true
}

/// Response body for `GET /v1/localize/{key}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizeResponse {
    /// The requested key.
    pub key: String,
    /// The language that served the value.
    pub language: String,
    /// The localized value.
    pub value: String,
    /// Declared variable names (interpolation is the caller's job).
    pub variables: Vec<String>,
    /// Whether the serving localization is approved.
    pub approved: bool,
}

/// Request body for `POST /v1/localize/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchLocalizeRequest {
    /// Language code.
    pub language: String,
    /// Keys to resolve.
    pub keys: Vec<String>,
    /// Fall back to the default language (default true).
    #[serde(default = "default_true")]
    pub fallback: bool,
}

/// Response body for `POST /v1/localize/batch`; unresolved keys are
/// omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchLocalizeResponse {
    /// Language code as requested.
    pub language: String,
    /// Key → value for every key that resolved.
    pub localizations: BTreeMap<String, String>,
}

/// Response body for `GET /v1/languages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagesResponse {
    /// Matching languages.
    pub languages: Vec<Language>,
}

/// Response body for `GET /v1/keys`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysResponse {
    /// Matching keys.
    pub keys: Vec<LocalizationKey>,
}

/// Response body for `GET /v1/version/history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionHistoryResponse {
    /// All versions, newest first.
    pub versions: Vec<LocalizationVersion>,
}

// ---------------------------------------------------------------------------
// Admin bodies
// ---------------------------------------------------------------------------

/// Body for `POST /v1/admin/languages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLanguageBody {
    /// Short IETF-like code.
    pub code: String,
    /// English display name.
    pub name: String,
    /// Name in the language itself (defaults to `name`).
    #[serde(default)]
    pub native_name: Option<String>,
    /// Right-to-left flag.
    #[serde(default)]
    pub is_rtl: bool,
    /// Active flag (default true).
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Default-language flag.
    #[serde(default)]
    pub is_default: bool,
}

/// Body for `PUT /v1/admin/languages/{id}`. Absent fields are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLanguageBody {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New native name.
    #[serde(default)]
    pub native_name: Option<String>,
    /// New right-to-left flag.
    #[serde(default)]
    pub is_rtl: Option<bool>,
    /// New active flag.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// New default flag.
    #[serde(default)]
    pub is_default: Option<bool>,
}

/// Body for `POST /v1/admin/keys`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateKeyBody {
    /// Dotted key name.
    pub name: String,
    /// Optional category.
    #[serde(default)]
    pub category: Option<String>,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional context hint.
    #[serde(default)]
    pub context: Option<String>,
}

/// Body for `PUT /v1/admin/keys/{id}`.
///
/// Double options distinguish "leave untouched" (absent) from "clear"
/// (explicit null).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateKeyBody {
    /// New category.
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    /// New description.
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    /// New context hint.
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub context: Option<Option<String>>,
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Body for `POST /v1/admin/localizations` (create-or-update by key and
/// language).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditLocalizationBody {
    /// Dotted key name.
    pub key: String,
    /// Language code.
    pub language: String,
    /// The value.
    pub value: String,
    /// Plural-category tag → string.
    #[serde(default)]
    pub plural_forms: BTreeMap<String, String>,
    /// Declared variable names.
    #[serde(default)]
    pub variables: Vec<String>,
    /// Approval state after the write.
    #[serde(default)]
    pub approved: bool,
    /// Optimistic-lock token.
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Body for `PUT /v1/admin/localizations/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLocalizationBody {
    /// The new value.
    pub value: String,
    /// Plural-category tag → string.
    #[serde(default)]
    pub plural_forms: BTreeMap<String, String>,
    /// Declared variable names.
    #[serde(default)]
    pub variables: Vec<String>,
    /// Approval state after the write.
    #[serde(default)]
    pub approved: bool,
    /// Optimistic-lock token.
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Body for `POST /v1/admin/localizations/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchUpsertRequest {
    /// Items to apply; each fails independently.
    pub items: Vec<EditLocalizationBody>,
}

/// Response body for `POST /v1/admin/localizations/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchUpsertResponse {
    /// Items applied.
    pub processed: u64,
    /// Items that failed.
    pub failed: u64,
    /// Per-item failures.
    pub errors: Vec<BatchItemError>,
}

/// One failed batch item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemError {
    /// `key/language` of the failed item.
    pub item: String,
    /// Stable error code.
    pub code: Code,
    /// Human-readable reason.
    pub reason: String,
}

/// Body for `POST /v1/admin/version/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVersionBody {
    /// `major`, `minor`, or `patch`.
    pub version_type: String,
    /// Optional release description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional metadata mapping.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Body for `POST /v1/admin/cache/invalidate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvalidateCacheBody {
    /// Language code to invalidate, or absent for a full flush.
    #[serde(default)]
    pub language: Option<String>,
}

/// Response body for `POST /v1/admin/cache/invalidate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateCacheResponse {
    /// Entries removed across tiers.
    pub removed: u64,
}

/// Response body for `GET /v1/admin/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Non-deleted languages.
    pub languages: i64,
    /// Non-deleted keys.
    pub keys: i64,
    /// Non-deleted localizations.
    pub localizations: i64,
    /// Approved share of localizations.
    pub approved_localizations: i64,
    /// Semantic versions created.
    pub versions: i64,
    /// Events published since start.
    pub events_published: u64,
    /// Events dropped (no listener or lag).
    pub events_dropped: u64,
    /// Live streaming subscribers.
    pub subscribers: usize,
    /// Whether the shared cache tier is degraded.
    pub cache_degraded: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
