// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unified error taxonomy with stable error codes for the localization
//! catalog service.
//!
//! Every service error carries a [`Code`] (a machine-readable, stable string
//! tag), a human-readable message, an optional cause chain, and arbitrary
//! key-value context.  Use the builder returned by [`CatalogError::new`] to
//! construct errors fluently.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Code
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// The set is closed: handlers map every failure onto one of these variants,
/// and each serialises to a `SCREAMING_SNAKE_CASE` string that is guaranteed
/// not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    /// The requested entity does not exist (or is soft-deleted).
    NotFound,
    /// A uniqueness invariant would be violated by the write.
    AlreadyExists,
    /// The request payload failed semantic validation.
    ValidationFailed,
    /// Missing or unverifiable credential.
    Unauthorized,
    /// Valid credential, insufficient role.
    Forbidden,
    /// Optimistic-lock version mismatch, or a forbidden lifecycle
    /// transition such as deleting the current version.
    Conflict,
    /// The persistent store is unreachable or transiently failing.
    StoreUnavailable,
    /// A cache tier is failing; reads degrade to misses.
    CacheDegraded,
    /// The per-request deadline fired before the operation finished.
    Cancelled,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl Code {
    /// Stable `&'static str` representation of the code
    /// (e.g. `"VALIDATION_FAILED"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Conflict => "CONFLICT",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::CacheDegraded => "CACHE_DEGRADED",
            Self::Cancelled => "CANCELLED",
            Self::Internal => "INTERNAL",
        }
    }

    /// The HTTP status this code surfaces as at the request boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::AlreadyExists | Self::Conflict => 409,
            Self::ValidationFailed => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::StoreUnavailable => 503,
            Self::CacheDegraded | Self::Internal => 500,
            Self::Cancelled => 408,
        }
    }

    /// Returns `true` for codes that indicate a transient condition a
    /// caller may retry without changing the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable | Self::CacheDegraded | Self::Cancelled)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CatalogError
// ---------------------------------------------------------------------------

/// Unified service error.
///
/// Carries a stable [`Code`], a human-readable message, an optional source
/// error for cause-chaining, and arbitrary structured context.
///
/// # Builder usage
///
/// ```
/// use l10n_error::{CatalogError, Code};
///
/// let err = CatalogError::new(Code::Conflict, "stale localization version")
///     .with_context("expected", 3)
///     .with_context("actual", 4);
/// ```
pub struct CatalogError {
    /// Machine-readable error code.
    pub code: Code,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl CatalogError {
    /// Create a new error with the given code and message.
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Shorthand for a [`Code::NotFound`] error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    /// Shorthand for a [`Code::ValidationFailed`] error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(Code::ValidationFailed, message)
    }

    /// Shorthand for a [`Code::Conflict`] error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(Code::Conflict, message)
    }

    /// Shorthand for a [`Code::Internal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Debug for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("CatalogError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Serialization support
// ---------------------------------------------------------------------------

/// Serialisable snapshot of a [`CatalogError`] (without the opaque source).
///
/// This is the `error` member of the response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDto {
    /// Error code.
    pub code: Code,
    /// Human-readable message.
    pub message: String,
    /// Structured context.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl From<&CatalogError> for ErrorDto {
    fn from(err: &CatalogError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            context: err.context.clone(),
        }
    }
}

impl From<CatalogError> for ErrorDto {
    fn from(err: CatalogError) -> Self {
        Self::from(&err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
