// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for the localization
//! catalog service.
//!
//! This crate provides [`ServiceConfig`] — the top-level runtime settings —
//! together with helpers for loading from TOML files, applying `L10N_*`
//! environment overrides, and producing advisory [`ConfigWarning`]s.
//! Unknown keys are rejected at parse time.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML (this includes unknown
    /// option names, which are rejected at startup).
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A recommended optional field is missing.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
    /// A TTL is unusually small or large for its tier.
    UnusualTtl {
        /// Which TTL setting.
        field: String,
        /// The configured value in seconds.
        secs: u64,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
            ConfigWarning::UnusualTtl { field, secs } => {
                write!(f, "'{field}' has an unusual value ({secs}s)")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level runtime configuration for the catalog service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Listen address for the HTTP surface.
    #[serde(default = "defaults::bind")]
    pub bind: String,

    /// SQLite connection string (e.g. `sqlite://l10n.db`).
    #[serde(default = "defaults::database_url")]
    pub database_url: String,

    /// Optional shared-cache (Redis) connection string. When absent the
    /// cache runs with the process-local tier only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,

    /// HMAC-SHA256 signing secret for bearer credentials.
    #[serde(default)]
    pub jwt_secret: String,

    /// Role names granted access to `/v1/admin/*`.
    #[serde(default = "defaults::admin_roles")]
    pub admin_roles: Vec<String>,

    /// TTL in seconds for current (unversioned) catalog entries.
    #[serde(default = "defaults::current_ttl_secs")]
    pub current_ttl_secs: u64,

    /// TTL in seconds for versioned (immutable) catalog entries.
    #[serde(default = "defaults::versioned_ttl_secs")]
    pub versioned_ttl_secs: u64,

    /// Maximum entry count of the process-local LRU tier.
    #[serde(default = "defaults::local_cache_capacity")]
    pub local_cache_capacity: usize,

    /// Per-entry byte cap for the local tier; larger values bypass it.
    #[serde(default = "defaults::local_cache_max_entry_bytes")]
    pub local_cache_max_entry_bytes: usize,

    /// Event bus channel capacity.
    #[serde(default = "defaults::event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Bounded outbound queue size per streaming subscriber.
    #[serde(default = "defaults::subscriber_queue_capacity")]
    pub subscriber_queue_capacity: usize,

    /// Heartbeat ping cadence in seconds.
    #[serde(default = "defaults::heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Seconds without a pong before a subscriber is closed.
    #[serde(default = "defaults::heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,

    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

mod defaults {
    pub(super) fn bind() -> String {
        "127.0.0.1:8080".into()
    }
    pub(super) fn database_url() -> String {
        "sqlite://l10n.db".into()
    }
    pub(super) fn admin_roles() -> Vec<String> {
        vec!["admin".into()]
    }
    pub(super) fn current_ttl_secs() -> u64 {
        3_600
    }
    pub(super) fn versioned_ttl_secs() -> u64 {
        86_400
    }
    pub(super) fn local_cache_capacity() -> usize {
        1_024
    }
    pub(super) fn local_cache_max_entry_bytes() -> usize {
        256 * 1024
    }
    pub(super) fn event_bus_capacity() -> usize {
        256
    }
    pub(super) fn subscriber_queue_capacity() -> usize {
        64
    }
    pub(super) fn heartbeat_secs() -> u64 {
        30
    }
    pub(super) fn heartbeat_timeout_secs() -> u64 {
        75
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        // Route through serde so struct defaults stay in one place.
        toml::from_str("").expect("empty config parses to defaults")
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Versioned entries shorter-lived than current entries defeat their point.
const MIN_SENSIBLE_VERSIONED_TTL: u64 = 60;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`ServiceConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`ServiceConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => ServiceConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`ServiceConfig`].
///
/// Unknown option names fail the parse.
pub fn parse_toml(content: &str) -> Result<ServiceConfig, ConfigError> {
    toml::from_str::<ServiceConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `L10N_BIND`
/// - `L10N_DATABASE_URL`
/// - `L10N_REDIS_URL`
/// - `L10N_JWT_SECRET`
/// - `L10N_ADMIN_ROLES` (comma-separated)
/// - `L10N_LOG_LEVEL`
pub fn apply_env_overrides(config: &mut ServiceConfig) {
    if let Ok(val) = std::env::var("L10N_BIND") {
        config.bind = val;
    }
    if let Ok(val) = std::env::var("L10N_DATABASE_URL") {
        config.database_url = val;
    }
    if let Ok(val) = std::env::var("L10N_REDIS_URL") {
        config.redis_url = Some(val);
    }
    if let Ok(val) = std::env::var("L10N_JWT_SECRET") {
        config.jwt_secret = val;
    }
    if let Ok(val) = std::env::var("L10N_ADMIN_ROLES") {
        config.admin_roles = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(val) = std::env::var("L10N_LOG_LEVEL") {
        config.log_level = Some(val);
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (empty signing secret, zero capacities, out-of-order TTLs)
/// come back as a [`ConfigError::ValidationError`]; soft issues as warnings.
pub fn validate_config(config: &ServiceConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if config.bind.trim().is_empty() {
        errors.push("bind address must not be empty".into());
    }
    if config.database_url.trim().is_empty() {
        errors.push("database_url must not be empty".into());
    }
    if config.jwt_secret.is_empty() {
        errors.push("jwt_secret must not be empty".into());
    }
    if config.admin_roles.is_empty() {
        errors.push("admin_roles must name at least one role".into());
    }
    if config.local_cache_capacity == 0 {
        errors.push("local_cache_capacity must be greater than zero".into());
    }
    if config.event_bus_capacity == 0 {
        errors.push("event_bus_capacity must be greater than zero".into());
    }
    if config.subscriber_queue_capacity == 0 {
        errors.push("subscriber_queue_capacity must be greater than zero".into());
    }
    if config.heartbeat_secs == 0 {
        errors.push("heartbeat_secs must be greater than zero".into());
    }
    if config.heartbeat_timeout_secs <= config.heartbeat_secs {
        errors.push("heartbeat_timeout_secs must exceed heartbeat_secs".into());
    }
    if config.versioned_ttl_secs < config.current_ttl_secs {
        errors.push("versioned_ttl_secs must not be below current_ttl_secs".into());
    }

    if let Some(ref level) = config.log_level
        && !VALID_LOG_LEVELS.contains(&level.as_str())
    {
        errors.push(format!("invalid log_level '{level}'"));
    }

    if config.versioned_ttl_secs < MIN_SENSIBLE_VERSIONED_TTL {
        warnings.push(ConfigWarning::UnusualTtl {
            field: "versioned_ttl_secs".into(),
            secs: config.versioned_ttl_secs,
        });
    }
    if config.redis_url.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "redis_url".into(),
            hint: "cache will run with the process-local tier only".into(),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> ServiceConfig {
        ServiceConfig {
            jwt_secret: "sekrit".into(),
            ..Default::default()
        }
    }

    #[test]
    fn default_config_has_sensible_defaults() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.bind, "127.0.0.1:8080");
        assert_eq!(cfg.current_ttl_secs, 3_600);
        assert_eq!(cfg.versioned_ttl_secs, 86_400);
        assert_eq!(cfg.admin_roles, vec!["admin".to_string()]);
        assert!(cfg.redis_url.is_none());
    }

    #[test]
    fn parse_valid_toml_string() {
        let toml = r#"
            bind = "0.0.0.0:9000"
            database_url = "sqlite:///var/lib/l10n/catalog.db"
            jwt_secret = "s3cr3t"
            admin_roles = ["admin", "owner"]
            current_ttl_secs = 1800
        "#;
        let cfg = parse_toml(toml).unwrap();
        assert_eq!(cfg.bind, "0.0.0.0:9000");
        assert_eq!(cfg.admin_roles.len(), 2);
        assert_eq!(cfg.current_ttl_secs, 1800);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let toml = r#"
            jwt_secret = "x"
            not_a_real_option = true
        "#;
        let err = parse_toml(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn parse_wrong_types_gives_parse_error() {
        let err = parse_toml(r#"current_ttl_secs = "soon""#).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn validation_catches_empty_secret() {
        let cfg = ServiceConfig::default();
        let err = validate_config(&cfg).unwrap_err();
        match err {
            ConfigError::ValidationError { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("jwt_secret")));
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn validation_catches_zero_capacities() {
        let cfg = ServiceConfig {
            subscriber_queue_capacity: 0,
            ..valid_config()
        };
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn validation_catches_inverted_ttls() {
        let cfg = ServiceConfig {
            current_ttl_secs: 7_200,
            versioned_ttl_secs: 60,
            ..valid_config()
        };
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn validation_catches_heartbeat_timeout_not_exceeding_cadence() {
        let cfg = ServiceConfig {
            heartbeat_secs: 30,
            heartbeat_timeout_secs: 30,
            ..valid_config()
        };
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn validation_catches_invalid_log_level() {
        let cfg = ServiceConfig {
            log_level: Some("verbose".into()),
            ..valid_config()
        };
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn valid_config_passes_with_redis_warning() {
        let warnings = validate_config(&valid_config()).unwrap();
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ConfigWarning::MissingOptionalField { field, .. } if field == "redis_url")));
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = ServiceConfig {
            jwt_secret: "x".into(),
            redis_url: Some("redis://127.0.0.1/0".into()),
            log_level: Some("debug".into()),
            ..Default::default()
        };
        let serialized = toml::to_string(&cfg).unwrap();
        let deserialized: ServiceConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(cfg, deserialized);
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("l10n.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "bind = \"127.0.0.1:7000\"\njwt_secret = \"abc\"").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:7000");
        assert_eq!(cfg.jwt_secret, "abc");
    }

    #[test]
    fn load_missing_file_gives_file_not_found() {
        let err = load_config(Some(Path::new("/nonexistent/l10n.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn empty_string_toml_parses_to_defaults() {
        let cfg = parse_toml("").unwrap();
        assert_eq!(cfg, ServiceConfig::default());
    }
}
