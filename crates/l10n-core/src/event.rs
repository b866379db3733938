// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed event taxonomy published on the in-process bus and fanned out to
//! streaming subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CatalogEvent
// ---------------------------------------------------------------------------

/// One event on the catalog bus.
///
/// Serialized as `{type, timestamp, ...payload, meta?}` where `type` is a
/// stable dotted tag (e.g. `"localization.updated"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEvent {
    /// UTC timestamp at publication.
    pub timestamp: DateTime<Utc>,
    /// The typed payload.
    #[serde(flatten)]
    pub kind: EventKind,
    /// Optional actor / correlation metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<EventMeta>,
}

impl CatalogEvent {
    /// Wrap a payload with the current timestamp and no metadata.
    pub fn now(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            meta: None,
        }
    }

    /// Attach actor metadata.
    pub fn with_meta(mut self, meta: EventMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Actor and correlation metadata carried alongside an event payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    /// Acting user identifier, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<Uuid>,
    /// Acting username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Correlation identifier linking the event to a request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// The payload discriminator for [`CatalogEvent`].
///
/// Tags are dotted `entity.operation` strings and are part of the wire
/// contract with subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    /// A language was created.
    #[serde(rename = "language.added")]
    LanguageAdded {
        /// Language identifier.
        language_id: Uuid,
        /// Language code.
        code: String,
        /// Display name.
        name: String,
        /// Native name.
        native_name: String,
        /// Right-to-left flag.
        is_rtl: bool,
        /// Active flag.
        is_active: bool,
    },
    /// A language was updated in place.
    #[serde(rename = "language.updated")]
    LanguageUpdated {
        /// Language identifier.
        language_id: Uuid,
        /// Language code.
        code: String,
        /// Display name.
        name: String,
        /// Native name.
        native_name: String,
        /// Right-to-left flag.
        is_rtl: bool,
        /// Active flag.
        is_active: bool,
    },
    /// A language was soft-deleted.
    #[serde(rename = "language.deleted")]
    LanguageDeleted {
        /// Language identifier.
        language_id: Uuid,
        /// Language code.
        code: String,
    },

    /// A localization key was created.
    #[serde(rename = "key.added")]
    KeyAdded {
        /// Key identifier.
        key_id: Uuid,
        /// Dotted key name.
        name: String,
        /// Optional category.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        /// Optional description.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// A localization key was updated.
    #[serde(rename = "key.updated")]
    KeyUpdated {
        /// Key identifier.
        key_id: Uuid,
        /// Dotted key name.
        name: String,
        /// Optional category.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        /// Optional description.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// A localization key was soft-deleted.
    #[serde(rename = "key.deleted")]
    KeyDeleted {
        /// Key identifier.
        key_id: Uuid,
        /// Dotted key name.
        name: String,
    },

    /// A localization was created.
    #[serde(rename = "localization.added")]
    LocalizationAdded {
        /// Localization identifier.
        localization_id: Uuid,
        /// Key identifier.
        key_id: Uuid,
        /// Dotted key name.
        key_name: String,
        /// Language identifier.
        language_id: Uuid,
        /// Language code.
        language_code: String,
        /// The stored value.
        value: String,
        /// Approval state after the write.
        approved: bool,
    },
    /// A localization value was edited in place.
    #[serde(rename = "localization.updated")]
    LocalizationUpdated {
        /// Localization identifier.
        localization_id: Uuid,
        /// Key identifier.
        key_id: Uuid,
        /// Dotted key name.
        key_name: String,
        /// Language identifier.
        language_id: Uuid,
        /// Language code.
        language_code: String,
        /// The stored value.
        value: String,
        /// Approval state after the write.
        approved: bool,
    },
    /// A localization was soft-deleted.
    #[serde(rename = "localization.deleted")]
    LocalizationDeleted {
        /// Localization identifier.
        localization_id: Uuid,
        /// Dotted key name.
        key_name: String,
        /// Language code.
        language_code: String,
    },
    /// A localization was approved for serving.
    #[serde(rename = "localization.approved")]
    LocalizationApproved {
        /// Localization identifier.
        localization_id: Uuid,
        /// Dotted key name.
        key_name: String,
        /// Language code.
        language_code: String,
        /// Identity of the approver.
        approver: String,
    },

    /// A bulk import or batch edit finished.
    #[serde(rename = "batch.completed")]
    BatchCompleted {
        /// Operation tag (e.g. `"import"`, `"batch_upsert"`).
        operation: String,
        /// Number of items applied.
        processed: u64,
        /// Number of items that failed independently.
        failed: u64,
        /// Wall-clock duration in milliseconds.
        duration_ms: u64,
    },

    /// A catalog snapshot was rebuilt.
    #[serde(rename = "catalog.rebuilt")]
    CatalogRebuilt {
        /// Language code, or `None` for all languages.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language_code: Option<String>,
        /// Snapshot version assigned to the rebuild.
        snapshot_version: i64,
        /// Content checksum of the rebuilt catalog.
        checksum: String,
    },

    /// Cache entries were invalidated.
    #[serde(rename = "cache.invalidated")]
    CacheInvalidated {
        /// Language code, or `None` for a full flush.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language_code: Option<String>,
        /// Human-readable reason.
        reason: String,
    },

    /// A semantic catalog version was created.
    #[serde(rename = "version.created")]
    VersionCreated {
        /// Version row identifier.
        version_id: Uuid,
        /// The new version number (display form).
        number: String,
        /// Optional release description.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Keys count at creation.
        keys_count: i64,
        /// Languages count at creation.
        languages_count: i64,
        /// Localizations count at creation.
        localizations_count: i64,
    },
    /// A semantic catalog version was deleted.
    #[serde(rename = "version.deleted")]
    VersionDeleted {
        /// Version row identifier.
        version_id: Uuid,
        /// The deleted version number (display form).
        number: String,
    },
}

impl EventKind {
    /// Every valid type tag, for subscribe-time validation.
    pub const ALL_TYPES: &'static [&'static str] = &[
        "language.added",
        "language.updated",
        "language.deleted",
        "key.added",
        "key.updated",
        "key.deleted",
        "localization.added",
        "localization.updated",
        "localization.deleted",
        "localization.approved",
        "batch.completed",
        "catalog.rebuilt",
        "cache.invalidated",
        "version.created",
        "version.deleted",
    ];

    /// The stable dotted type tag for this payload.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::LanguageAdded { .. } => "language.added",
            Self::LanguageUpdated { .. } => "language.updated",
            Self::LanguageDeleted { .. } => "language.deleted",
            Self::KeyAdded { .. } => "key.added",
            Self::KeyUpdated { .. } => "key.updated",
            Self::KeyDeleted { .. } => "key.deleted",
            Self::LocalizationAdded { .. } => "localization.added",
            Self::LocalizationUpdated { .. } => "localization.updated",
            Self::LocalizationDeleted { .. } => "localization.deleted",
            Self::LocalizationApproved { .. } => "localization.approved",
            Self::BatchCompleted { .. } => "batch.completed",
            Self::CatalogRebuilt { .. } => "catalog.rebuilt",
            Self::CacheInvalidated { .. } => "cache.invalidated",
            Self::VersionCreated { .. } => "version.created",
            Self::VersionDeleted { .. } => "version.deleted",
        }
    }

    /// The language code this event concerns, when it concerns exactly one.
    pub fn language_code(&self) -> Option<&str> {
        match self {
            Self::LanguageAdded { code, .. }
            | Self::LanguageUpdated { code, .. }
            | Self::LanguageDeleted { code, .. } => Some(code),
            Self::LocalizationAdded { language_code, .. }
            | Self::LocalizationUpdated { language_code, .. }
            | Self::LocalizationDeleted { language_code, .. }
            | Self::LocalizationApproved { language_code, .. } => Some(language_code),
            Self::CatalogRebuilt { language_code, .. }
            | Self::CacheInvalidated { language_code, .. } => language_code.as_deref(),
            _ => None,
        }
    }

    /// The dotted key name this event concerns, if any.
    pub fn key_name(&self) -> Option<&str> {
        match self {
            Self::KeyAdded { name, .. }
            | Self::KeyUpdated { name, .. }
            | Self::KeyDeleted { name, .. } => Some(name),
            Self::LocalizationAdded { key_name, .. }
            | Self::LocalizationUpdated { key_name, .. }
            | Self::LocalizationDeleted { key_name, .. }
            | Self::LocalizationApproved { key_name, .. } => Some(key_name),
            _ => None,
        }
    }

    /// The category this event concerns, if any.
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::KeyAdded { category, .. } | Self::KeyUpdated { category, .. } => {
                category.as_deref()
            }
            _ => None,
        }
    }

    /// Events withheld from non-admin subscribers (operator-only summaries).
    pub fn admin_only(&self) -> bool {
        matches!(self, Self::BatchCompleted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tag_matches_serde_rename() {
        let kind = EventKind::LocalizationUpdated {
            localization_id: Uuid::nil(),
            key_id: Uuid::nil(),
            key_name: "app.welcome".into(),
            language_id: Uuid::nil(),
            language_code: "en".into(),
            value: "Hello!".into(),
            approved: true,
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], kind.type_name());
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = CatalogEvent::now(EventKind::CatalogRebuilt {
            language_code: Some("de".into()),
            snapshot_version: 4,
            checksum: "feed".into(),
        })
        .with_meta(EventMeta {
            actor_id: None,
            actor: Some("admin".into()),
            correlation_id: Some(Uuid::nil()),
        });
        let json = serde_json::to_string(&event).unwrap();
        let back: CatalogEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn rebuild_for_all_languages_omits_code() {
        let kind = EventKind::CatalogRebuilt {
            language_code: None,
            snapshot_version: 1,
            checksum: "aa".into(),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert!(json.get("language_code").is_none());
        assert_eq!(kind.language_code(), None);
    }

    #[test]
    fn language_code_accessor_covers_localization_events() {
        let kind = EventKind::LocalizationApproved {
            localization_id: Uuid::nil(),
            key_name: "app.err".into(),
            language_code: "fr".into(),
            approver: "lead".into(),
        };
        assert_eq!(kind.language_code(), Some("fr"));
        assert_eq!(kind.key_name(), Some("app.err"));
    }

    #[test]
    fn batch_completed_is_admin_only() {
        let kind = EventKind::BatchCompleted {
            operation: "import".into(),
            processed: 10,
            failed: 1,
            duration_ms: 25,
        };
        assert!(kind.admin_only());
        assert!(!EventKind::LanguageDeleted { language_id: Uuid::nil(), code: "en".into() }
            .admin_only());
    }

    #[test]
    fn all_types_list_is_complete_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for t in EventKind::ALL_TYPES {
            assert!(seen.insert(*t), "duplicate type tag {t}");
        }
        assert_eq!(EventKind::ALL_TYPES.len(), 15);
    }

    #[test]
    fn all_type_names_are_dotted_and_unique() {
        let kinds: Vec<EventKind> = vec![
            EventKind::LanguageAdded {
                language_id: Uuid::nil(),
                code: "en".into(),
                name: "English".into(),
                native_name: "English".into(),
                is_rtl: false,
                is_active: true,
            },
            EventKind::LanguageDeleted { language_id: Uuid::nil(), code: "en".into() },
            EventKind::KeyDeleted { key_id: Uuid::nil(), name: "a.b".into() },
            EventKind::CacheInvalidated { language_code: None, reason: "import".into() },
            EventKind::VersionDeleted { version_id: Uuid::nil(), number: "1.0.0".into() },
        ];
        let mut seen = std::collections::HashSet::new();
        for k in &kinds {
            assert!(k.type_name().contains('.'));
            assert!(seen.insert(k.type_name()));
        }
    }
}
