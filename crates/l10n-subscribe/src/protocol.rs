// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire protocol for streaming subscribers.
//!
//! Clients send [`ClientMessage`]s; the server answers with
//! [`ControlMessage`]s and raw [`l10n_core::CatalogEvent`] JSON. Control
//! tags are single words, event tags are dotted, so the two sets cannot
//! collide on the shared `type` field.

use crate::SubscribeError;
use l10n_core::{CatalogEvent, EventKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SubscriptionSpec
// ---------------------------------------------------------------------------

/// One subscription: which event types to receive and the filters applied
/// to them. Empty lists mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSpec {
    /// Dotted event type tags; empty = all types.
    #[serde(default)]
    pub event_types: Vec<String>,
    /// Language codes; empty = all languages. An event that carries no
    /// language never matches a language-constrained spec.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Dotted key-name prefix; an event that carries no key never matches
    /// a prefix-constrained spec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
    /// Key categories; same carrier rule as `languages`.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl SubscriptionSpec {
    /// Reject specs naming event types outside the taxonomy.
    pub fn validate(&self) -> Result<(), SubscribeError> {
        for event_type in &self.event_types {
            if !EventKind::ALL_TYPES.contains(&event_type.as_str()) {
                return Err(SubscribeError::UnknownEventType(event_type.clone()));
            }
        }
        Ok(())
    }

    /// Whether `event` passes every constraint of this spec.
    pub fn matches(&self, event: &CatalogEvent) -> bool {
        if !self.event_types.is_empty()
            && !self
                .event_types
                .iter()
                .any(|t| t == event.kind.type_name())
        {
            return false;
        }
        if !self.languages.is_empty() {
            match event.kind.language_code() {
                Some(code) => {
                    if !self.languages.iter().any(|l| l == code) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        if let Some(prefix) = &self.key_prefix {
            match event.kind.key_name() {
                Some(key) => {
                    if !key.starts_with(prefix.as_str()) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        if !self.categories.is_empty() {
            match event.kind.category() {
                Some(category) => {
                    if !self.categories.iter().any(|c| c == category) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// ClientMessage
// ---------------------------------------------------------------------------

/// Messages a streaming client may send after the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Declare (another) subscription.
    Subscribe {
        /// The subscription to add.
        #[serde(flatten)]
        spec: SubscriptionSpec,
    },
    /// Drop all subscriptions, keeping the connection.
    Unsubscribe,
    /// Application-level liveness probe.
    Ping,
}

// ---------------------------------------------------------------------------
// ControlMessage
// ---------------------------------------------------------------------------

/// Non-event messages the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// A subscribe/unsubscribe was applied.
    Ack {
        /// The connection's subscriber id.
        subscriber_id: Uuid,
    },
    /// Answer to a client [`ClientMessage::Ping`].
    Pong,
    /// The request could not be applied; the connection stays open unless
    /// the error was fatal to the handshake.
    Error {
        /// Stable error code.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_message_wire_shape() {
        let json = r#"{
            "type": "subscribe",
            "event_types": ["localization.updated"],
            "languages": ["en"]
        }"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Subscribe { spec } => {
                assert_eq!(spec.event_types, vec!["localization.updated".to_string()]);
                assert_eq!(spec.languages, vec!["en".to_string()]);
                assert!(spec.key_prefix.is_none());
            }
            other => panic!("expected Subscribe, got {other:?}"),
        }
    }

    #[test]
    fn ping_and_unsubscribe_roundtrip() {
        for msg in [ClientMessage::Ping, ClientMessage::Unsubscribe] {
            let json = serde_json::to_string(&msg).unwrap();
            let back: ClientMessage = serde_json::from_str(&json).unwrap();
            assert_eq!(back, msg);
        }
    }

    #[test]
    fn control_messages_use_single_word_tags() {
        let ack = ControlMessage::Ack {
            subscriber_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["type"], "ack");

        let err = ControlMessage::Error {
            code: "UNAUTHORIZED".into(),
            message: "bad credential".into(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "error");
    }

    #[test]
    fn empty_spec_matches_everything() {
        let spec = SubscriptionSpec::default();
        let event = l10n_core::CatalogEvent::now(l10n_core::EventKind::VersionDeleted {
            version_id: Uuid::nil(),
            number: "1.0.0".into(),
        });
        assert!(spec.matches(&event));
    }

    #[test]
    fn language_constrained_spec_skips_language_free_events() {
        let spec = SubscriptionSpec {
            languages: vec!["en".into()],
            ..Default::default()
        };
        let event = l10n_core::CatalogEvent::now(l10n_core::EventKind::VersionCreated {
            version_id: Uuid::nil(),
            number: "1.0.0".into(),
            description: None,
            keys_count: 0,
            languages_count: 0,
            localizations_count: 0,
        });
        assert!(!spec.matches(&event));
    }

    #[test]
    fn spec_validation_rejects_unknown_types() {
        let spec = SubscriptionSpec {
            event_types: vec!["nonsense.event".into()],
            ..Default::default()
        };
        assert!(spec.validate().is_err());

        let spec = SubscriptionSpec {
            event_types: vec!["catalog.rebuilt".into()],
            ..Default::default()
        };
        assert!(spec.validate().is_ok());
    }
}
