// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for the catalog engine against a real SQLite store.

use l10n_bus::EventBus;
use l10n_cache::{LayeredCache, LocalCache};
use l10n_core::{SemVersion, VersionBump};
use l10n_engine::{Actor, CatalogEngine, EditLocalization};
use l10n_error::Code;
use l10n_store::{CatalogStore, NewKey, NewLanguage, SqliteStore};
use std::collections::BTreeMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn engine() -> (tempfile::TempDir, Arc<CatalogEngine>) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}/l10n.db", dir.path().display());
    let store = Arc::new(SqliteStore::connect(&url).await.unwrap());
    let cache = Arc::new(LayeredCache::new(LocalCache::new(64, 64 * 1024), None));
    let bus = Arc::new(EventBus::new());
    (dir, Arc::new(CatalogEngine::new(store, cache, bus)))
}

fn admin() -> Actor {
    Actor {
        username: "admin".into(),
        client_addr: "127.0.0.1".into(),
        client_agent: "engine-tests".into(),
    }
}

async fn seed_language(
    engine: &CatalogEngine,
    code: &str,
    default: bool,
) -> l10n_core::Language {
    engine
        .store()
        .create_language(NewLanguage {
            code: code.into(),
            name: code.to_uppercase(),
            native_name: code.to_uppercase(),
            is_rtl: false,
            is_active: true,
            is_default: default,
        })
        .await
        .unwrap()
}

async fn seed_key(engine: &CatalogEngine, name: &str) {
    engine
        .store()
        .create_key(NewKey {
            name: name.into(),
            category: None,
            description: None,
            context: None,
        })
        .await
        .unwrap();
}

fn edit(key: &str, language: &str, value: &str, approved: bool) -> EditLocalization {
    EditLocalization {
        key: key.into(),
        language: language.into(),
        value: value.into(),
        plural_forms: BTreeMap::new(),
        variables: vec![],
        approved,
        expected_version: None,
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_and_resolve() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_key(&engine, "app.welcome").await;
    engine
        .edit_localization(edit("app.welcome", "en", "Welcome!", true), &admin())
        .await
        .unwrap();

    let resolved = engine.resolve_one("app.welcome", "en", true).await.unwrap();
    assert_eq!(resolved.value, "Welcome!");
    assert!(resolved.approved);
    assert_eq!(resolved.language_code, "en");
}

#[tokio::test]
async fn resolve_falls_back_to_default_language() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_language(&engine, "de", false).await;
    seed_key(&engine, "app.error").await;
    engine
        .edit_localization(edit("app.error", "en", "An error occurred", true), &admin())
        .await
        .unwrap();

    let resolved = engine.resolve_one("app.error", "de", true).await.unwrap();
    assert_eq!(resolved.language_code, "en");
    assert_eq!(resolved.value, "An error occurred");
}

#[tokio::test]
async fn resolve_without_fallback_is_not_found() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_language(&engine, "de", false).await;
    seed_key(&engine, "app.error").await;
    engine
        .edit_localization(edit("app.error", "en", "An error occurred", true), &admin())
        .await
        .unwrap();

    let err = engine
        .resolve_one("app.error", "de", false)
        .await
        .unwrap_err();
    assert_eq!(err.code, Code::NotFound);
}

#[tokio::test]
async fn resolve_with_fallback_but_no_default_is_not_found() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "de", false).await;
    seed_key(&engine, "app.error").await;

    let err = engine
        .resolve_one("app.error", "de", true)
        .await
        .unwrap_err();
    assert_eq!(err.code, Code::NotFound);
}

#[tokio::test]
async fn unapproved_value_is_invisible_to_resolution() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_key(&engine, "app.draft").await;
    engine
        .edit_localization(edit("app.draft", "en", "Draft copy", false), &admin())
        .await
        .unwrap();

    let err = engine.resolve_one("app.draft", "en", true).await.unwrap_err();
    assert_eq!(err.code, Code::NotFound);
}

#[tokio::test]
async fn batch_omits_unknown_keys() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_key(&engine, "app.a").await;
    seed_key(&engine, "app.b").await;
    engine
        .edit_localization(edit("app.a", "en", "A", true), &admin())
        .await
        .unwrap();
    engine
        .edit_localization(edit("app.b", "en", "B", true), &admin())
        .await
        .unwrap();

    let result = engine
        .resolve_batch(
            "en",
            &["app.a".into(), "app.b".into(), "app.missing".into()],
            true,
        )
        .await
        .unwrap();
    assert_eq!(result.len(), 2);
    assert!(!result.contains_key("app.missing"));
}

// ---------------------------------------------------------------------------
// Optimistic concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_editors_conflict_on_same_baseline() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_key(&engine, "app.welcome").await;
    engine
        .edit_localization(edit("app.welcome", "en", "Welcome!", true), &admin())
        .await
        .unwrap();

    let mut first = edit("app.welcome", "en", "Hello!", true);
    first.expected_version = Some(1);
    let updated = engine.edit_localization(first, &admin()).await.unwrap();
    assert_eq!(updated.version, 2);

    let mut second = edit("app.welcome", "en", "Howdy!", true);
    second.expected_version = Some(1);
    let err = engine.edit_localization(second, &admin()).await.unwrap_err();
    assert_eq!(err.code, Code::Conflict);
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn snapshot_is_reused_until_an_edit_lands() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_key(&engine, "app.welcome").await;
    engine
        .edit_localization(edit("app.welcome", "en", "Welcome!", true), &admin())
        .await
        .unwrap();

    let first = engine.get_or_build_snapshot("en", None, false).await.unwrap();
    assert_eq!(first.version, 1);
    let second = engine.get_or_build_snapshot("en", None, false).await.unwrap();
    assert_eq!(second.version, 1);
    assert_eq!(second.checksum, first.checksum);

    engine
        .edit_localization(edit("app.welcome", "en", "Hello!", true), &admin())
        .await
        .unwrap();
    let third = engine.get_or_build_snapshot("en", None, false).await.unwrap();
    assert_eq!(third.version, 2);
    assert_ne!(third.checksum, first.checksum);
    assert_eq!(third.catalog["app.welcome"], "Hello!");
}

#[tokio::test]
async fn snapshot_checksum_matches_canonical_hash() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_key(&engine, "app.welcome").await;
    engine
        .edit_localization(edit("app.welcome", "en", "Welcome!", true), &admin())
        .await
        .unwrap();

    let snapshot = engine.get_or_build_snapshot("en", None, false).await.unwrap();
    assert_eq!(snapshot.checksum, l10n_core::catalog_checksum(&snapshot.catalog));
}

#[tokio::test]
async fn concurrent_builds_share_one_snapshot_version() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_key(&engine, "app.welcome").await;
    engine
        .edit_localization(edit("app.welcome", "en", "Welcome!", true), &admin())
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        tasks.push(tokio::spawn(async move {
            engine.get_or_build_snapshot("en", None, false).await.unwrap()
        }));
    }
    for task in tasks {
        let snapshot = task.await.unwrap();
        assert_eq!(snapshot.version, 1, "all callers must share the build");
    }
}

#[tokio::test]
async fn unapproved_preview_does_not_advance_the_sequence() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_key(&engine, "app.draft").await;
    engine
        .edit_localization(edit("app.draft", "en", "Draft copy", false), &admin())
        .await
        .unwrap();

    let preview = engine.get_or_build_snapshot("en", None, true).await.unwrap();
    assert!(preview.catalog.contains_key("app.draft"));

    let persisted = engine.get_or_build_snapshot("en", None, false).await.unwrap();
    assert_eq!(persisted.version, 1);
    assert!(!persisted.catalog.contains_key("app.draft"));
}

#[tokio::test]
async fn snapshot_for_unknown_language_is_not_found() {
    let (_dir, engine) = engine().await;
    let err = engine
        .get_or_build_snapshot("xx", None, false)
        .await
        .unwrap_err();
    assert_eq!(err.code, Code::NotFound);
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn advance_version_increments_chosen_component() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;

    let v1 = engine
        .advance_version(VersionBump::Major, None, BTreeMap::new(), &admin())
        .await
        .unwrap();
    assert_eq!(v1.number, SemVersion::new(1, 0, 0));

    let v11 = engine
        .advance_version(VersionBump::Minor, None, BTreeMap::new(), &admin())
        .await
        .unwrap();
    assert_eq!(v11.number, SemVersion::new(1, 1, 0));

    let v111 = engine
        .advance_version(VersionBump::Patch, None, BTreeMap::new(), &admin())
        .await
        .unwrap();
    assert_eq!(v111.number, SemVersion::new(1, 1, 1));
}

#[tokio::test]
async fn versioned_catalog_is_frozen_across_edits() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_key(&engine, "app.welcome").await;
    engine
        .edit_localization(edit("app.welcome", "en", "Welcome!", true), &admin())
        .await
        .unwrap();

    let version = engine
        .advance_version(VersionBump::Minor, None, BTreeMap::new(), &admin())
        .await
        .unwrap();

    engine
        .edit_localization(edit("app.welcome", "en", "Hello!", true), &admin())
        .await
        .unwrap();

    let (frozen, _) = engine
        .catalog_by_version(version.number, "en")
        .await
        .unwrap();
    assert_eq!(frozen["app.welcome"], "Welcome!");

    let current = engine.get_or_build_snapshot("en", None, false).await.unwrap();
    assert_eq!(current.catalog["app.welcome"], "Hello!");
}

#[tokio::test]
async fn version_counts_are_real() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_language(&engine, "de", false).await;
    seed_key(&engine, "app.welcome").await;
    engine
        .edit_localization(edit("app.welcome", "en", "Welcome!", true), &admin())
        .await
        .unwrap();

    let version = engine
        .advance_version(VersionBump::Major, None, BTreeMap::new(), &admin())
        .await
        .unwrap();
    assert_eq!(version.languages_count, 2);
    assert_eq!(version.keys_count, 1);
    assert_eq!(version.localizations_count, 1);
}

#[tokio::test]
async fn deleting_current_version_conflicts() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;

    let version = engine
        .advance_version(VersionBump::Major, None, BTreeMap::new(), &admin())
        .await
        .unwrap();
    let err = engine
        .delete_version(version.number, &admin())
        .await
        .unwrap_err();
    assert_eq!(err.code, Code::Conflict);
}

#[tokio::test]
async fn deleting_older_version_succeeds() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;

    let v1 = engine
        .advance_version(VersionBump::Major, None, BTreeMap::new(), &admin())
        .await
        .unwrap();
    engine
        .advance_version(VersionBump::Minor, None, BTreeMap::new(), &admin())
        .await
        .unwrap();

    engine.delete_version(v1.number, &admin()).await.unwrap();
    let err = engine.catalog_by_version(v1.number, "en").await.unwrap_err();
    assert_eq!(err.code, Code::NotFound);
}

// ---------------------------------------------------------------------------
// Events and audit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn edit_publishes_typed_event_with_actor_meta() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_key(&engine, "app.welcome").await;

    let mut sub = engine.bus().subscribe();
    engine
        .edit_localization(edit("app.welcome", "en", "Welcome!", true), &admin())
        .await
        .unwrap();

    let event = sub.recv().await.unwrap();
    assert_eq!(event.kind.type_name(), "localization.added");
    assert_eq!(event.kind.language_code(), Some("en"));
    assert_eq!(event.meta.unwrap().actor.as_deref(), Some("admin"));
}

#[tokio::test]
async fn mutations_append_audit_records() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;
    seed_key(&engine, "app.welcome").await;
    engine
        .edit_localization(edit("app.welcome", "en", "Welcome!", true), &admin())
        .await
        .unwrap();

    let audit = engine.store().list_audit(None, 10).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].operation, "create");
    assert_eq!(audit[0].entity_type, "localization");
    assert_eq!(audit[0].actor, "admin");
}

#[tokio::test]
async fn invalidate_cache_emits_event() {
    let (_dir, engine) = engine().await;
    seed_language(&engine, "en", true).await;

    let mut sub = engine.bus().subscribe();
    engine
        .invalidate_cache(Some("en"), "manual", Some(&admin()))
        .await
        .unwrap();

    let event = sub.recv().await.unwrap();
    assert_eq!(event.kind.type_name(), "cache.invalidated");
    assert_eq!(event.kind.language_code(), Some("en"));
}
