// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export/import round-trip tests against a real SQLite store.

use l10n_exchange::{Exchange, ExportDocument};
use l10n_store::{CatalogStore, NewKey, NewLanguage, SqliteStore, UpsertLocalization};
use std::collections::BTreeMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn fresh_store() -> (tempfile::TempDir, Arc<SqliteStore>) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}/l10n.db", dir.path().display());
    let store = Arc::new(SqliteStore::connect(&url).await.unwrap());
    (dir, store)
}

async fn seed(store: &Arc<SqliteStore>) {
    let en = store
        .create_language(NewLanguage {
            code: "en".into(),
            name: "English".into(),
            native_name: "English".into(),
            is_rtl: false,
            is_active: true,
            is_default: true,
        })
        .await
        .unwrap();
    let de = store
        .create_language(NewLanguage {
            code: "de".into(),
            name: "German".into(),
            native_name: "Deutsch".into(),
            is_rtl: false,
            is_active: true,
            is_default: false,
        })
        .await
        .unwrap();

    for (name, category) in [("app.welcome", Some("app")), ("app.error", Some("app"))] {
        store
            .create_key(NewKey {
                name: name.into(),
                category: category.map(Into::into),
                description: Some(format!("{name} copy")),
                context: None,
            })
            .await
            .unwrap();
    }

    let welcome = store.get_key_by_name("app.welcome").await.unwrap();
    let error = store.get_key_by_name("app.error").await.unwrap();
    for (key, lang, value) in [
        (&welcome, &en, "Welcome!"),
        (&welcome, &de, "Willkommen!"),
        (&error, &en, "An error occurred"),
    ] {
        store
            .upsert_localization(UpsertLocalization {
                key_id: key.id,
                language_id: lang.id,
                value: value.into(),
                plural_forms: BTreeMap::new(),
                variables: vec![],
                approved: true,
                approved_by: Some("reviewer".into()),
                expected_version: None,
            })
            .await
            .unwrap();
    }
}

// ---------------------------------------------------------------------------
// JSON round-trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_export_reimports_into_equivalent_store() {
    let (_dir_a, source) = fresh_store().await;
    seed(&source).await;
    let exported = Exchange::new(source.clone())
        .export_document()
        .await
        .unwrap();

    // Import into a clean store, then export again.
    let (_dir_b, target) = fresh_store().await;
    let target_exchange = Exchange::new(target.clone());
    let summary = target_exchange
        .import_document(&exported, true)
        .await
        .unwrap();
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.languages_created, 2);
    assert_eq!(summary.keys_created, 2);
    assert_eq!(summary.localizations_written, 3);

    let reexported = target_exchange.export_document().await.unwrap();
    // Structurally equal modulo approval flags (which live outside the
    // document) and timestamps (which it does not carry).
    assert_eq!(exported, reexported);
}

#[tokio::test]
async fn json_document_survives_serde() {
    let (_dir, store) = fresh_store().await;
    seed(&store).await;
    let exported = Exchange::new(store)
        .export_document()
        .await
        .unwrap();

    let json = serde_json::to_string(&exported).unwrap();
    let back: ExportDocument = serde_json::from_str(&json).unwrap();
    assert_eq!(exported, back);
}

#[tokio::test]
async fn import_resets_approval() {
    let (_dir_a, source) = fresh_store().await;
    seed(&source).await;
    let exported = Exchange::new(source)
        .export_document()
        .await
        .unwrap();

    let (_dir_b, target) = fresh_store().await;
    Exchange::new(target.clone())
        .import_document(&exported, true)
        .await
        .unwrap();

    let counts = target.counts().await.unwrap();
    assert_eq!(counts.localizations, 3);
    assert_eq!(counts.approved_localizations, 0);
}

#[tokio::test]
async fn import_without_overwrite_skips_existing_values() {
    let (_dir, store) = fresh_store().await;
    seed(&store).await;
    let exchange = Exchange::new(store.clone());
    let exported = exchange.export_document().await.unwrap();

    // Re-importing over the same store: everything already exists.
    let summary = exchange.import_document(&exported, false).await.unwrap();
    assert_eq!(summary.localizations_written, 0);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.failed(), 0);

    // Existing approvals survive an overwrite-off import.
    let counts = store.counts().await.unwrap();
    assert_eq!(counts.approved_localizations, 3);
}

#[tokio::test]
async fn unknown_key_fails_item_not_run() {
    let (_dir, store) = fresh_store().await;
    seed(&store).await;
    let exchange = Exchange::new(store);

    let mut document = exchange.export_document().await.unwrap();
    document
        .localizations
        .get_mut("en")
        .unwrap()
        .insert("app.missing".into(), "Orphan".into());

    let summary = exchange.import_document(&document, true).await.unwrap();
    assert_eq!(summary.failed(), 1);
    assert!(summary.errors[0].item.contains("app.missing"));
    // The valid items still applied.
    assert_eq!(summary.localizations_written, 3);
}

// ---------------------------------------------------------------------------
// CSV and XLIFF
// ---------------------------------------------------------------------------

#[tokio::test]
async fn csv_has_contract_header_and_preserves_tuples() {
    let (_dir, store) = fresh_store().await;
    seed(&store).await;
    let csv_bytes = Exchange::new(store)
        .export_csv()
        .await
        .unwrap();
    let text = String::from_utf8(csv_bytes).unwrap();
    let mut lines = text.lines();

    assert_eq!(lines.next().unwrap(), "Key,Category,Description,Context,de,en");

    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 2);
    // One row per key, empty string for the missing German error copy.
    assert!(rows.iter().any(|r| r.starts_with("app.error,") && r.ends_with(",An error occurred")));
    assert!(rows.iter().any(|r| r.contains("Willkommen!") && r.contains("Welcome!")));
}

#[tokio::test]
async fn xliff_emits_one_file_per_nonempty_language() {
    let (_dir, store) = fresh_store().await;
    seed(&store).await;
    let xliff = Exchange::new(store)
        .export_xliff()
        .await
        .unwrap();
    let text = String::from_utf8(xliff).unwrap();

    assert!(text.contains(r#"<xliff version="1.2""#));
    assert_eq!(text.matches("<file ").count(), 2);
    assert!(text.contains(r#"target-language="de""#));
    assert!(text.contains(r#"<trans-unit id="app.welcome">"#));
    assert!(text.contains("<source>app.welcome</source>"));
    assert!(text.contains("<target>Willkommen!</target>"));
}

#[tokio::test]
async fn xliff_escapes_markup_in_values() {
    let (_dir, store) = fresh_store().await;
    let en = store
        .create_language(NewLanguage {
            code: "en".into(),
            name: "English".into(),
            native_name: "English".into(),
            is_rtl: false,
            is_active: true,
            is_default: true,
        })
        .await
        .unwrap();
    let key = store
        .create_key(NewKey {
            name: "app.tos".into(),
            category: None,
            description: None,
            context: None,
        })
        .await
        .unwrap();
    store
        .upsert_localization(UpsertLocalization {
            key_id: key.id,
            language_id: en.id,
            value: "Terms & <Conditions>".into(),
            plural_forms: BTreeMap::new(),
            variables: vec![],
            approved: true,
            approved_by: None,
            expected_version: None,
        })
        .await
        .unwrap();

    let xliff = Exchange::new(store)
        .export_xliff()
        .await
        .unwrap();
    let text = String::from_utf8(xliff).unwrap();
    assert!(text.contains("Terms &amp; &lt;Conditions&gt;"));
}
