// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP surface tests: auth, envelope, and the end-to-end scenarios.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::Duration;
use http_body_util::BodyExt;
use l10n_auth::{Authenticator, Claims};
use l10n_bus::EventBus;
use l10n_cache::{LayeredCache, LocalCache};
use l10n_config::ServiceConfig;
use l10n_daemon::{AppState, build_app};
use l10n_engine::CatalogEngine;
use l10n_exchange::Exchange;
use l10n_store::{CatalogStore, SqliteStore};
use l10n_subscribe::SubscriptionManager;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SECRET: &[u8] = b"api-test-secret";

async fn test_state(dir: &tempfile::TempDir) -> Arc<AppState> {
    let url = format!("sqlite://{}/l10n.db", dir.path().display());
    let store: Arc<dyn CatalogStore> = Arc::new(SqliteStore::connect(&url).await.unwrap());
    let cache = Arc::new(LayeredCache::new(LocalCache::new(256, 64 * 1024), None));
    let bus = Arc::new(EventBus::new());
    let engine = Arc::new(CatalogEngine::new(Arc::clone(&store), cache, Arc::clone(&bus)));
    let subscriptions = Arc::new(SubscriptionManager::new(16));
    tokio::spawn(Arc::clone(&subscriptions).run(bus));

    let config = ServiceConfig {
        jwt_secret: String::from_utf8_lossy(SECRET).into_owned(),
        ..Default::default()
    };

    Arc::new(AppState {
        engine,
        exchange: Arc::new(Exchange::new(store)),
        auth: Arc::new(Authenticator::new(SECRET, vec!["admin".into()])),
        subscriptions,
        config: Arc::new(config),
    })
}

fn token(role: &str) -> String {
    Authenticator::new(SECRET, vec!["admin".into()])
        .sign(&Claims::new("tester", role, Duration::hours(1)))
        .unwrap()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header("authorization", format!("Bearer {bearer}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Seed an English default language with one approved welcome message.
async fn seed_welcome(app: &Router, admin: &str) {
    let (status, _) = send(
        app,
        Method::POST,
        "/v1/admin/languages",
        Some(admin),
        Some(json!({"code": "en", "name": "English", "is_default": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        app,
        Method::POST,
        "/v1/admin/keys",
        Some(admin),
        Some(json!({"name": "app.welcome", "category": "app"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        app,
        Method::POST,
        "/v1/admin/localizations",
        Some(admin),
        Some(json!({
            "key": "app.welcome",
            "language": "en",
            "value": "Welcome!",
            "approved": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Health and auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_public_and_reports_checks() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["checks"]["database"], "ok");
    assert_eq!(body["checks"]["cache"], "disabled");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn missing_credential_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);

    let (status, body) = send(&app, Method::GET, "/v1/languages", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn forged_credential_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);

    let forged = Authenticator::new(b"other-secret", vec!["admin".into()])
        .sign(&Claims::new("intruder", "admin", Duration::hours(1)))
        .unwrap();
    let (status, _) = send(&app, Method::GET, "/v1/languages", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_non_admin_is_forbidden_on_admin_surface() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let viewer = token("viewer");

    // Reads are fine...
    let (status, _) = send(&app, Method::GET, "/v1/languages", Some(&viewer), None).await;
    assert_eq!(status, StatusCode::OK);

    // ...but the admin surface answers 403 even with a valid credential.
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/admin/languages",
        Some(&viewer),
        Some(json!({"code": "en", "name": "English"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

// ---------------------------------------------------------------------------
// Scenario: create and resolve
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_and_resolve_welcome() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/localize/app.welcome?language=en",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["value"], "Welcome!");
    assert_eq!(body["data"]["approved"], true);
    assert_eq!(body["data"]["language"], "en");
}

#[tokio::test]
async fn localize_requires_language_parameter() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");

    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/localize/app.welcome",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn unresolvable_key_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    let (status, _) = send(
        &app,
        Method::GET,
        "/v1/localize/app.nope?language=en",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Scenario: fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fallback_serves_default_language() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/admin/languages",
        Some(&admin),
        Some(json!({"code": "de", "name": "German", "native_name": "Deutsch"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/localize/app.welcome?language=de&fallback=true",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["language"], "en");
    assert_eq!(body["data"]["value"], "Welcome!");

    // Without fallback the German lookup misses.
    let (status, _) = send(
        &app,
        Method::GET,
        "/v1/localize/app.welcome?language=de&fallback=false",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_omits_unknown_keys() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/localize/batch",
        Some(&admin),
        Some(json!({"language": "en", "keys": ["app.welcome", "app.unknown"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["localizations"]["app.welcome"], "Welcome!");
    assert!(body["data"]["localizations"].get("app.unknown").is_none());
}

// ---------------------------------------------------------------------------
// Catalog and cache coherence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn catalog_carries_version_and_checksum() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    let (status, body) = send(&app, Method::GET, "/v1/catalog/en", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["language"], "en");
    assert_eq!(body["data"]["version"], 1);
    assert_eq!(body["data"]["catalog"]["app.welcome"], "Welcome!");
    assert_eq!(body["data"]["checksum"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn catalog_reflects_edits_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    // Prime the cache.
    let (_, first) = send(&app, Method::GET, "/v1/catalog/en", Some(&admin), None).await;
    assert_eq!(first["data"]["catalog"]["app.welcome"], "Welcome!");

    // Edit, then read again: no stale bytes allowed.
    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/admin/localizations",
        Some(&admin),
        Some(json!({
            "key": "app.welcome",
            "language": "en",
            "value": "Hello!",
            "approved": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, second) = send(&app, Method::GET, "/v1/catalog/en", Some(&admin), None).await;
    assert_eq!(second["data"]["catalog"]["app.welcome"], "Hello!");
    assert_ne!(second["data"]["checksum"], first["data"]["checksum"]);
}

#[tokio::test]
async fn unknown_language_catalog_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");

    let (status, _) = send(&app, Method::GET, "/v1/catalog/xx", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Optimistic concurrency over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stale_expected_version_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    let edit = |value: &str| {
        json!({
            "key": "app.welcome",
            "language": "en",
            "value": value,
            "approved": true,
            "expected_version": 1,
        })
    };

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/admin/localizations",
        Some(&admin),
        Some(edit("Hello!")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/admin/localizations",
        Some(&admin),
        Some(edit("Howdy!")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn versioned_catalog_is_frozen() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/admin/version/create",
        Some(&admin),
        Some(json!({"version_type": "minor", "description": "first cut"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["number"], "0.1.0");

    // Mutate the live catalog.
    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/admin/localizations",
        Some(&admin),
        Some(json!({"key": "app.welcome", "language": "en", "value": "Hello!", "approved": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The frozen view still serves the old value...
    let (status, frozen) = send(
        &app,
        Method::GET,
        "/v1/version/0.1.0/catalog/en",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(frozen["data"]["catalog"]["app.welcome"], "Welcome!");

    // ...while the current catalog moved on.
    let (_, current) = send(&app, Method::GET, "/v1/catalog/en", Some(&admin), None).await;
    assert_eq!(current["data"]["catalog"]["app.welcome"], "Hello!");
}

#[tokio::test]
async fn current_version_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    let (status, _) = send(&app, Method::GET, "/v1/version/current", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for bump in ["major", "patch"] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/admin/version/create",
            Some(&admin),
            Some(json!({"version_type": bump})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, current) = send(&app, Method::GET, "/v1/version/current", Some(&admin), None).await;
    assert_eq!(current["data"]["number"], "1.0.1");

    let (_, history) = send(&app, Method::GET, "/v1/version/history", Some(&admin), None).await;
    assert_eq!(history["data"]["versions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn deleting_current_version_is_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/admin/version/create",
        Some(&admin),
        Some(json!({"version_type": "major"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::DELETE,
        "/v1/admin/version/1.0.0",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn invalid_version_type_is_validation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/admin/version/create",
        Some(&admin),
        Some(json!({"version_type": "gigantic"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
}

// ---------------------------------------------------------------------------
// Import / export round-trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn export_import_roundtrip_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    let (status, exported) =
        send(&app, Method::GET, "/v1/admin/export?format=json", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(exported["languages"][0]["code"], "en");

    // Import the export into a clean instance.
    let dir_b = tempfile::tempdir().unwrap();
    let app_b = build_app(test_state(&dir_b).await);
    let (status, summary) = send(
        &app_b,
        Method::POST,
        "/v1/admin/import?overwrite=true",
        Some(&admin),
        Some(exported.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["data"]["localizations_written"], 1);
    assert_eq!(summary["data"]["errors"].as_array().unwrap().len(), 0);

    let (_, reexported) =
        send(&app_b, Method::GET, "/v1/admin/export?format=json", Some(&admin), None).await;
    assert_eq!(exported, reexported);
}

#[tokio::test]
async fn csv_and_xliff_exports_have_contract_shapes() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir).await;
    let app = build_app(Arc::clone(&state));
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/v1/admin/export?format=csv")
        .header("authorization", format!("Bearer {admin}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let csv = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(csv.to_vec()).unwrap();
    assert!(text.starts_with("Key,Category,Description,Context,en"));
    assert!(text.contains("app.welcome"));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/v1/admin/export?format=xliff")
        .header("authorization", format!("Bearer {admin}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let xliff = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(xliff.to_vec()).unwrap();
    assert!(text.contains(r#"<xliff version="1.2""#));
    assert!(text.contains(r#"<trans-unit id="app.welcome">"#));
}

// ---------------------------------------------------------------------------
// Stats and audit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_report_real_counts() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    let (status, body) = send(&app, Method::GET, "/v1/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["languages"], 1);
    assert_eq!(body["data"]["keys"], 1);
    assert_eq!(body["data"]["localizations"], 1);
    assert_eq!(body["data"]["approved_localizations"], 1);
}

#[tokio::test]
async fn admin_mutations_are_audited() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(test_state(&dir).await);
    let admin = token("admin");
    seed_welcome(&app, &admin).await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/admin/audit?entity_type=localization",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["operation"], "create");
    assert_eq!(records[0]["actor"], "tester");
}
