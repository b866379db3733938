// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP and WebSocket surface for the localization catalog service.
//!
//! Handlers are thin adapters over the catalog engine: they authenticate,
//! enforce the admin predicate, attach per-operation deadlines, consult the
//! cache, and map engine errors onto the wire taxonomy. Everything else
//! lives below.

#![deny(unsafe_code)]

pub mod api;
mod handlers;
mod handlers_admin;
pub mod middleware;
mod ws;

pub use api::{ApiError, Envelope};

use axum::routing::{delete, get, post, put};
use axum::{Router, middleware::from_fn, middleware::from_fn_with_state};
use l10n_auth::Authenticator;
use l10n_config::ServiceConfig;
use l10n_engine::CatalogEngine;
use l10n_exchange::Exchange;
use l10n_subscribe::SubscriptionManager;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared state carried by every handler.
pub struct AppState {
    /// The catalog engine (store, cache, and bus hang off it).
    pub engine: Arc<CatalogEngine>,
    /// Import/export engine.
    pub exchange: Arc<Exchange>,
    /// Credential verification and the admin predicate.
    pub auth: Arc<Authenticator>,
    /// Streaming subscriber registry.
    pub subscriptions: Arc<SubscriptionManager>,
    /// Resolved service configuration.
    pub config: Arc<ServiceConfig>,
}

/// Build the Axum router with all service routes.
pub fn build_app(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/languages", post(handlers_admin::create_language))
        .route(
            "/languages/{id}",
            put(handlers_admin::update_language).delete(handlers_admin::delete_language),
        )
        .route("/keys", post(handlers_admin::create_key))
        .route(
            "/keys/{id}",
            put(handlers_admin::update_key).delete(handlers_admin::delete_key),
        )
        .route(
            "/localizations",
            post(handlers_admin::edit_localization).get(handlers_admin::list_localizations),
        )
        .route(
            "/localizations/{id}",
            put(handlers_admin::update_localization).delete(handlers_admin::delete_localization),
        )
        .route(
            "/localizations/{id}/approve",
            post(handlers_admin::approve_localization),
        )
        .route("/localizations/batch", post(handlers_admin::batch_upsert))
        .route("/import", post(handlers_admin::import))
        .route("/export", get(handlers_admin::export))
        .route("/version/create", post(handlers_admin::create_version))
        .route("/version/{version}", delete(handlers_admin::delete_version))
        .route("/cache/invalidate", post(handlers_admin::invalidate_cache))
        .route("/stats", get(handlers_admin::stats))
        .route("/audit", get(handlers_admin::audit_log))
        .layer(from_fn_with_state(
            Arc::clone(&state),
            middleware::admin_middleware,
        ));

    let authed = Router::new()
        .route("/catalog/{language}", get(handlers::get_catalog))
        .route("/localize/{key}", get(handlers::localize_one))
        .route("/localize/batch", post(handlers::localize_batch))
        .route("/languages", get(handlers::list_languages))
        .route("/keys", get(handlers::list_keys))
        .route("/version/current", get(handlers::current_version))
        .route("/version/history", get(handlers::version_history))
        .route("/version/{version}", get(handlers::get_version))
        .route(
            "/version/{version}/catalog/{language}",
            get(handlers::versioned_catalog),
        )
        .route("/events", get(ws::events_handler))
        .nest("/admin", admin)
        .layer(from_fn_with_state(
            Arc::clone(&state),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/v1", authed)
        .layer(CorsLayer::permissive())
        .layer(from_fn(middleware::request_logger))
        .layer(from_fn(middleware::request_id_middleware))
        .with_state(state)
}
