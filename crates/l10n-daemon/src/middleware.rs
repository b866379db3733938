// SPDX-License-Identifier: MIT OR Apache-2.0
//! Middleware stack: request ids, structured request logging, bearer
//! authentication, and the admin-role gate.

use crate::AppState;
use crate::api::ApiError;
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use l10n_auth::{Claims, parse_bearer};
use l10n_error::{CatalogError, Code};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RequestId middleware
// ---------------------------------------------------------------------------

/// A unique request identifier, available as an Axum extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

/// Generate a [`RequestId`] per request and set the `X-Request-Id`
/// response header.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = RequestId(Uuid::new_v4());
    req.extensions_mut().insert(id);
    let mut resp = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id.0.to_string()) {
        resp.headers_mut().insert("x-request-id", value);
    }
    resp
}

// ---------------------------------------------------------------------------
// Request logging
// ---------------------------------------------------------------------------

/// Log method, path, status code, and duration for each request using
/// structured fields.
pub async fn request_logger(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let start = Instant::now();

    let resp = next.run(req).await;

    info!(
        http.method = %method,
        http.path = %path,
        http.status = resp.status().as_u16(),
        http.duration_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );

    resp
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Verify the bearer credential and stash the [`Claims`] as an extension.
///
/// Rejects with 401 and the envelope error body when the header is absent,
/// malformed, forged, or expired.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let claims = match parse_bearer(header).and_then(|token| state.auth.verify(token)) {
        Ok(claims) => claims,
        Err(err) => return ApiError::from(err).into_response(),
    };

    req.extensions_mut().insert(claims);
    next.run(req).await
}

/// Enforce the admin predicate on an already-authenticated request.
///
/// Returns 403 even when the credential is otherwise valid.
pub async fn admin_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(claims) = req.extensions().get::<Claims>() else {
        return ApiError::from(CatalogError::new(Code::Unauthorized, "missing credential"))
            .into_response();
    };
    if !state.auth.is_admin(claims) {
        return ApiError::from(CatalogError::new(
            Code::Forbidden,
            format!("role {:?} is not an admin role", claims.role),
        ))
        .into_response();
    }
    next.run(req).await
}

// ---------------------------------------------------------------------------
// ActorInfo extractor
// ---------------------------------------------------------------------------

/// Extractor bundling the verified identity with the audit-relevant client
/// metadata. Only available behind [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct ActorInfo(pub l10n_engine::Actor);

impl<S> axum::extract::FromRequestParts<S> for ActorInfo
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<Claims>().ok_or_else(|| {
            ApiError::from(CatalogError::new(Code::Unauthorized, "missing credential"))
        })?;
        let client_addr = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let client_agent = parts
            .headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        Ok(ActorInfo(l10n_engine::Actor {
            username: claims.username.clone(),
            client_addr,
            client_agent,
        }))
    }
}
