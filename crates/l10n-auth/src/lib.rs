// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bearer credential handling for the localization catalog service.
//!
//! Credentials are JWTs signed with HMAC-SHA256 over a service-wide secret.
//! The claim schema is fixed: `{username, role, issuedAt, expiresAt}`.
//! The verification predicate is: signature valid ∧ `expiresAt` > now.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// The fixed claim schema carried by every bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject username.
    pub username: String,
    /// Single role assigned to the subject.
    pub role: String,
    /// Issue time, seconds since the Unix epoch.
    #[serde(rename = "issuedAt")]
    pub issued_at: i64,
    /// Expiry time, seconds since the Unix epoch.
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

impl Claims {
    /// Build claims for `username`/`role` valid for `ttl` from `now`.
    pub fn new(username: impl Into<String>, role: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            username: username.into(),
            role: role.into(),
            issued_at: now.timestamp(),
            expires_at: (now + ttl).timestamp(),
        }
    }

    /// Whether the credential has expired as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp()
    }
}

// ---------------------------------------------------------------------------
// AuthError
// ---------------------------------------------------------------------------

/// Failures of the authentication handshake.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is absent or not a bearer scheme.
    #[error("missing bearer credential")]
    MissingCredential,
    /// The token is not a structurally valid JWT for our claim schema.
    #[error("malformed credential: {0}")]
    MalformedCredential(String),
    /// The signature does not verify against the service secret.
    #[error("invalid credential signature")]
    InvalidSignature,
    /// The credential is past its `expiresAt`.
    #[error("credential expired")]
    Expired,
}

// ---------------------------------------------------------------------------
// Authenticator
// ---------------------------------------------------------------------------

/// Signs and verifies bearer credentials and answers the admin predicate.
pub struct Authenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    admin_roles: Vec<String>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("admin_roles", &self.admin_roles)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Create an authenticator over the service-wide secret.
    pub fn new(secret: &[u8], admin_roles: Vec<String>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            admin_roles,
        }
    }

    /// Sign `claims` into a compact token.
    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::MalformedCredential(e.to_string()))
    }

    /// Verify a compact token: HS256 signature plus manual expiry check
    /// against the non-standard `expiresAt` claim name.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // The claim schema uses `expiresAt`, not the registered `exp`, so
        // the library's automatic expiry handling is disabled and the
        // check happens below.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedCredential(e.to_string()),
            },
        )?;

        if data.claims.is_expired(Utc::now()) {
            return Err(AuthError::Expired);
        }
        Ok(data.claims)
    }

    /// Whether the claims' role is one of the configured admin roles.
    pub fn is_admin(&self, claims: &Claims) -> bool {
        self.admin_roles.iter().any(|r| r == &claims.role)
    }
}

// ---------------------------------------------------------------------------
// Header parsing
// ---------------------------------------------------------------------------

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or(AuthError::MissingCredential)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> Authenticator {
        Authenticator::new(b"test-secret", vec!["admin".into(), "owner".into()])
    }

    #[test]
    fn sign_verify_roundtrip() {
        let a = auth();
        let claims = Claims::new("alice", "admin", Duration::hours(1));
        let token = a.sign(&claims).unwrap();
        let back = a.verify(&token).unwrap();
        assert_eq!(back, claims);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let a = auth();
        let other = Authenticator::new(b"other-secret", vec!["admin".into()]);
        let token = a.sign(&Claims::new("alice", "admin", Duration::hours(1))).unwrap();
        match other.verify(&token) {
            Err(AuthError::InvalidSignature) => {}
            other => panic!("expected InvalidSignature, got {other:?}"),
        }
    }

    #[test]
    fn expired_credential_is_rejected() {
        let a = auth();
        let claims = Claims::new("alice", "admin", Duration::seconds(-10));
        let token = a.sign(&claims).unwrap();
        match a.verify(&token) {
            Err(AuthError::Expired) => {}
            other => panic!("expected Expired, got {other:?}"),
        }
    }

    #[test]
    fn garbage_token_is_malformed() {
        match auth().verify("not.a.jwt") {
            Err(AuthError::MalformedCredential(_)) => {}
            other => panic!("expected MalformedCredential, got {other:?}"),
        }
    }

    #[test]
    fn admin_predicate_is_set_membership() {
        let a = auth();
        let admin = Claims::new("alice", "owner", Duration::hours(1));
        let viewer = Claims::new("bob", "viewer", Duration::hours(1));
        assert!(a.is_admin(&admin));
        assert!(!a.is_admin(&viewer));
    }

    #[test]
    fn claims_use_camel_case_wire_names() {
        let claims = Claims::new("alice", "viewer", Duration::hours(1));
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("issuedAt").is_some());
        assert!(json.get("expiresAt").is_some());
        assert!(json.get("issued_at").is_none());
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(parse_bearer("Basic dXNlcg==").is_err());
        assert!(parse_bearer("Bearer ").is_err());
        assert!(parse_bearer("").is_err());
    }
}
