//! Request extractors for caller identity.
//!
//! Customer, vendor and admin routes authenticate with an opaque bearer token
//! issued by the session service; only its SHA-256 is stored. Scheduler routes
//! under `/internal` present a shared secret instead.

use std::ops::Deref;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use sha2::{Digest, Sha256};

use tiffin_lifecycle::constant_time_eq;
use tiffin_types::{Actor, Session};

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the scheduler's shared secret
pub const INTERNAL_TOKEN_HEADER: &str = "x-internal-token";

/// Authenticated marketplace user.
///
/// Rejects with 401 when the bearer token is missing, unknown, expired or
/// revoked.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Actor);

impl Deref for AuthUser {
    type Target = Actor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::NotAuthenticated)?;
        let state = AppState::from_ref(state);

        let Some(row) = state.sessions.find_by_token_hash(&hash_token(token)).await? else {
            tracing::debug!("Unknown bearer token");
            return Err(ApiError::NotAuthenticated);
        };

        let session = Session::try_from(row)?;
        if !session.is_valid_at(Utc::now()) {
            tracing::debug!(session_id = %session.id, "Expired or revoked session");
            return Err(ApiError::NotAuthenticated);
        }

        Ok(Self(session.actor()))
    }
}

/// Caller holding the internal scheduler token
#[derive(Debug, Clone, Copy)]
pub struct InternalCaller;

impl<S> FromRequestParts<S> for InternalCaller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let presented = parts
            .headers
            .get(INTERNAL_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::NotAuthenticated)?;

        if constant_time_eq(presented.as_bytes(), state.config.internal_token.as_bytes()) {
            Ok(Self)
        } else {
            tracing::warn!("Rejected internal call with a bad token");
            Err(ApiError::NotAuthenticated)
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Hex SHA-256 of a bearer token, as stored on the session row
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/subscriptions");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc123"))), Some("abc123"));
        assert_eq!(bearer_token(&parts_with(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&parts_with(Some("Basic abc123"))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn test_hash_token_is_hex_sha256() {
        let hash = hash_token("token");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "3c469e9d6c5875d37a43f353d4f88e61fcf812c66eee3457465a40b0da4153e0"
        );
    }
}
