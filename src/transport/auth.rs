//! Bearer token authentication for both endpoints.
//!
//! The token may arrive as `Authorization: Bearer <jwt>` or, for clients
//! that cannot set headers on a streaming request, as `?token=<jwt>`. Both
//! resolve to the same `AuthUser`. When a header is present it wins and the
//! query parameter is ignored.

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::http::AppState;
use crate::persistence::UserId;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// The authenticated principal of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: UserId,
}

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Signs a token for `user_id` valid for `ttl`.
pub fn issue_token(
    secret: &str,
    user_id: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

/// Pulls the raw token out of the request, header first.
fn extract_token(parts: &Parts) -> Result<String, AppError> {
    if let Some(header) = parts.headers.get(AUTHORIZATION) {
        let value = header.to_str().map_err(|_| AppError::Unauthenticated)?;
        let token = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .ok_or(AppError::Unauthenticated)?;
        return Ok(token.trim().to_string());
    }

    let Query(query) =
        Query::<TokenQuery>::try_from_uri(&parts.uri).map_err(|_| AppError::Unauthenticated)?;
    query
        .token
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthenticated)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;
        let claims = verify_token(state.jwt_secret(), &token).map_err(|e| {
            warn!(error = %e, path = %parts.uri.path(), "rejected token");
            AppError::Unauthenticated
        })?;
        if claims.sub.is_empty() {
            return Err(AppError::Unauthenticated);
        }
        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}
