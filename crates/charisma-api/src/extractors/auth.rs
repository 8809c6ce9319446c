//! Bearer-token extractors.
//!
//! [`AuthUser`] reads the `Authorization` header only. [`StreamAuth`] also
//! accepts a `?token=` query parameter, since browser `EventSource` clients
//! cannot set headers.

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;

use charisma_core::error::AppError;
use charisma_core::types::id::UserId;
use charisma_entity::user::UserRole;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller available in handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: UserId,
    pub role: UserRole,
}

impl AuthUser {
    fn from_token(state: &AppState, token: &str) -> Result<Self, AppError> {
        let claims = state.jwt_decoder.decode(token)?;
        Ok(Self {
            user_id: claims.user_id(),
            role: claims.role,
        })
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AppError::authentication("Invalid Authorization header"))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::authentication("Invalid Authorization header format"))?;
    Ok(Some(token.trim()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;
        Ok(Self::from_token(state, token)?)
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Caller of the event stream. Header first, then `?token=`.
#[derive(Debug, Clone, Copy)]
pub struct StreamAuth(pub AuthUser);

impl FromRequestParts<AppState> for StreamAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(parts)? {
            return Ok(Self(AuthUser::from_token(state, token)?));
        }

        let Query(query) = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .map_err(|e| AppError::validation(format!("Invalid query string: {e}")))?;
        let token = query
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::authentication("Missing stream token"))?;
        Ok(Self(AuthUser::from_token(state, &token)?))
    }
}
