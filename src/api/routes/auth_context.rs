//! Authentication context extractor.
//!
//! Requests authenticate with `Authorization: Basic base64(email:api_key)`
//! or with `Authorization: Bearer <jwt>` issued by `POST /auth/token`.

use super::app_state::AppState;
use super::error::ApiError;
use crate::models::UserProfile;
use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::{Basic, Bearer};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    ApiKey,
    Jwt,
}

/// The authenticated user behind a request.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user: UserProfile,
    pub method: AuthMethod,
}

fn check_active(user: Option<UserProfile>) -> Result<UserProfile, ApiError> {
    match user {
        Some(user) if user.is_active => Ok(user),
        Some(_) => Err(ApiError::unauthorized("Account is deactivated")),
        None => Err(ApiError::unauthorized("Invalid API key")),
    }
}

/// Look up the user owning `email` and check the API key.
pub async fn authenticate_api_key(
    state: &AppState,
    email: &str,
    api_key: &str,
) -> Result<UserProfile, ApiError> {
    let user = state
        .storage
        .get_user_by_email(email)
        .await?
        .filter(|user| user.api_key == api_key);
    if user.is_none() {
        warn!("Rejected API key for {}", email);
    }
    check_active(user)
}

async fn authenticate_jwt(state: &AppState, token: &str) -> Result<UserProfile, ApiError> {
    let claims = state.jwt.validate_access_token(token).map_err(|e| {
        warn!("JWT validation failed: {}", e);
        ApiError::unauthorized(e)
    })?;
    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("Invalid subject claim"))?;
    check_active(state.storage.get_user(user_id).await?)
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            warn!("No authorization header provided");
            return Err(ApiError::unauthorized("Missing 'Authorization' header."));
        }

        if let Ok(TypedHeader(Authorization(basic))) =
            parts.extract::<TypedHeader<Authorization<Basic>>>().await
        {
            let user = authenticate_api_key(state, basic.username(), basic.password()).await?;
            return Ok(AuthContext {
                user,
                method: AuthMethod::ApiKey,
            });
        }
        if let Ok(TypedHeader(Authorization(bearer))) =
            parts.extract::<TypedHeader<Authorization<Bearer>>>().await
        {
            let user = authenticate_jwt(state, bearer.token()).await?;
            return Ok(AuthContext {
                user,
                method: AuthMethod::Jwt,
            });
        }
        Err(ApiError::unauthorized(
            "This endpoint requires HTTP basic authentication.",
        ))
    }
}
