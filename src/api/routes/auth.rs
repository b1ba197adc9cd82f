//! Token routes.
//!
//! Clients authenticated with their API key can exchange it for JWT tokens:
//! - Time-scoped access tokens (15 minutes)
//! - Refresh tokens for session renewal (7 days)

use super::app_state::AppState;
use super::auth_context::{AuthContext, AuthMethod};
use super::error::ApiError;
use super::response::{JsonError, RESULT_SUCCESS};
use crate::services::TokenPair;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

/// Create the auth router
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/token", post(issue_token))
        .route("/auth/refresh", post(refresh_token))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    #[schema(example = "success")]
    pub result: String,
    #[schema(example = "")]
    pub msg: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp after which the access token is rejected.
    pub access_token_expires_at: i64,
    pub refresh_token_expires_at: i64,
    #[schema(example = "Bearer")]
    pub token_type: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            result: RESULT_SUCCESS.to_string(),
            msg: String::new(),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            access_token_expires_at: pair.access_token_expires_at,
            refresh_token_expires_at: pair.refresh_token_expires_at,
            token_type: pair.token_type,
        }
    }
}

/// POST /auth/token - Issue tokens
///
/// Exchange HTTP basic credentials (email and API key) for an access and
/// refresh token pair.
#[utoipa::path(
    post,
    path = "/auth/token",
    tag = "Authentication",
    responses(
        (status = 200, description = "Tokens issued", body = TokenResponse),
        (status = 400, description = "Tokens cannot be used to obtain tokens", body = JsonError),
        (status = 401, description = "Missing or invalid credentials", body = JsonError)
    ),
    security(("basic_auth" = []))
)]
pub async fn issue_token(
    auth: AuthContext,
    State(state): State<AppState>,
) -> Result<Json<TokenResponse>, ApiError> {
    if auth.method != AuthMethod::ApiKey {
        return Err(ApiError::bad_request(
            "Tokens can only be issued for API key credentials",
        ));
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    let pair = state
        .jwt
        .generate_token_pair(
            auth.user.id,
            &auth.user.email,
            auth.user.realm_id,
            &session_id,
        )
        .map_err(ApiError::internal)?;
    info!("Issued tokens for user {}", auth.user.id);
    Ok(Json(pair.into()))
}

/// POST /auth/refresh - Refresh tokens
///
/// Exchange a refresh token for a new token pair in the same session.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Authentication",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = TokenResponse),
        (status = 401, description = "Invalid or expired refresh token", body = JsonError)
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    request: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = request.map_err(|_| ApiError::missing_argument("refresh_token"))?;

    let claims = state
        .jwt
        .validate_refresh_token(&request.refresh_token)
        .map_err(|e| {
            warn!("Invalid refresh token: {}", e);
            ApiError::unauthorized(e)
        })?;

    // The account may have been deactivated since the token was issued.
    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("Invalid subject claim"))?;
    match state.storage.get_user(user_id).await? {
        Some(user) if user.is_active => {}
        _ => return Err(ApiError::unauthorized("Account is deactivated")),
    }

    let pair = state
        .jwt
        .refresh_access_token(&request.refresh_token)
        .map_err(ApiError::unauthorized)?;
    info!("Refreshed tokens for session {}", claims.session_id);
    Ok(Json(pair.into()))
}
