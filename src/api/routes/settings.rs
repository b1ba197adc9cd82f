//! User settings routes.

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::ApiError;
use super::response::{JsonError, JsonSuccess};
use crate::services::DraftService;
use axum::{
    Form, Json, Router,
    extract::{State, rejection::FormRejection},
    routing::patch,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

/// Create the settings router
pub fn settings_router() -> Router<AppState> {
    Router::new().route("/settings", patch(update_settings))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSettingsForm {
    /// A JSON-encoded boolean. Whether drafts are synchronized to the
    /// server. Turning it off deletes every draft stored for the user.
    #[schema(example = true)]
    pub enable_drafts_synchronization: Option<String>,
}

fn parse_bool_argument(name: &str, raw: &str) -> Result<bool, ApiError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|_| ApiError::bad_request(format!("Argument \"{}\" is not valid JSON.", name)))?;
    value
        .as_bool()
        .ok_or_else(|| ApiError::bad_request(format!("{} is not a boolean", name)))
}

/// PATCH /settings - Update settings
///
/// Change the current user's settings. Parameters that are not sent keep
/// their current value.
#[utoipa::path(
    patch,
    path = "/settings",
    tag = "Settings",
    request_body(
        content = UpdateSettingsForm,
        content_type = "application/x-www-form-urlencoded",
        description = "The settings to change"
    ),
    responses(
        (status = 200, description = "Settings updated", body = JsonSuccess,
            example = json!({"result": "success", "msg": ""})),
        (status = 400, description = "A parameter was invalid", body = JsonError,
            example = json!({
                "result": "error",
                "msg": "enable_drafts_synchronization is not a boolean",
                "code": "BAD_REQUEST"
            })),
        (status = 401, description = "Missing or invalid credentials", body = JsonError)
    ),
    security(("basic_auth" = []), ("bearer_auth" = []))
)]
pub async fn update_settings(
    auth: AuthContext,
    State(drafts): State<Arc<DraftService>>,
    form: Result<Form<UpdateSettingsForm>, FormRejection>,
) -> Result<Json<JsonSuccess>, ApiError> {
    let Form(form) = form.map_err(|rejection| {
        warn!("Rejected settings update: {}", rejection.body_text());
        ApiError::bad_request(rejection.body_text())
    })?;

    if let Some(raw) = form.enable_drafts_synchronization.as_deref() {
        if parse_bool_argument("enable_drafts_synchronization", raw)? {
            drafts.enable_drafts_syncing(&auth.user).await?;
        } else {
            drafts.disable_drafts_syncing(&auth.user).await?;
        }
    }
    Ok(Json(JsonSuccess::new()))
}
