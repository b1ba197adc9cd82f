//! Incoming webhook routes.
//!
//! Integrations authenticate with the bot's API key in the `api_key` query
//! parameter.

use super::app_state::AppState;
use super::error::ApiError;
use super::response::{JsonError, JsonSuccess};
use crate::models::UserProfile;
use crate::services::phabricator::{self, PhabricatorOutcome};
use crate::services::webhook_service::standardize_headers;
use crate::services::{WebhookRequest, WebhookService};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{OriginalUri, Query, State},
    http::HeaderMap,
    routing::post,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use utoipa::IntoParams;

/// Create the webhooks router
pub fn webhooks_router() -> Router<AppState> {
    Router::new().route("/external/phabricator", post(phabricator_webhook))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WebhookQuery {
    /// The API key of the incoming webhook bot.
    pub api_key: Option<String>,
    /// The stream to send to. Without it, messages go privately to the bot's owner.
    pub stream: Option<String>,
    /// Replaces the topic the integration would choose.
    pub topic: Option<String>,
}

/// Find the active bot that owns `api_key`.
async fn authenticate_bot(
    service: &WebhookService,
    api_key: Option<&str>,
) -> Result<UserProfile, ApiError> {
    let api_key = api_key.ok_or_else(|| ApiError::missing_argument("api_key"))?;
    let user = service
        .storage()
        .get_user_by_api_key(api_key)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::unauthorized("Invalid API key"))?;
    if !user.is_bot {
        warn!("User {} tried to use a webhook endpoint", user.id);
        return Err(ApiError::bad_request(
            "This API is only available to incoming webhook bots.",
        ));
    }
    Ok(user)
}

fn webhook_request(
    bot: UserProfile,
    uri: &OriginalUri,
    query: WebhookQuery,
    headers: &HeaderMap,
) -> WebhookRequest {
    let standardized = standardize_headers(
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    );
    WebhookRequest {
        bot,
        path: uri.path().to_string(),
        stream: query.stream,
        topic: query.topic,
        headers: standardized,
    }
}

/// POST /external/phabricator - Phabricator webhook
///
/// Receives Phabricator's Firehose webhook. Commit events are resolved
/// through the Conduit API and reported to the configured stream; other
/// event types are accepted and ignored.
#[utoipa::path(
    post,
    path = "/external/phabricator",
    tag = "Webhooks",
    params(WebhookQuery),
    request_body(content = Object, description = "Phabricator Firehose payload"),
    responses(
        (status = 200, description = "Event processed", body = JsonSuccess,
            example = json!({"result": "success", "msg": ""})),
        (status = 400, description = "The payload or the bot's configuration was invalid", body = JsonError,
            example = json!({
                "result": "error",
                "msg": "The \"Phabricator Bot\" bot was not setup as a Phabricator integration bot.",
                "code": "BAD_REQUEST"
            })),
        (status = 401, description = "Invalid API key", body = JsonError)
    )
)]
pub async fn phabricator_webhook(
    State(service): State<Arc<WebhookService>>,
    uri: OriginalUri,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<JsonSuccess>, ApiError> {
    let bot = authenticate_bot(&service, query.api_key.as_deref()).await?;

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!("Invalid JSON for bot {}: {}", bot.id, e);
            service
                .notify_bot_owner_about_invalid_json(&bot, phabricator::INTEGRATION_NAME)
                .await?;
            return Err(ApiError::bad_request("Malformed JSON"));
        }
    };

    let request = webhook_request(bot, &uri, query, &headers);
    match phabricator::handle_event(&service, &request, &payload).await? {
        PhabricatorOutcome::Ignored { event_type } => {
            debug!("Ignoring Phabricator event of type {}", event_type);
        }
        PhabricatorOutcome::Sent { subject, .. } => {
            debug!("Phabricator event reported under {}", subject);
        }
    }
    Ok(Json(JsonSuccess::new()))
}
