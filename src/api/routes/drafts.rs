//! Drafts routes.
//!
//! Parameters are form-encoded; `drafts` and `draft` hold JSON documents.

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::ApiError;
use super::response::{JsonError, JsonSuccess, RESULT_SUCCESS};
use crate::models::{Draft, DraftDict};
use crate::services::{DraftError, DraftService};
use crate::services::draft_service::{parse_draft, parse_draft_list};
use axum::{
    Form, Json, Router,
    extract::{Path, State, rejection::FormRejection},
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

/// Create the drafts router
pub fn drafts_router() -> Router<AppState> {
    Router::new()
        .route("/drafts", get(get_drafts).post(create_drafts))
        .route("/drafts/{draft_id}", patch(edit_draft).delete(delete_draft))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDraftsForm {
    /// A JSON-encoded list containing new draft objects.
    #[schema(example = json!([{
        "type": "stream",
        "to": [1],
        "topic": "questions",
        "content": "What are the contribution guidelines for this project?",
        "timestamp": 1595479019
    }]))]
    pub drafts: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditDraftForm {
    /// A JSON-encoded object containing the replacement draft.
    #[schema(example = json!({
        "type": "stream",
        "to": [1],
        "topic": "questions",
        "content": "how tough is a Lamy Safari?",
        "timestamp": 1595479019
    }))]
    pub draft: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FetchDraftsResponse {
    #[schema(example = "success")]
    pub result: String,
    #[schema(example = "")]
    pub msg: String,
    /// The number of drafts the user currently has.
    pub count: usize,
    /// The user's drafts, oldest edit first.
    pub drafts: Vec<DraftDict>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateDraftsResponse {
    #[schema(example = "success")]
    pub result: String,
    #[schema(example = "")]
    pub msg: String,
    /// The IDs of the newly created drafts, in the order they were submitted.
    pub ids: Vec<i64>,
}

/// GET /drafts - Get drafts
///
/// Fetch all drafts for the current user, ordered by the time they were
/// last edited.
#[utoipa::path(
    get,
    path = "/drafts",
    tag = "Drafts",
    responses(
        (status = 200, description = "The user's drafts", body = FetchDraftsResponse,
            example = json!({
                "result": "success",
                "msg": "",
                "count": 3,
                "drafts": [
                    {
                        "id": 1,
                        "type": "stream",
                        "to": [3],
                        "topic": "sync drafts",
                        "content": "Let's add backend support for syncing drafts.",
                        "timestamp": 1595479019
                    },
                    {
                        "id": 2,
                        "type": "private",
                        "to": [4],
                        "topic": "",
                        "content": "What if we made it possible to sync drafts in Zulip?",
                        "timestamp": 1595479020
                    },
                    {
                        "id": 3,
                        "type": "private",
                        "to": [4, 10],
                        "topic": "",
                        "content": "What if we made it possible to sync drafts in Zulip?",
                        "timestamp": 1595479021
                    }
                ]
            })),
        (status = 400, description = "Drafts syncing is disabled for the user", body = JsonError,
            example = json!({
                "result": "error",
                "msg": "User has not enabled drafts syncing.",
                "code": "BAD_REQUEST"
            })),
        (status = 401, description = "Missing or invalid credentials", body = JsonError)
    ),
    security(("basic_auth" = []), ("bearer_auth" = []))
)]
pub async fn get_drafts(
    auth: AuthContext,
    State(service): State<Arc<DraftService>>,
) -> Result<Json<FetchDraftsResponse>, ApiError> {
    let drafts: Vec<DraftDict> = service
        .fetch_drafts(&auth.user)
        .await?
        .iter()
        .map(Draft::to_dict)
        .collect();

    Ok(Json(FetchDraftsResponse {
        result: RESULT_SUCCESS.to_string(),
        msg: String::new(),
        count: drafts.len(),
        drafts,
    }))
}

/// POST /drafts - Create drafts
///
/// Create one or more drafts on the server. Either every draft in the
/// request is created or, if any of them is invalid, none is.
#[utoipa::path(
    post,
    path = "/drafts",
    tag = "Drafts",
    request_body(
        content = CreateDraftsForm,
        content_type = "application/x-www-form-urlencoded",
        description = "The drafts to create"
    ),
    responses(
        (status = 200, description = "The drafts were created", body = CreateDraftsResponse,
            example = json!({
                "result": "success",
                "msg": "",
                "ids": [1, 2, 3]
            })),
        (status = 400, description = "A draft was invalid", body = JsonError,
            example = json!({
                "result": "error",
                "msg": "Invalid stream id",
                "code": "BAD_REQUEST"
            })),
        (status = 401, description = "Missing or invalid credentials", body = JsonError)
    ),
    security(("basic_auth" = []), ("bearer_auth" = []))
)]
pub async fn create_drafts(
    auth: AuthContext,
    State(service): State<Arc<DraftService>>,
    form: Result<Form<CreateDraftsForm>, FormRejection>,
) -> Result<Json<CreateDraftsResponse>, ApiError> {
    let Form(form) = form.map_err(|_| ApiError::missing_argument("drafts"))?;
    let inputs = parse_draft_list(&form.drafts, "drafts")?;
    let created = service.create_drafts(&inputs, &auth.user).await?;

    Ok(Json(CreateDraftsResponse {
        result: RESULT_SUCCESS.to_string(),
        msg: String::new(),
        ids: created.iter().map(|draft| draft.id).collect(),
    }))
}

/// PATCH /drafts/{draft_id} - Edit a draft
///
/// Replace the contents of one of the user's drafts. The draft keeps its
/// ID; every other field is taken from the new draft object.
#[utoipa::path(
    patch,
    path = "/drafts/{draft_id}",
    tag = "Drafts",
    params(
        ("draft_id" = i64, Path, description = "The ID of the draft to be edited.", example = 2)
    ),
    request_body(
        content = EditDraftForm,
        content_type = "application/x-www-form-urlencoded",
        description = "The new contents of the draft"
    ),
    responses(
        (status = 200, description = "The draft was updated", body = JsonSuccess,
            example = json!({"result": "success", "msg": ""})),
        (status = 400, description = "The draft argument was malformed", body = JsonError),
        (status = 401, description = "Missing or invalid credentials", body = JsonError),
        (status = 404, description = "No such draft, or the new contents were rejected", body = JsonError,
            example = json!({
                "result": "error",
                "msg": "Draft does not exist",
                "code": "BAD_REQUEST"
            }))
    ),
    security(("basic_auth" = []), ("bearer_auth" = []))
)]
pub async fn edit_draft(
    auth: AuthContext,
    State(service): State<Arc<DraftService>>,
    Path(draft_id): Path<i64>,
    form: Result<Form<EditDraftForm>, FormRejection>,
) -> Result<Json<JsonSuccess>, ApiError> {
    let Form(form) = form.map_err(|_| ApiError::missing_argument("draft"))?;
    let input = parse_draft(&form.draft, "draft")?;
    // Once the draft parses, a rejected edit is reported like a missing draft.
    service
        .edit_draft(draft_id, &input, &auth.user)
        .await
        .map_err(|e| match e {
            DraftError::Invalid(message) => ApiError::not_found(message),
            other => other.into(),
        })?;
    Ok(Json(JsonSuccess::new()))
}

/// DELETE /drafts/{draft_id} - Delete a draft
///
/// Delete a single draft from the server.
#[utoipa::path(
    delete,
    path = "/drafts/{draft_id}",
    tag = "Drafts",
    params(
        ("draft_id" = i64, Path, description = "The ID of the draft you want to delete.", example = 1)
    ),
    responses(
        (status = 200, description = "The draft was deleted", body = JsonSuccess,
            example = json!({"result": "success", "msg": ""})),
        (status = 401, description = "Missing or invalid credentials", body = JsonError),
        (status = 404, description = "No such draft", body = JsonError,
            example = json!({
                "result": "error",
                "msg": "Draft does not exist",
                "code": "BAD_REQUEST"
            }))
    ),
    security(("basic_auth" = []), ("bearer_auth" = []))
)]
pub async fn delete_draft(
    auth: AuthContext,
    State(service): State<Arc<DraftService>>,
    Path(draft_id): Path<i64>,
) -> Result<Json<JsonSuccess>, ApiError> {
    service.delete_draft(draft_id, &auth.user).await?;
    info!("User {} deleted draft {}", auth.user.id, draft_id);
    Ok(Json(JsonSuccess::new()))
}
