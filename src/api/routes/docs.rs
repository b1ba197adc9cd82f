//! Rendered API documentation pages.

use super::app_state::AppState;
use super::error::ApiError;
use super::response::{JsonError, RESULT_SUCCESS};
use crate::docs::{PAGES, Renderer};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Create the docs router
pub fn docs_router() -> Router<AppState> {
    Router::new()
        .route("/docs", get(list_pages))
        .route("/docs/{page}", get(get_page))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocsPageSummary {
    #[schema(example = "get-drafts")]
    pub slug: String,
    #[schema(example = "Get drafts")]
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocsIndexResponse {
    #[schema(example = "success")]
    pub result: String,
    #[schema(example = "")]
    pub msg: String,
    pub pages: Vec<DocsPageSummary>,
}

/// GET /docs - List documentation pages
#[utoipa::path(
    get,
    path = "/docs",
    tag = "Documentation",
    responses(
        (status = 200, description = "The available pages", body = DocsIndexResponse)
    )
)]
pub async fn list_pages() -> Json<DocsIndexResponse> {
    Json(DocsIndexResponse {
        result: RESULT_SUCCESS.to_string(),
        msg: String::new(),
        pages: PAGES
            .iter()
            .map(|page| DocsPageSummary {
                slug: page.slug.to_string(),
                title: page.title.to_string(),
            })
            .collect(),
    })
}

/// GET /docs/{page} - Render a documentation page
///
/// Returns the page's markdown with every macro expanded.
#[utoipa::path(
    get,
    path = "/docs/{page}",
    tag = "Documentation",
    params(
        ("page" = String, Path, description = "The page slug.", example = "get-drafts")
    ),
    responses(
        (status = 200, description = "The rendered page", body = String, content_type = "text/markdown"),
        (status = 404, description = "No such page", body = JsonError)
    )
)]
pub async fn get_page(
    State(renderer): State<Arc<Renderer>>,
    Path(page): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rendered = renderer.render_page(&page)?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        rendered,
    ))
}
