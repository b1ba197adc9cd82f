//! OpenAPI specification endpoints.
//!
//! Serves the OpenAPI spec as JSON and YAML.

use axum::{Router, http::header, response::IntoResponse, response::Json, routing::get};
use utoipa::OpenApi;

use super::super::openapi::ApiDoc;
use super::app_state::AppState;
use super::error::ApiError;

/// Create the OpenAPI router
pub fn openapi_router() -> Router<AppState> {
    Router::new()
        .route("/openapi.json", get(serve_openapi_json))
        .route("/openapi.yaml", get(serve_openapi_yaml))
}

/// GET /openapi.json - Serve the OpenAPI specification as JSON
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "OpenAPI",
    responses(
        (status = 200, description = "OpenAPI specification", body = Object)
    )
)]
pub async fn serve_openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// GET /openapi.yaml - Serve the OpenAPI specification as YAML
#[utoipa::path(
    get,
    path = "/openapi.yaml",
    tag = "OpenAPI",
    responses(
        (status = 200, description = "OpenAPI specification", body = String, content_type = "application/yaml")
    )
)]
pub async fn serve_openapi_yaml() -> Result<impl IntoResponse, ApiError> {
    let yaml = serde_yaml::to_string(&ApiDoc::openapi())
        .map_err(|e| ApiError::internal(format!("Failed to serialize OpenAPI spec: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, "application/yaml")], yaml))
}
