//! API routes module - organizes all route handlers.
//!
//! Everything here is mounted under /api/v1 by the binary.

pub mod app_state;
pub mod auth;
pub mod auth_context;
pub mod docs;
pub mod drafts;
pub mod error;
pub mod openapi;
pub mod response;
pub mod settings;
pub mod webhooks;

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

pub use app_state::AppState;
pub use error::ApiError;

/// Create the main API router combining all route modules
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .merge(drafts::drafts_router())
        .merge(settings::settings_router())
        .merge(auth::auth_router())
        .merge(webhooks::webhooks_router())
        .merge(docs::docs_router())
        // OpenAPI documentation endpoints
        .merge(openapi::openapi_router())
        .route("/health", get(health_check))
    // Note: State is applied by callers who need it (e.g., TestServer)
}

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
