//! OpenAPI specification definition.
//!
//! Aggregates all route handlers and schemas for OpenAPI documentation
//! generation. The documentation pages are rendered from this document.

use utoipa::{Modify, OpenApi};
#[derive(OpenApi)]
#[openapi(
    paths(
        // Drafts
        crate::routes::drafts::get_drafts,
        crate::routes::drafts::create_drafts,
        crate::routes::drafts::edit_draft,
        crate::routes::drafts::delete_draft,
        // Settings
        crate::routes::settings::update_settings,
        // Authentication
        crate::routes::auth::issue_token,
        crate::routes::auth::refresh_token,
        // Webhooks
        crate::routes::webhooks::phabricator_webhook,
        // Documentation
        crate::routes::docs::list_pages,
        crate::routes::docs::get_page,
        // OpenAPI
        crate::routes::openapi::serve_openapi_json,
        crate::routes::openapi::serve_openapi_yaml,
    ),
    components(schemas(
        crate::models::DraftDict,
        crate::models::DraftType,
        crate::routes::response::JsonSuccess,
        crate::routes::response::JsonError,
        crate::routes::drafts::CreateDraftsForm,
        crate::routes::drafts::EditDraftForm,
        crate::routes::drafts::FetchDraftsResponse,
        crate::routes::drafts::CreateDraftsResponse,
        crate::routes::settings::UpdateSettingsForm,
        crate::routes::auth::RefreshTokenRequest,
        crate::routes::auth::TokenResponse,
        crate::routes::docs::DocsPageSummary,
        crate::routes::docs::DocsIndexResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Drafts", description = "Drafts of unsent messages, synchronized between clients"),
        (name = "Settings", description = "Per-user settings"),
        (name = "Authentication", description = "JWT tokens issued for API key credentials"),
        (name = "Webhooks", description = "Incoming webhook integrations"),
        (name = "Documentation", description = "Rendered API documentation pages"),
        (name = "OpenAPI", description = "OpenAPI specification"),
    ),
    info(
        title = "Drafts API",
        description = "REST API for synchronizing drafts of unsent chat messages",
        version = "1.0.0",
        contact(
            name = "API Support",
            email = "mark@olliver.me.uk"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8081/api/v1", description = "Local development server"),
        (url = "https://api.example.com/api/v1", description = "Production server")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        // Update version to match Cargo.toml version
        openapi.info.version = env!("CARGO_PKG_VERSION").to_string();

        use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::new);
        components.add_security_scheme(
            "basic_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)),
        );
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
