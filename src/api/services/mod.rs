//! Services module - contains the business logic behind the routes.

pub mod api_ambassador;
pub mod draft_service;
pub mod jwt_service;
pub mod phabricator;
pub mod webhook_service;

// Re-export for convenience
pub use api_ambassador::{ApiTokenAuth, AuthMode, RequestParams, ThirdPartyApiAmbassador};
pub use draft_service::{DraftError, DraftInput, DraftService};
pub use jwt_service::{Claims, JwtService, SharedJwtService, TokenPair, TokenType};
pub use webhook_service::{WebhookError, WebhookRequest, WebhookService};
