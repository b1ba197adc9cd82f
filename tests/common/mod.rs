//! Shared fixtures for the test suites: a seeded in-memory backend and a
//! TestServer serving the API under /api/v1.
#![allow(dead_code)]

use axum::Router;
use axum::http::{HeaderName, HeaderValue, header::AUTHORIZATION};
use axum_test::TestServer;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use drafts_api::config::AppConfig;
use drafts_api::routes::{self, AppState};
use drafts_api::services::JwtService;
use drafts_api::storage::SeedData;

pub const JWT_SECRET: &str = "test-secret-key-that-is-at-least-32-bytes";

pub const HAMLET: (&str, &str) = ("hamlet@zulip.example", "hamlet-api-key");
pub const OTHELLO: (&str, &str) = ("othello@zulip.example", "othello-api-key");
pub const FORMER_USER: (&str, &str) = ("former@zulip.example", "former-api-key");
pub const PHABRICATOR_BOT_KEY: &str = "phabricator-bot-api-key";
pub const UNCONFIGURED_BOT_KEY: &str = "webhook-bot-api-key";

pub const SEED: &str = r#"
users:
  - id: 1
    realm_id: 1
    email: hamlet@zulip.example
    full_name: King Hamlet
    api_key: hamlet-api-key
  - id: 2
    realm_id: 1
    email: othello@zulip.example
    full_name: Othello, the Moor of Venice
    api_key: othello-api-key
  - id: 3
    realm_id: 1
    email: iago@zulip.example
    full_name: Iago
    api_key: iago-api-key
  - id: 4
    realm_id: 2
    email: prospero@lear.example
    full_name: Prospero from The Tempest
    api_key: prospero-api-key
  - id: 5
    realm_id: 1
    email: former@zulip.example
    full_name: Former User
    api_key: former-api-key
    is_active: false
  - id: 10
    realm_id: 1
    email: phabricator-bot@zulip.example
    full_name: Phabricator Bot
    api_key: phabricator-bot-api-key
    is_bot: true
    bot_owner_id: 1
  - id: 11
    realm_id: 1
    email: webhook-bot@zulip.example
    full_name: Zulip Webhook Bot
    api_key: webhook-bot-api-key
    is_bot: true
    bot_owner_id: 1
streams:
  - id: 1
    realm_id: 1
    name: Verona
    subscribers: [1, 2, 10]
  - id: 2
    realm_id: 1
    name: secret
    invite_only: true
    subscribers: [2]
  - id: 3
    realm_id: 2
    name: Denmark
  - id: 4
    realm_id: 1
    name: commits
bot_configs:
  10:
    integration_id: phabricator
    phabricator_root_url: http://127.0.0.1:1
    phabricator_api_key: api-token-for-conduit
"#;

pub fn seed() -> SeedData {
    SeedData::from_yaml_str(SEED).unwrap()
}

pub async fn app_state_with_config(config: AppConfig) -> AppState {
    AppState::with_seed(&seed(), JwtService::new(JWT_SECRET), config)
        .await
        .unwrap()
}

pub async fn app_state() -> AppState {
    app_state_with_config(AppConfig::default()).await
}

/// The API router mounted the way the binary mounts it.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::create_api_router())
        .with_state(state)
}

pub fn server_for(state: AppState) -> TestServer {
    TestServer::new(app(state)).unwrap()
}

pub async fn test_server() -> (TestServer, AppState) {
    let state = app_state().await;
    (server_for(state.clone()), state)
}

/// `Authorization` header for HTTP basic credentials.
pub fn basic_auth((email, api_key): (&str, &str)) -> (HeaderName, HeaderValue) {
    let encoded = STANDARD.encode(format!("{}:{}", email, api_key));
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Basic {}", encoded)).unwrap(),
    )
}

pub fn bearer_auth(token: &str) -> (HeaderName, HeaderValue) {
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}
