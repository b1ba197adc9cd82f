//! Application state management.
//!
//! Defines the AppState struct that holds all shared application state:
//! the storage backend, the services built on it, the JWT service and the
//! documentation renderer.

use crate::config::AppConfig;
use crate::docs::{DocsError, Renderer, SpecRegistry};
use crate::services::{DraftService, JwtService, SharedJwtService, WebhookService};
use crate::storage::{MemoryStorageBackend, SeedData, StorageBackend, StorageError};
use axum::extract::FromRef;
use std::sync::Arc;

/// Application state shared across all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend (in-memory or PostgreSQL)
    pub storage: Arc<dyn StorageBackend>,
    pub drafts: Arc<DraftService>,
    pub webhooks: Arc<WebhookService>,
    pub jwt: SharedJwtService,
    /// Renders the bundled API documentation pages
    pub docs: Arc<Renderer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        jwt: JwtService,
        config: AppConfig,
    ) -> Result<Self, DocsError> {
        let registry = SpecRegistry::with_api_doc()?;
        let renderer = Renderer::new(registry, &config.api_server_url);
        Ok(Self {
            drafts: Arc::new(DraftService::new(storage.clone(), config.limits)),
            webhooks: Arc::new(WebhookService::new(
                storage.clone(),
                config.limits,
                config.support_email.clone(),
            )),
            storage,
            jwt: Arc::new(jwt),
            docs: Arc::new(renderer),
            config: Arc::new(config),
        })
    }

    /// State over a fresh in-memory backend loaded with `seed`.
    pub async fn with_seed(
        seed: &SeedData,
        jwt: JwtService,
        config: AppConfig,
    ) -> Result<Self, StorageError> {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorageBackend::new());
        seed.apply(storage.as_ref()).await?;
        Self::new(storage, jwt, config).map_err(|e| StorageError::Other(e.to_string()))
    }
}

impl FromRef<AppState> for Arc<DraftService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.drafts.clone()
    }
}

impl FromRef<AppState> for Arc<WebhookService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.webhooks.clone()
    }
}

impl FromRef<AppState> for Arc<Renderer> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.docs.clone()
    }
}
