use anyhow::Context;
use axum::{Router, routing::get};
use drafts_api::config::AppConfig;
use drafts_api::middleware::{create_cors_layer, init_tracing};
use drafts_api::routes::{self, AppState};
use drafts_api::services::JwtService;
use drafts_api::storage::postgres::PostgresStorageBackend;
use drafts_api::storage::{MemoryStorageBackend, SeedData, StorageBackend};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Postgres when DATABASE_URL is set, otherwise memory loaded from SEED_FILE.
async fn create_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn StorageBackend>> {
    if let Some(database_url) = &config.database_url {
        let storage = PostgresStorageBackend::connect(database_url)
            .await
            .context("Failed to initialize PostgreSQL storage")?;
        info!("Using PostgreSQL storage");
        return Ok(Arc::new(storage));
    }

    let storage = MemoryStorageBackend::new();
    match &config.seed_file {
        Some(path) => {
            let seed = SeedData::load(path)
                .with_context(|| format!("Failed to load seed file {}", path.display()))?;
            seed.apply(&storage).await.context("Failed to apply seed data")?;
        }
        None => warn!("No SEED_FILE set; starting with empty in-memory storage"),
    }
    info!("Using in-memory storage");
    Ok(Arc::new(storage))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("SIGINT received, shutting down gracefully");
                    }
                    _ = sigterm.recv() => {
                        info!("SIGTERM received, shutting down gracefully");
                    }
                }
                return;
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
    }
    info!("Shutdown signal received");
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;
    init_tracing(config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
    info!("Application starting...");

    let jwt = JwtService::try_from_env(config.is_development).map_err(anyhow::Error::msg)?;
    let storage = create_storage(&config).await?;

    let port = config.port;
    let cors = create_cors_layer(&config.cors_allowed_origins);
    let app_state = AppState::new(storage, jwt, config).context("Failed to load API documentation")?;

    // Health checks at the root and under /api/v1, API routes nested under /api/v1
    let app = Router::new()
        .route("/health", get(routes::health_check))
        .nest("/api/v1", routes::create_api_router())
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {} (port {})", addr, port);
    info!("API health check available at http://{}/api/v1/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}
