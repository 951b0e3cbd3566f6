use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

use sk_portal_server::api;
use sk_portal_server::blob::{FilesystemBlobStore, UrlSigner};
use sk_portal_server::config::Config;
use sk_portal_server::repository::SqliteRepository;
use sk_portal_server::{AppState, PortalService};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting SK portal");

    let config = Config::from_env().context("Failed to load configuration from environment")?;
    info!("Configuration: {:?}", config);

    let db_path = config.database_path();
    info!("Using state database: {}", db_path.display());
    let repository = SqliteRepository::new(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    info!("Storing documents under: {}", config.blob_dir.display());
    let blobs = FilesystemBlobStore::new(&config.blob_dir)
        .with_context(|| format!("Failed to prepare blob directory {}", config.blob_dir.display()))?;

    let signer = UrlSigner::new(
        &config.url_signing_secret,
        &config.public_base_url,
        config.signed_url_ttl,
    )
    .map_err(|e| anyhow::anyhow!("Invalid URL signing secret: {}", e))?;

    let state = Arc::new(AppState::new(PortalService::new(
        Arc::new(repository),
        Arc::new(blobs),
        signer,
    )));

    let app = api::app(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
