//! fridge-ri - Fridge Receipt Import service
//!
//! Small single-user web service: upload a grocery receipt PDF, review the
//! perishable items the extraction service found, then file the kept ones
//! into the household fridge tracker.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use fridge_ri::config::Config;
use fridge_ri::services::{ExtractionClient, RecordStoreClient, SessionController};
use fridge_ri::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!(
        "Starting fridge-ri v{} ({} {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP"),
    );

    // All configuration comes from the environment; missing credentials
    // abort startup here with a remediation hint.
    let config = Config::from_env()?;
    info!(
        submitters = config.submitters.len(),
        model = %config.extraction_model,
        "Configuration loaded"
    );

    let extractor = ExtractionClient::new(
        config.anthropic_api_key.clone(),
        config.extraction_model.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to create extraction client: {}", e))?;

    let writer = RecordStoreClient::new(
        config.notion_token.clone(),
        config.notion_database_id.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to create record store client: {}", e))?;

    let controller = SessionController::new(Arc::new(extractor), Arc::new(writer));

    let bind_addr = config.bind_addr;
    let state = AppState::new(Arc::new(config), Arc::new(controller));
    let app = fridge_ri::build_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
