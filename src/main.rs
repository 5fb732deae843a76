use std::sync::Arc;
use stock_newsletter::api::{run_server, AppState};
use stock_newsletter::{AppConfig, NewsletterPipeline};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Setup Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Stock Newsletter...");

    // Load Configuration
    let config = AppConfig::load()?;
    info!("Loaded Configuration: {:?}", config);

    // Missing credentials stop startup here
    let pipeline = NewsletterPipeline::from_config(config.clone())?;

    let app_state = Arc::new(AppState { pipeline });

    info!("Initializing API Server...");
    run_server(app_state, &config.server.bind).await?;

    Ok(())
}
