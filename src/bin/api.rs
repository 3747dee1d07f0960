use financial_query_pipeline::{api::start_server, app::build_pipeline, config::AppConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    if config.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY not set; every collaborator call will fail");
    }

    info!("Financial Query Pipeline - API Server");
    info!("Port: {}", config.api_port);

    let pipeline = Arc::new(build_pipeline(&config).await?);

    info!("Pipeline initialized, starting API server");

    start_server(pipeline, config.api_port).await?;

    Ok(())
}
