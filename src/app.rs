//! Process-level wiring shared by both binaries

use crate::catalog::{financial_catalog, Catalog};
use crate::config::AppConfig;
use crate::execution::SqlExecutor;
use crate::llm::{CachedGenerator, GeminiClient, TextGenerator};
use crate::pipeline::QueryPipeline;
use crate::resolver::EntityResolver;
use crate::transcript::TranscriptStore;
use crate::Result;
use std::sync::Arc;
use tracing::info;

pub fn load_catalog(config: &AppConfig) -> Result<Catalog> {
    match &config.catalog_path {
        Some(path) => {
            info!(path = %path.display(), "Loading catalog from file");
            Catalog::from_path(path)
        }
        None => Ok(financial_catalog()),
    }
}

pub fn build_generator(config: &AppConfig) -> Result<Arc<dyn TextGenerator>> {
    let client: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        &config.gemini_model,
    )?);

    if config.cache_enabled {
        Ok(Arc::new(CachedGenerator::new(client, config.cache_ttl)))
    } else {
        Ok(client)
    }
}

/// Catalog, store handle and collaborator, opened once per process
pub async fn build_pipeline(config: &AppConfig) -> Result<QueryPipeline> {
    let catalog = load_catalog(config)?;
    let executor = SqlExecutor::connect(&config.database_url).await?;
    let generator = build_generator(config)?;

    info!(
        tables = catalog.tables.len(),
        database = %config.database_url,
        model = %config.gemini_model,
        cache = config.cache_enabled,
        "Pipeline components ready"
    );

    Ok(QueryPipeline::new(
        Arc::new(catalog),
        EntityResolver::new(config.resolver.clone()),
        generator,
        executor,
    )
    .with_settings(config.pipeline.clone())
    .with_transcripts(TranscriptStore::with_capacity(config.transcript_capacity)))
}
