//! Environment-driven configuration

use crate::error::PipelineError;
use crate::pipeline::PipelineSettings;
use crate::resolver::ResolverConfig;
use crate::transcript::DEFAULT_TRANSCRIPT_CAPACITY;
use crate::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub api_port: u16,
    /// `None` uses the built-in financial catalog
    pub catalog_path: Option<PathBuf>,
    pub resolver: ResolverConfig,
    pub pipeline: PipelineSettings,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    /// Transcripts retained before the oldest is evicted
    pub transcript_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Same as [`AppConfig::from_env`] over an explicit variable set
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| lookup(&vars, key);

        let defaults = ResolverConfig::default();
        let resolver = ResolverConfig {
            threshold: parse_or(get("MATCH_THRESHOLD"), "MATCH_THRESHOLD", defaults.threshold)?,
            max_ngram: parse_or(get("MAX_NGRAM"), "MAX_NGRAM", defaults.max_ngram)?,
            key_columns: get("KEY_COLUMNS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.key_columns),
            key_column_floor: parse_or(
                get("KEY_COLUMN_FLOOR"),
                "KEY_COLUMN_FLOOR",
                defaults.key_column_floor,
            )?,
        };

        if resolver.threshold > 100 || resolver.key_column_floor > 100 {
            return Err(PipelineError::ConfigError(
                "MATCH_THRESHOLD and KEY_COLUMN_FLOOR must be within 0..=100".to_string(),
            ));
        }
        if resolver.max_ngram == 0 {
            return Err(PipelineError::ConfigError("MAX_NGRAM must be at least 1".to_string()));
        }

        let pipeline = PipelineSettings {
            entity_filter: parse_bool_or(get("ENTITY_FILTER"), "ENTITY_FILTER", true)?,
            analysis_preview_rows: parse_or(
                get("ANALYSIS_PREVIEW_ROWS"),
                "ANALYSIS_PREVIEW_ROWS",
                10,
            )?,
        };

        let transcript_capacity = parse_or(
            get("TRANSCRIPT_CAPACITY"),
            "TRANSCRIPT_CAPACITY",
            DEFAULT_TRANSCRIPT_CAPACITY,
        )?;
        if transcript_capacity == 0 {
            return Err(PipelineError::ConfigError(
                "TRANSCRIPT_CAPACITY must be at least 1".to_string(),
            ));
        }

        let api_port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => parse_value(raw, "PORT")?,
            None => 8080,
        };

        Ok(Self {
            database_url: get("DATABASE_URL")
                .unwrap_or("sqlite://final_working_database.db")
                .to_string(),
            gemini_api_key: get("GEMINI_API_KEY").unwrap_or_default().to_string(),
            gemini_model: get("GEMINI_MODEL").unwrap_or("gemini-2.0-flash").to_string(),
            api_port,
            catalog_path: get("CATALOG_PATH").map(PathBuf::from),
            resolver,
            pipeline,
            cache_enabled: parse_bool_or(get("CACHE_ENABLED"), "CACHE_ENABLED", true)?,
            cache_ttl: Duration::from_secs(parse_or(get("CACHE_TTL_SECS"), "CACHE_TTL_SECS", 86_400)?),
            transcript_capacity,
        })
    }
}

fn lookup<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_value<T: FromStr>(raw: &str, key: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| PipelineError::ConfigError(format!("Invalid value for {}: '{}'", key, raw)))
}

fn parse_or<T: FromStr>(raw: Option<&str>, key: &str, default: T) -> Result<T> {
    match raw {
        Some(raw) => parse_value(raw, key),
        None => Ok(default),
    }
}

fn parse_bool_or(raw: Option<&str>, key: &str, default: bool) -> Result<bool> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PipelineError::ConfigError(format!(
            "Invalid value for {}: '{}'",
            key, raw
        ))),
    }
}
