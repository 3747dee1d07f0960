//! Error types for the financial query pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {

    // =============================
    // Core Pipeline Errors
    // =============================

    /// Transport failure or malformed response from the text-generation service
    #[error("Collaborator error: {0}")]
    CollaboratorError(String),

    /// Generated SQL failed the safety gate or the dry-run compile
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Store-level failure while running a validated query
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// A table or column was referenced that the catalog does not know
    #[error("Catalog lookup error: {0}")]
    CatalogLookupError(String),

    /// The collaborator answered, but not with a read statement
    #[error("Generated query rejected: {0}")]
    GenerationRejected(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PipelineError {
    /// Errors that indicate a code or configuration defect rather than a
    /// runtime condition. These halt a pipeline run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::CatalogLookupError(_) | PipelineError::ConfigError(_)
        )
    }
}
