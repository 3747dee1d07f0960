//! Financial Query Pipeline
//!
//! Answers free-text questions about a fixed financial dataset:
//! - Splits compound questions into independent sub-questions
//! - Grounds names onto the exact controlled-vocabulary values of the catalog
//! - Generates read-only SQL with a text-generation collaborator
//! - Gates every statement before it reaches the store
//! - Summarizes the collected rows and keeps a step-by-step transcript
//!
//! PIPELINE:
//! DECOMPOSE → SELECT TABLE → RESOLVE ENTITIES → GENERATE SQL → VALIDATE/EXECUTE → ANALYZE

pub mod api;
pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod execution;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod transcript;

pub use error::Result;

// Re-export common types
pub use catalog::{Catalog, ColumnDefinition, TableDefinition};
pub use execution::SqlExecutor;
pub use llm::TextGenerator;
pub use models::*;
pub use pipeline::{PipelineSettings, QueryPipeline};
pub use resolver::{EntityResolver, ResolverConfig};
