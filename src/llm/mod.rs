//! Text-generation collaborator
//!
//! The pipeline only ever needs `prompt -> text`. Conversation history,
//! tool calling and streaming are out of scope.

use crate::Result;
use async_trait::async_trait;

pub mod cache;
pub mod gemini;

pub use cache::CachedGenerator;
pub use gemini::GeminiClient;

/// Stateless text generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
