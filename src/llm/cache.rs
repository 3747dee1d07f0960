//! Response cache for any [`TextGenerator`]
//!
//! Keyed by the SHA-256 of the prompt. Only successful responses are stored.

use super::TextGenerator;
use crate::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

struct CacheEntry {
    response: String,
    stored_at: Instant,
}

pub struct CachedGenerator {
    inner: Arc<dyn TextGenerator>,
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl CachedGenerator {
    pub fn new(inner: Arc<dyn TextGenerator>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

pub fn prompt_key(prompt: &str) -> String {
    hex::encode(Sha256::digest(prompt.as_bytes()))
}

#[async_trait]
impl TextGenerator for CachedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let key = prompt_key(prompt);

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key) {
                if entry.stored_at.elapsed() < self.ttl {
                    debug!(key = %&key[..12], "Collaborator cache hit");
                    return Ok(entry.response.clone());
                }
            }
        }

        let response = self.inner.generate(prompt).await?;

        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        entries.insert(
            key,
            CacheEntry {
                response: response.clone(),
                stored_at: Instant::now(),
            },
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TextGenerator for Counting {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PipelineError::CollaboratorError("offline".to_string()));
            }
            Ok(format!("echo: {}", prompt))
        }
    }

    fn counting(fail: bool) -> Arc<Counting> {
        Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    #[tokio::test]
    async fn test_repeated_prompt_served_from_cache() {
        let inner = counting(false);
        let cached = CachedGenerator::new(inner.clone(), Duration::from_secs(60));

        assert_eq!(cached.generate("a").await.unwrap(), "echo: a");
        assert_eq!(cached.generate("a").await.unwrap(), "echo: a");
        assert_eq!(cached.generate("b").await.unwrap(), "echo: b");

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.len().await, 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let inner = counting(true);
        let cached = CachedGenerator::new(inner.clone(), Duration::from_secs(60));

        assert!(cached.generate("a").await.is_err());
        assert!(cached.generate("a").await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert!(cached.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() {
        let inner = counting(false);
        let cached = CachedGenerator::new(inner.clone(), Duration::ZERO);

        cached.generate("a").await.unwrap();
        cached.generate("a").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_prompt_key_is_stable_hex() {
        assert_eq!(prompt_key("x"), prompt_key("x"));
        assert_ne!(prompt_key("x"), prompt_key("y"));
        assert_eq!(prompt_key("x").len(), 64);
    }
}
