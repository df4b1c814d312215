mod memory;

pub use memory::MemoryCache;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Ephemeral key-value store for session tokens. Entries expire on their own
/// once their TTL has elapsed; an expired entry is never returned.
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    /// Remove a key. Returns whether a live entry was removed.
    async fn del(&self, key: &str) -> Result<bool, CacheError>;
    async fn is_alive(&self) -> bool;
}
