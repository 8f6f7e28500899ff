//! Single source of truth (SSoT) for cross-session shared context.
//!
//! Sessions read and write string values under caller-chosen keys. The
//! backend is picked once at startup (Redis when a URL is configured and
//! reachable, an in-process map otherwise) and is invisible to callers
//! from then on.

pub mod backend;
pub mod error;

pub use backend::{MemoryBackend, RedisBackend, StateBackend};
pub use error::StateError;

use std::collections::HashMap;

/// Uniform facade over the selected backend.
pub struct SharedState {
    backend: Box<dyn StateBackend>,
}

impl SharedState {
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
        }
    }

    /// Connect to Redis, verifying availability with a single PING.
    pub async fn connect_redis(url: &str) -> Result<Self, StateError> {
        let backend = RedisBackend::connect(url).await?;
        Ok(Self {
            backend: Box::new(backend),
        })
    }

    pub fn with_backend(backend: Box<dyn StateBackend>) -> Self {
        Self { backend }
    }

    /// Unconditional upsert.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), StateError> {
        self.backend.set(key, value).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        self.backend.get(key).await
    }

    /// Snapshot of every entry, keys unprefixed. Not atomic across keys on
    /// a networked backend.
    pub async fn dump_all(&self) -> Result<HashMap<String, String>, StateError> {
        self.backend.dump_all().await
    }
}
