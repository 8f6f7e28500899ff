use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::StateError;

/// Capability contract every shared-state backend satisfies. Callers never
/// branch on which variant is behind the trait object.
#[async_trait]
pub trait StateBackend: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), StateError>;
    async fn get(&self, key: &str) -> Result<Option<String>, StateError>;
    async fn dump_all(&self) -> Result<HashMap<String, String>, StateError>;
}

/// Process-local fallback backend. Individual get/set operations are atomic.
#[derive(Default)]
pub struct MemoryBackend {
    entries: DashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    async fn set(&self, key: &str, value: &str) -> Result<(), StateError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn dump_all(&self) -> Result<HashMap<String, String>, StateError> {
        Ok(self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect())
    }
}

/// Redis-backed shared state. Keys live under a fixed namespace prefix so a
/// shared Redis deployment can host unrelated data alongside the bridge.
pub struct RedisBackend {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisBackend {
    pub const DEFAULT_PREFIX: &'static str = "synapse:ssot:";

    /// Open a managed connection and verify it with a PING. This is the only
    /// availability check the bridge performs; later backend failures
    /// propagate to the caller of the individual operation.
    pub async fn connect(url: &str) -> Result<Self, StateError> {
        let client = redis::Client::open(url).map_err(|e| StateError::Connection(e.to_string()))?;
        let mut conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;
        Ok(Self {
            conn,
            prefix: Self::DEFAULT_PREFIX.to_string(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl StateBackend for RedisBackend {
    async fn set(&self, key: &str, value: &str) -> Result<(), StateError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.namespaced(key), value).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(self.namespaced(key)).await?;
        Ok(value)
    }

    // Key enumeration and the per-key fetches are separate round-trips, so
    // the snapshot is not atomic across keys: concurrent writers may leave
    // some keys newer than others in the result.
    async fn dump_all(&self) -> Result<HashMap<String, String>, StateError> {
        let mut scan_conn = self.conn.clone();
        let pattern = format!("{}*", self.prefix);
        let keys: Vec<String> = {
            let mut iter = scan_conn.scan_match::<_, String>(pattern).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        let mut conn = self.conn.clone();
        let mut out = HashMap::with_capacity(keys.len());
        for key in keys {
            let value: Option<String> = conn.get(&key).await?;
            if let Some(value) = value {
                let bare = key.strip_prefix(&self.prefix).unwrap_or(&key).to_string();
                out.insert(bare, value);
            }
        }
        Ok(out)
    }
}
