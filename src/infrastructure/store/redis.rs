//! Redis store implementation

use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::{ExpiryFlag, Store, StoreError};

/// Configuration for the Redis store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
}

impl RedisStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key_prefix: None,
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// Redis-backed implementation of the store contract.
///
/// Uses a ConnectionManager for pooling and reconnects. Only the `EX` expiry
/// flag is honored, matching the in-memory fallback; other flags are accepted
/// and ignored.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    /// Creates a new Redis store connection
    pub async fn new(config: RedisStoreConfig) -> Result<Self, StoreError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| StoreError::new(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::new(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    /// Creates a Redis store with default configuration
    pub async fn with_url(url: impl Into<String>) -> Result<Self, StoreError> {
        Self::new(RedisStoreConfig::new(url)).await
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: Option<String> = conn
            .get(&prefixed_key)
            .await
            .map_err(|e| StoreError::new(format!("Failed to get key '{}': {}", key, e)))?;

        Ok(result)
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        expiry: Option<ExpiryFlag>,
    ) -> Result<(), StoreError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        match expiry {
            Some(ExpiryFlag::Ex(secs)) => {
                let _: () = conn
                    .set_ex(&prefixed_key, value, secs.max(1))
                    .await
                    .map_err(|e| StoreError::new(format!("Failed to set key '{}': {}", key, e)))?;
            }
            other => {
                if let Some(flag) = other {
                    tracing::debug!(?flag, "ignoring unsupported expiry flag");
                }
                let _: () = conn
                    .set(&prefixed_key, value)
                    .await
                    .map_err(|e| StoreError::new(format!("Failed to set key '{}': {}", key, e)))?;
            }
        }

        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let prefixed_keys: Vec<String> = keys.iter().map(|k| self.prefix_key(k)).collect();
        let mut conn = self.connection.clone();

        let deleted: i64 = conn
            .del(&prefixed_keys)
            .await
            .map_err(|e| StoreError::new(format!("Failed to delete keys: {}", e)))?;

        Ok(deleted.max(0) as u64)
    }
}
