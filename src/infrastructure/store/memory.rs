//! In-memory fallback store using moka

use async_trait::async_trait;
use moka::future::Cache as MokaCache;

use crate::domain::{ExpiryFlag, Store, StoreError};

/// Configuration for the in-memory store
#[derive(Debug, Clone)]
pub struct InMemoryStoreConfig {
    /// Maximum number of entries before moka starts evicting
    pub max_capacity: u64,
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
        }
    }
}

impl InMemoryStoreConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }
}

/// Entry stored in moka
#[derive(Debug, Clone)]
struct StoredEntry {
    data: String,
    /// Absolute deadline in millis since epoch; `None` persists until evicted
    expires_at: Option<u64>,
}

/// Process-local store implementing the minimal GET/SET/DEL contract.
///
/// Exists so the rest of the system has a working cache without a real
/// backend in development and tests. Deliberately does not survive restarts.
/// Expiry is a per-entry deadline checked lazily on read; overwriting an
/// entry replaces its deadline and DEL clears it, so a stale deadline can
/// never outlive the value it was set for.
#[derive(Debug)]
pub struct InMemoryStore {
    cache: MokaCache<String, StoredEntry>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_config(InMemoryStoreConfig::default())
    }

    pub fn with_config(config: InMemoryStoreConfig) -> Self {
        Self {
            cache: MokaCache::builder()
                .max_capacity(config.max_capacity)
                .build(),
        }
    }

    fn current_time_millis() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn is_expired(entry: &StoredEntry) -> bool {
        match entry.expires_at {
            Some(deadline) => Self::current_time_millis() > deadline,
            None => false,
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.cache.get(key).await {
            Some(entry) => {
                if Self::is_expired(&entry) {
                    self.cache.remove(key).await;
                    return Ok(None);
                }
                Ok(Some(entry.data.clone()))
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        expiry: Option<ExpiryFlag>,
    ) -> Result<(), StoreError> {
        let expires_at = match expiry {
            Some(ExpiryFlag::Ex(secs)) => {
                Some(Self::current_time_millis().saturating_add(secs.saturating_mul(1_000)))
            }
            Some(other) => {
                tracing::debug!(?other, "ignoring unsupported expiry flag");
                None
            }
            None => None,
        };

        let entry = StoredEntry {
            data: value.to_string(),
            expires_at,
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        let mut deleted = 0;
        for key in keys {
            if let Some(entry) = self.cache.remove(key).await {
                if !Self::is_expired(&entry) {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryStore::new();

        store.set("k1", "\"v1\"", None).await.unwrap();

        let value = store.get("k1").await.unwrap();
        assert_eq!(value.as_deref(), Some("\"v1\""));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = InMemoryStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ex_expiry() {
        let store = InMemoryStore::new();

        store
            .set("k1", "\"v1\"", Some(ExpiryFlag::Ex(1)))
            .await
            .unwrap();
        assert!(store.get("k1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert!(store.get("k1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unsupported_expiry_flags_are_ignored() {
        let store = InMemoryStore::new();

        store
            .set("px", "\"v\"", Some(ExpiryFlag::Px(10)))
            .await
            .unwrap();
        store
            .set("keepttl", "\"v\"", Some(ExpiryFlag::KeepTtl))
            .await
            .unwrap();

        // Neither flag takes effect; entries persist
        assert!(store.get("px").await.unwrap().is_some());
        assert!(store.get("keepttl").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_pending_expiry() {
        let store = InMemoryStore::new();

        store
            .set("k1", "\"old\"", Some(ExpiryFlag::Ex(1)))
            .await
            .unwrap();
        store.set("k1", "\"new\"", None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(store.get("k1").await.unwrap().as_deref(), Some("\"new\""));
    }

    #[tokio::test]
    async fn test_del_returns_count_and_clears_entries() {
        let store = InMemoryStore::new();

        store.set("k1", "\"v1\"", None).await.unwrap();
        store.set("k2", "\"v2\"", None).await.unwrap();

        let deleted = store
            .del(&["k1".to_string(), "k2".to_string(), "absent".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(store.get("k1").await.unwrap().is_none());
        assert!(store.get("k2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_del_is_idempotent() {
        let store = InMemoryStore::new();
        store.set("k1", "\"v1\"", None).await.unwrap();

        assert_eq!(store.del(&["k1".to_string()]).await.unwrap(), 1);
        assert_eq!(store.del(&["k1".to_string()]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_del_does_not_count_expired_entries() {
        let store = InMemoryStore::new();
        store
            .set("k1", "\"v1\"", Some(ExpiryFlag::Ex(1)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(store.del(&["k1".to_string()]).await.unwrap(), 0);
    }
}
