//! Backing store contract

use std::fmt::Debug;

use async_trait::async_trait;
use thiserror::Error;

/// Expiry flag accepted by [`Store::set`].
///
/// Only `Ex` is honored; the remaining flags are accepted without error but
/// have no effect, matching the in-memory fallback semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryFlag {
    /// Expire the entry after the given number of seconds
    Ex(u64),
    /// Millisecond expiry; accepted, ignored
    Px(u64),
    /// Retain the entry's current expiry; accepted, ignored
    KeepTtl,
}

/// Store-level failure. Wrapped into the caller's error taxonomy with a stage
/// tag by the services that know which phase was running.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Minimal key-value store contract consumed by the cache.
///
/// Handles are stateless from the caller's perspective and may be shared
/// freely across concurrent callers.
#[async_trait]
pub trait Store: Send + Sync + Debug {
    /// Returns the raw string value, or `None` on a miss.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a raw string value, optionally with an expiry flag.
    async fn set(
        &self,
        key: &str,
        value: &str,
        expiry: Option<ExpiryFlag>,
    ) -> Result<(), StoreError>;

    /// Deletes the given keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64, StoreError>;
}
