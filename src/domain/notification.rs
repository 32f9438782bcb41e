//! Cross-process notification contract

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::CacheError;

/// A key set was invalidated; nodes holding secondary caches should evict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub domain: String,
    pub tenant_id: String,
    pub keys: Vec<String>,
    pub reason: String,
}

/// An invalidation lost the race for its lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockContentionEvent {
    pub domain: String,
    pub tenant_id: String,
    pub keys: Vec<String>,
    pub lock_resource: String,
}

/// Ask other nodes to re-warm a key set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefetchRequest {
    pub domain: String,
    pub tenant_id: String,
    pub keys: Vec<String>,
}

/// Result of fanning out a prefetch request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefetchOutcome {
    /// Keys that reached at least one listener
    pub refreshed: usize,
    /// Keys whose publication failed
    pub failures: Vec<String>,
}

/// Publishes invalidation, lock-contention and prefetch events to other
/// processes. Best-effort from the coordinator's perspective: a publish
/// failure must not undo an already-applied invalidation.
#[async_trait]
pub trait NotificationChannel: Send + Sync + Debug {
    async fn publish_invalidation(&self, event: &InvalidationEvent) -> Result<(), CacheError>;

    async fn publish_lock_contention(&self, event: &LockContentionEvent)
        -> Result<(), CacheError>;

    async fn publish_prefetch_requested(
        &self,
        event: &PrefetchRequest,
    ) -> Result<PrefetchOutcome, CacheError>;
}

/// Default channel when no transport is configured; drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotificationChannel;

#[async_trait]
impl NotificationChannel for NoopNotificationChannel {
    async fn publish_invalidation(&self, _event: &InvalidationEvent) -> Result<(), CacheError> {
        Ok(())
    }

    async fn publish_lock_contention(
        &self,
        _event: &LockContentionEvent,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    async fn publish_prefetch_requested(
        &self,
        event: &PrefetchRequest,
    ) -> Result<PrefetchOutcome, CacheError> {
        Ok(PrefetchOutcome {
            refreshed: 0,
            failures: event.keys.clone(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_channel_reports_nothing_refreshed() {
        let channel = NoopNotificationChannel;
        let outcome = channel
            .publish_prefetch_requested(&PrefetchRequest {
                domain: "tenant-config".to_string(),
                tenant_id: "acme".to_string(),
                keys: vec!["k1".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(outcome.refreshed, 0);
        assert_eq!(outcome.failures, vec!["k1".to_string()]);
    }

    #[test]
    fn test_invalidation_event_serializes() {
        let event = InvalidationEvent {
            domain: "tenant-config".to_string(),
            tenant_id: "acme".to_string(),
            keys: vec!["k1".to_string()],
            reason: "config updated".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: InvalidationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
