//! Redis pub/sub notification channel

use std::fmt;

use async_trait::async_trait;
use futures::future::join_all;
use redis::aio::ConnectionManager;
use redis::Client;
use serde::Serialize;

use crate::domain::{
    CacheError, FailureStage, InvalidationEvent, LockContentionEvent, NotificationChannel,
    PrefetchOutcome, PrefetchRequest,
};

/// Configuration for the Redis notification channel
#[derive(Debug, Clone)]
pub struct RedisChannelConfig {
    /// Redis connection URL
    pub url: String,
    /// Base channel name; event kinds publish on `{base}:{kind}`
    pub channel: String,
}

impl RedisChannelConfig {
    pub fn new(url: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            channel: channel.into(),
        }
    }
}

/// Per-key prefetch message, so subscribers can shard re-warming work.
#[derive(Debug, Serialize)]
struct PrefetchKeyMessage<'a> {
    domain: &'a str,
    tenant_id: &'a str,
    key: &'a str,
}

/// Publishes cache events over Redis pub/sub.
///
/// `PUBLISH` returns the number of receiving subscribers, which feeds the
/// prefetch outcome's refreshed count.
#[derive(Clone)]
pub struct RedisNotificationChannel {
    connection: ConnectionManager,
    config: RedisChannelConfig,
}

impl fmt::Debug for RedisNotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisNotificationChannel")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisNotificationChannel {
    pub async fn new(config: RedisChannelConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            CacheError::internal(
                FailureStage::Unknown,
                format!("Failed to create Redis client: {}", e),
            )
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::internal(
                FailureStage::Unknown,
                format!("Failed to connect to Redis: {}", e),
            )
        })?;

        Ok(Self { connection, config })
    }

    fn topic(&self, kind: &str) -> String {
        format!("{}:{}", self.config.channel, kind)
    }

    /// Publishes a payload, returning the subscriber count that received it.
    async fn publish<T: Serialize>(&self, kind: &str, payload: &T) -> Result<i64, CacheError> {
        let body = serde_json::to_string(payload).map_err(|e| {
            CacheError::internal(
                FailureStage::Unknown,
                format!("Failed to serialize {} event: {}", kind, e),
            )
        })?;

        let mut conn = self.connection.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(self.topic(kind))
            .arg(body)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                CacheError::internal(
                    FailureStage::Unknown,
                    format!("Failed to publish {} event: {}", kind, e),
                )
            })?;

        Ok(receivers)
    }
}

#[async_trait]
impl NotificationChannel for RedisNotificationChannel {
    async fn publish_invalidation(&self, event: &InvalidationEvent) -> Result<(), CacheError> {
        let receivers = self.publish("invalidation", event).await?;
        tracing::debug!(
            domain = %event.domain,
            tenant_id = %event.tenant_id,
            receivers,
            "published invalidation event"
        );
        Ok(())
    }

    async fn publish_lock_contention(
        &self,
        event: &LockContentionEvent,
    ) -> Result<(), CacheError> {
        self.publish("lock-contention", event).await?;
        Ok(())
    }

    async fn publish_prefetch_requested(
        &self,
        event: &PrefetchRequest,
    ) -> Result<PrefetchOutcome, CacheError> {
        let publishes = event.keys.iter().map(|key| {
            let message = PrefetchKeyMessage {
                domain: &event.domain,
                tenant_id: &event.tenant_id,
                key,
            };
            async move { (key.clone(), self.publish("prefetch", &message).await) }
        });

        let mut outcome = PrefetchOutcome::default();
        for (key, result) in join_all(publishes).await {
            match result {
                Ok(receivers) if receivers > 0 => outcome.refreshed += 1,
                Ok(_) => {
                    // Published, nobody listening; not a failure
                }
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "prefetch publish failed");
                    outcome.failures.push(key);
                }
            }
        }

        Ok(outcome)
    }
}
