//! Coherent Cache
//!
//! A tenant-aware, distributed read-through cache with consistent
//! invalidation, for services sitting in front of an expensive origin:
//! - Read-through loading with per-call TTL and pluggable serialization
//! - Namespace policies parameterizing caching per logical domain
//! - Client routing with a process-local in-memory fallback store
//! - Distributed-lock-guarded double-delete invalidation
//! - Cross-process invalidation/prefetch fan-out over pub/sub

pub mod config;
pub mod domain;
pub mod infrastructure;

use std::sync::Arc;

use tracing::info;

use crate::config::CacheSettings;
use crate::domain::{
    CacheError, CachePolicy, FailureStage, LockProviderFactory, NamespacePolicyRegistry,
    NoopNotificationChannel, NotificationChannel, Store,
};
use crate::infrastructure::{
    CacheMetrics, ClientDescriptor, ClientProvider, ConsistencyCoordinator, CoordinatorConfig,
    ReadThroughCache, RedisChannelConfig, RedisNotificationChannel, RedisStore, RedisStoreConfig,
};

pub use crate::domain::{InvalidationRequest, ReadRequest};

/// The wired cache components an application consumes.
pub struct CacheStack {
    pub provider: Arc<ClientProvider>,
    pub policies: Arc<NamespacePolicyRegistry>,
    pub read_through: Arc<ReadThroughCache>,
    pub coordinator: Arc<ConsistencyCoordinator>,
}

impl CacheStack {
    /// Builds the stack from settings, without a distributed lock backend
    /// (invalidation degrades to in-process locking).
    pub async fn from_settings(settings: &CacheSettings) -> Result<Self, CacheError> {
        Self::from_settings_with_lock(settings, None).await
    }

    /// Builds the stack from settings with an optional distributed lock
    /// provider factory.
    pub async fn from_settings_with_lock(
        settings: &CacheSettings,
        lock_factory: Option<Arc<dyn LockProviderFactory>>,
    ) -> Result<Self, CacheError> {
        let mut policies = NamespacePolicyRegistry::new();
        for policy in &settings.policies {
            let mut entry = CachePolicy::new(&policy.domain, &policy.key_prefix)
                .with_separator(&policy.separator)
                .with_default_ttl_secs(policy.default_ttl_secs)
                .with_eviction(policy.eviction);
            if let Some(suffix) = &policy.key_suffix {
                entry = entry.with_key_suffix(suffix);
            }
            if let Some(threshold) = policy.hit_threshold_alert {
                entry = entry.with_hit_threshold_alert(threshold);
            }
            policies = policies.with_policy(entry);
        }
        info!(policies = policies.len(), "cache policies registered");

        let mut provider = ClientProvider::new();
        if let Some(default_client) = &settings.default_client {
            provider = provider.with_default_client_key(default_client);
        }

        let mut first_url: Option<String> = None;
        for client in &settings.clients {
            let mut descriptor = ClientDescriptor::new();
            if let Some(key) = &client.key {
                descriptor = descriptor.with_key(key);
            }
            if let Some(namespace) = &client.namespace {
                descriptor = descriptor.with_namespace(namespace);
            }
            provider = provider.with_descriptor(descriptor);

            if let (Some(key), Some(url)) = (&client.key, &client.url) {
                let store = RedisStore::new(RedisStoreConfig::new(url)).await.map_err(|e| {
                    CacheError::internal(
                        FailureStage::Unknown,
                        format!("failed to construct store client '{}': {}", key, e),
                    )
                })?;
                provider = provider.with_client(key, Arc::new(store) as Arc<dyn Store>);
                first_url.get_or_insert_with(|| url.clone());
            }
        }

        let notifications: Arc<dyn NotificationChannel> = match &first_url {
            Some(url) => Arc::new(
                RedisNotificationChannel::new(RedisChannelConfig::new(
                    url,
                    &settings.invalidation.channel,
                ))
                .await?,
            ),
            None => {
                info!("no store client URLs configured; cache notifications disabled");
                Arc::new(NoopNotificationChannel)
            }
        };

        let provider = Arc::new(provider);
        let policies = Arc::new(policies);
        let metrics = Arc::new(CacheMetrics::new());

        let read_through =
            Arc::new(ReadThroughCache::new(provider.clone()).with_metrics(metrics.clone()));

        let mut coordinator_config = CoordinatorConfig::default()
            .with_delay_ms(settings.invalidation.delay_ms)
            .with_lock_duration_ms(settings.invalidation.lock_duration_ms);
        if settings.invalidation.notification_critical {
            coordinator_config = coordinator_config.with_critical_notifications();
        }

        let mut coordinator = ConsistencyCoordinator::new(provider.clone(), policies.clone())
            .with_notifications(notifications)
            .with_metrics(metrics)
            .with_config(coordinator_config);
        if let Some(factory) = lock_factory {
            coordinator = coordinator.with_lock_factory(factory);
        }

        Ok(Self {
            provider,
            policies,
            read_through,
            coordinator: Arc::new(coordinator),
        })
    }
}
