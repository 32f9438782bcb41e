//! Consistent invalidation coordinator

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::domain::{
    CacheError, FailureStage, InvalidationEvent, InvalidationRequest, LockContentionEvent,
    LockProvider, LockProviderFactory, MetricEvent, MetricsHook, NamespacePolicyRegistry,
    NoopMetrics, NoopNotificationChannel, NotificationChannel, PrefetchOutcome, PrefetchRequest,
    Store,
};
use crate::infrastructure::lock::InProcessLockProvider;
use crate::infrastructure::provider::ClientProvider;

/// Derived lock resource for a (domain, tenant) pair.
pub fn lock_resource(domain: &str, tenant_id: &str) -> String {
    format!("lock:cache:{}:{}", domain, tenant_id)
}

/// Coordinator tuning knobs
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Delay between the two deletes when a request does not set one
    pub delay_ms: u64,
    /// Lock hold duration when a request does not set one
    pub lock_duration_ms: u64,
    /// Treat a failed invalidation publish as a failure of the call
    pub notification_critical: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            lock_duration_ms: 10_000,
            notification_critical: false,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_lock_duration_ms(mut self, lock_duration_ms: u64) -> Self {
        self.lock_duration_ms = lock_duration_ms;
        self
    }

    pub fn with_critical_notifications(mut self) -> Self {
        self.notification_critical = true;
        self
    }
}

/// Serializes invalidations per (domain, tenant) under a distributed lock and
/// performs the double-delete protocol: delete, wait out the in-flight
/// read-modify-write window, delete again so a racing stale repopulation
/// cannot outlive the invalidation.
#[derive(Debug)]
pub struct ConsistencyCoordinator {
    provider: Arc<ClientProvider>,
    policies: Arc<NamespacePolicyRegistry>,
    notifications: Arc<dyn NotificationChannel>,
    metrics: Arc<dyn MetricsHook>,
    lock_factory: Option<Arc<dyn LockProviderFactory>>,
    lock: OnceLock<Arc<dyn LockProvider>>,
    config: CoordinatorConfig,
}

impl ConsistencyCoordinator {
    pub fn new(provider: Arc<ClientProvider>, policies: Arc<NamespacePolicyRegistry>) -> Self {
        Self {
            provider,
            policies,
            notifications: Arc::new(NoopNotificationChannel),
            metrics: Arc::new(NoopMetrics),
            lock_factory: None,
            lock: OnceLock::new(),
            config: CoordinatorConfig::default(),
        }
    }

    pub fn with_notifications(mut self, notifications: Arc<dyn NotificationChannel>) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsHook>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_lock_factory(mut self, factory: Arc<dyn LockProviderFactory>) -> Self {
        self.lock_factory = Some(factory);
        self
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Invalidates a key set for one tenant within one domain.
    pub async fn invalidate(&self, request: &InvalidationRequest) -> Result<(), CacheError> {
        if let Err(err) = request.validate() {
            self.record_failure(request, &err);
            return Err(err);
        }

        if self.policies.get(&request.domain).is_none() {
            let err = CacheError::configuration(format!(
                "no cache policy registered for domain '{}'",
                request.domain
            ));
            self.record_failure(request, &err);
            return Err(err);
        }

        let store = match self.provider.get_client(request.client_key.as_deref()) {
            Ok(store) => store,
            Err(err) => {
                let err = if err.is_configuration() {
                    err
                } else {
                    CacheError::internal(
                        FailureStage::Unknown,
                        format!("failed to resolve cache client: {}", err),
                    )
                };
                self.record_failure(request, &err);
                return Err(err);
            }
        };

        let resource = lock_resource(&request.domain, &request.tenant_id);
        let lock = self.lock_provider();
        let lock_duration = Duration::from_millis(
            request
                .lock_duration_ms
                .unwrap_or(self.config.lock_duration_ms),
        );

        let guard = match lock.acquire(&resource, lock_duration).await {
            Ok(guard) => guard,
            Err(lock_err) if lock_err.is_busy() => {
                self.metrics.record_lock_wait(
                    &self
                        .event(request)
                        .with_extra("lock_resource", &resource),
                );

                let contention = LockContentionEvent {
                    domain: request.domain.clone(),
                    tenant_id: request.tenant_id.clone(),
                    keys: request.keys.clone(),
                    lock_resource: resource.clone(),
                };
                if let Err(publish_err) =
                    self.notifications.publish_lock_contention(&contention).await
                {
                    tracing::warn!(
                        resource = %resource,
                        error = %publish_err,
                        "failed to publish lock contention event"
                    );
                }

                let err = CacheError::lock_contention(&resource);
                self.record_failure(request, &err);
                return Err(err);
            }
            Err(lock_err) => {
                let err = CacheError::internal(
                    FailureStage::Unknown,
                    format!("failed to acquire lock '{}': {}", resource, lock_err),
                );
                self.record_failure(request, &err);
                return Err(err);
            }
        };

        let outcome = self.double_delete(store.as_ref(), request).await;

        if let Err(release_err) = guard.release().await {
            tracing::warn!(
                resource = %resource,
                error = %release_err,
                "failed to release invalidation lock"
            );
        }

        if let Err(err) = outcome {
            self.record_failure(request, &err);
            return Err(err);
        }

        if request.notify {
            let event = InvalidationEvent {
                domain: request.domain.clone(),
                tenant_id: request.tenant_id.clone(),
                keys: request.keys.clone(),
                reason: request.reason.clone(),
            };
            if let Err(publish_err) = self.notifications.publish_invalidation(&event).await {
                if self.config.notification_critical {
                    let err = CacheError::internal(
                        FailureStage::Unknown,
                        format!("failed to publish invalidation event: {}", publish_err),
                    );
                    self.record_failure(request, &err);
                    return Err(err);
                }
                tracing::warn!(
                    domain = %request.domain,
                    tenant_id = %request.tenant_id,
                    error = %publish_err,
                    "invalidation notification failed; invalidation already applied"
                );
            }
        }

        tracing::debug!(
            domain = %request.domain,
            tenant_id = %request.tenant_id,
            keys = ?request.keys,
            "invalidation complete"
        );
        Ok(())
    }

    /// Asks other nodes to re-warm a key set after an invalidation.
    pub async fn request_prefetch(
        &self,
        request: &PrefetchRequest,
    ) -> Result<PrefetchOutcome, CacheError> {
        if request.domain.trim().is_empty() || request.tenant_id.trim().is_empty() {
            return Err(CacheError::validation(
                "domain and tenant_id must not be blank",
            ));
        }
        if request.keys.is_empty() {
            return Err(CacheError::validation("keys must not be empty"));
        }
        if self.policies.get(&request.domain).is_none() {
            return Err(CacheError::configuration(format!(
                "no cache policy registered for domain '{}'",
                request.domain
            )));
        }

        self.notifications.publish_prefetch_requested(request).await
    }

    /// First delete evicts the current value; the delay lets in-flight stale
    /// readers finish their write-back; the second delete removes whatever
    /// they put back. The order must never be changed.
    async fn double_delete(
        &self,
        store: &dyn Store,
        request: &InvalidationRequest,
    ) -> Result<(), CacheError> {
        store.del(&request.keys).await.map_err(|e| {
            CacheError::internal(
                FailureStage::Unknown,
                format!("first delete failed: {}", e),
            )
        })?;

        let delay_ms = request.delay_ms.unwrap_or(self.config.delay_ms);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        store.del(&request.keys).await.map_err(|e| {
            CacheError::internal(
                FailureStage::Unknown,
                format!("delayed second delete failed: {}", e),
            )
        })?;

        Ok(())
    }

    /// Resolves the lock provider once. A missing or failing factory degrades
    /// to in-process locking, which only serializes within this process.
    fn lock_provider(&self) -> Arc<dyn LockProvider> {
        self.lock
            .get_or_init(|| match &self.lock_factory {
                Some(factory) => match factory.create() {
                    Ok(provider) => provider,
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            "distributed lock provider unavailable; degrading to \
                             in-process locking"
                        );
                        Arc::new(InProcessLockProvider::new())
                    }
                },
                None => {
                    tracing::warn!(
                        "no distributed lock provider registered; degrading to \
                         in-process locking"
                    );
                    Arc::new(InProcessLockProvider::new())
                }
            })
            .clone()
    }

    fn event(&self, request: &InvalidationRequest) -> MetricEvent {
        MetricEvent::new(&request.domain)
            .with_tenant(&request.tenant_id)
            .with_extra("keys", request.keys.join(","))
    }

    fn record_failure(&self, request: &InvalidationRequest, err: &CacheError) {
        let mut event = self.event(request).with_error(err.to_string());
        if let Some(stage) = err.stage() {
            event = event.with_stage(stage);
        }
        self.metrics.record_failure(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::lock::mock::{MockLockFactory, MockLockProvider};
    use crate::domain::metrics::mock::RecordingMetrics;
    use crate::domain::notification::mock::RecordingChannel;
    use crate::domain::store::mock::MockStore;
    use crate::domain::CachePolicy;

    struct Harness {
        store: Arc<MockStore>,
        metrics: Arc<RecordingMetrics>,
        channel: Arc<RecordingChannel>,
        coordinator: ConsistencyCoordinator,
    }

    fn harness(store: MockStore, channel: RecordingChannel) -> Harness {
        let store = Arc::new(store);
        let metrics = Arc::new(RecordingMetrics::new());
        let channel = Arc::new(channel);
        let provider = Arc::new(
            ClientProvider::new()
                .with_client("default", store.clone() as Arc<dyn Store>),
        );
        let policies = Arc::new(
            NamespacePolicyRegistry::new()
                .with_policy(CachePolicy::new("tenant-config", "cfg")),
        );
        let coordinator = ConsistencyCoordinator::new(provider, policies)
            .with_metrics(metrics.clone())
            .with_notifications(channel.clone());
        Harness {
            store,
            metrics,
            channel,
            coordinator,
        }
    }

    fn request(keys: Vec<&str>) -> InvalidationRequest {
        InvalidationRequest::new(
            "tenant-config",
            "acme",
            keys.into_iter().map(String::from).collect(),
            "config updated",
        )
        .with_delay_ms(0)
    }

    #[tokio::test]
    async fn test_double_delete_issues_exactly_two_dels() {
        let h = harness(MockStore::new().with_entry("k1", "\"v\""), RecordingChannel::new());

        h.coordinator.invalidate(&request(vec!["k1"])).await.unwrap();

        let dels = h.store.del_ops();
        assert_eq!(dels.len(), 2);
        assert_eq!(dels[0], vec!["k1".to_string()]);
        assert_eq!(dels[1], vec!["k1".to_string()]);

        let invalidations = h.channel.invalidations();
        assert_eq!(invalidations.len(), 1);
        assert_eq!(invalidations[0].keys, vec!["k1".to_string()]);
        assert_eq!(invalidations[0].reason, "config updated");
        assert!(h.metrics.failures().is_empty());
    }

    #[tokio::test]
    async fn test_notify_false_skips_publication() {
        let h = harness(MockStore::new(), RecordingChannel::new());

        h.coordinator
            .invalidate(&request(vec!["k1"]).without_notify())
            .await
            .unwrap();

        assert!(h.channel.invalidations().is_empty());
        assert_eq!(h.store.del_ops().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_domain_never_reaches_store() {
        let h = harness(MockStore::new(), RecordingChannel::new());

        let mut req = request(vec!["k1"]);
        req.domain = "unknown".to_string();

        let err = h.coordinator.invalidate(&req).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(h.store.ops().is_empty());
        assert_eq!(h.metrics.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_validation_rejects_empty_keys() {
        let h = harness(MockStore::new(), RecordingChannel::new());

        let err = h.coordinator.invalidate(&request(vec![])).await.unwrap_err();
        assert!(matches!(err, CacheError::Validation { .. }));
        assert!(h.store.ops().is_empty());
    }

    #[tokio::test]
    async fn test_lock_contention_yields_conflict() {
        let store = Arc::new(MockStore::new());
        let metrics = Arc::new(RecordingMetrics::new());
        let channel = Arc::new(RecordingChannel::new());
        let provider = Arc::new(
            ClientProvider::new().with_client("default", store.clone() as Arc<dyn Store>),
        );
        let policies = Arc::new(
            NamespacePolicyRegistry::new().with_policy(CachePolicy::new("tenant-config", "cfg")),
        );
        let busy = Arc::new(MockLockProvider::always_busy());
        let coordinator = ConsistencyCoordinator::new(provider, policies)
            .with_metrics(metrics.clone())
            .with_notifications(channel.clone())
            .with_lock_factory(Arc::new(MockLockFactory::returning(busy)));

        let err = coordinator.invalidate(&request(vec!["k1"])).await.unwrap_err();

        assert!(matches!(err, CacheError::LockContention { .. }));
        assert!(store.ops().is_empty());

        let contentions = channel.contentions();
        assert_eq!(contentions.len(), 1);
        assert_eq!(contentions[0].lock_resource, "lock:cache:tenant-config:acme");
        assert_eq!(metrics.lock_waits().len(), 1);
        assert_eq!(metrics.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_distributed_lock_used_and_released() {
        let store = Arc::new(MockStore::new());
        let provider = Arc::new(
            ClientProvider::new().with_client("default", store.clone() as Arc<dyn Store>),
        );
        let policies = Arc::new(
            NamespacePolicyRegistry::new().with_policy(CachePolicy::new("tenant-config", "cfg")),
        );
        let lock = Arc::new(MockLockProvider::new());
        let coordinator = ConsistencyCoordinator::new(provider, policies)
            .with_lock_factory(Arc::new(MockLockFactory::returning(lock.clone())));

        coordinator.invalidate(&request(vec!["k1"])).await.unwrap();

        assert_eq!(lock.acquired(), vec!["lock:cache:tenant-config:acme".to_string()]);
        assert_eq!(lock.release_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_lock_factory_degrades_to_in_process() {
        let store = Arc::new(MockStore::new());
        let provider = Arc::new(
            ClientProvider::new().with_client("default", store.clone() as Arc<dyn Store>),
        );
        let policies = Arc::new(
            NamespacePolicyRegistry::new().with_policy(CachePolicy::new("tenant-config", "cfg")),
        );
        let coordinator = ConsistencyCoordinator::new(provider, policies)
            .with_lock_factory(Arc::new(MockLockFactory::failing()));

        // Still succeeds, with in-process locking
        coordinator.invalidate(&request(vec!["k1"])).await.unwrap();
        assert_eq!(store.del_ops().len(), 2);
    }

    #[tokio::test]
    async fn test_second_delete_failure_fails_the_call() {
        let h = harness(
            MockStore::new().with_del_error_on(2, "connection reset"),
            RecordingChannel::new(),
        );

        let err = h.coordinator.invalidate(&request(vec!["k1"])).await.unwrap_err();

        assert_eq!(err.stage(), Some(FailureStage::Unknown));
        assert!(err.to_string().contains("second delete"));
        // No notification for a half-completed invalidation
        assert!(h.channel.invalidations().is_empty());
        assert_eq!(h.metrics.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let h = harness(MockStore::new().with_entry("k1", "\"v\""), RecordingChannel::new());

        h.coordinator.invalidate(&request(vec!["k1"])).await.unwrap();
        // Second invalidation deletes an already-absent key without error
        h.coordinator.invalidate(&request(vec!["k1"])).await.unwrap();

        assert_eq!(h.store.del_ops().len(), 4);
    }

    #[tokio::test]
    async fn test_notification_failure_is_best_effort_by_default() {
        let h = harness(
            MockStore::new(),
            RecordingChannel::new().with_publish_error("broker down"),
        );

        h.coordinator.invalidate(&request(vec!["k1"])).await.unwrap();
        assert_eq!(h.store.del_ops().len(), 2);
    }

    #[tokio::test]
    async fn test_notification_failure_can_be_critical() {
        let store = Arc::new(MockStore::new());
        let channel = Arc::new(RecordingChannel::new().with_publish_error("broker down"));
        let provider = Arc::new(
            ClientProvider::new().with_client("default", store.clone() as Arc<dyn Store>),
        );
        let policies = Arc::new(
            NamespacePolicyRegistry::new().with_policy(CachePolicy::new("tenant-config", "cfg")),
        );
        let coordinator = ConsistencyCoordinator::new(provider, policies)
            .with_notifications(channel)
            .with_config(CoordinatorConfig::default().with_critical_notifications());

        let err = coordinator.invalidate(&request(vec!["k1"])).await.unwrap_err();
        assert_eq!(err.stage(), Some(FailureStage::Unknown));
        // Deletes already applied before the publish attempt
        assert_eq!(store.del_ops().len(), 2);
    }

    #[tokio::test]
    async fn test_request_prefetch_checks_policy() {
        let h = harness(MockStore::new(), RecordingChannel::new());

        let err = h
            .coordinator
            .request_prefetch(&PrefetchRequest {
                domain: "unknown".to_string(),
                tenant_id: "acme".to_string(),
                keys: vec!["k1".to_string()],
            })
            .await
            .unwrap_err();
        assert!(err.is_configuration());

        let outcome = h
            .coordinator
            .request_prefetch(&PrefetchRequest {
                domain: "tenant-config".to_string(),
                tenant_id: "acme".to_string(),
                keys: vec!["k1".to_string(), "k2".to_string()],
            })
            .await
            .unwrap();
        assert_eq!(outcome.refreshed, 2);
        assert_eq!(h.channel.prefetches().len(), 1);
    }

    #[test]
    fn test_lock_resource_composition() {
        assert_eq!(
            lock_resource("tenant-config", "acme"),
            "lock:cache:tenant-config:acme"
        );
    }

    #[tokio::test]
    async fn test_delay_defaults_are_used() {
        // delay_ms: None uses the configured default; keep it at zero so the
        // test does not sleep
        let store = Arc::new(MockStore::new());
        let provider = Arc::new(
            ClientProvider::new().with_client("default", store.clone() as Arc<dyn Store>),
        );
        let policies = Arc::new(
            NamespacePolicyRegistry::new().with_policy(CachePolicy::new("tenant-config", "cfg")),
        );
        let coordinator = ConsistencyCoordinator::new(provider, policies)
            .with_config(CoordinatorConfig::default().with_delay_ms(0));

        let req = InvalidationRequest::new(
            "tenant-config",
            "acme",
            vec!["k1".to_string()],
            "config updated",
        );
        assert!(req.delay_ms.is_none());

        coordinator.invalidate(&req).await.unwrap();
        assert_eq!(store.del_ops().len(), 2);
    }
}
