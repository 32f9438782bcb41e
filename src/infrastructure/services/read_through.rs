//! Read-through cache service

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::{de::DeserializeOwned, Serialize};

use crate::domain::{
    BoxError, CacheError, ExpiryFlag, FailureStage, JsonCodec, MetricEvent, MetricsHook,
    NoopMetrics, ReadRequest, ValueCodec,
};
use crate::infrastructure::provider::ClientProvider;

/// Cache-aside reader: serve from the store, else load from the origin,
/// persist, and record observability events.
///
/// Concurrent misses on the same key each invoke the loader independently;
/// there is no cross-call de-duplication.
#[derive(Debug)]
pub struct ReadThroughCache {
    provider: Arc<ClientProvider>,
    metrics: Arc<dyn MetricsHook>,
}

impl ReadThroughCache {
    pub fn new(provider: Arc<ClientProvider>) -> Self {
        Self {
            provider,
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsHook>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Reads `request.key`, falling back to `loader` on a miss and persisting
    /// the loaded value. Values are JSON-encoded at the store boundary.
    pub async fn get_or_load<T, F, Fut>(
        &self,
        request: &ReadRequest,
        loader: F,
    ) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        self.get_or_load_with(request, loader, &JsonCodec).await
    }

    /// As [`get_or_load`](Self::get_or_load), with an explicit codec for
    /// domains whose wire form is not JSON.
    pub async fn get_or_load_with<T, F, Fut>(
        &self,
        request: &ReadRequest,
        loader: F,
        codec: &dyn ValueCodec<T>,
    ) -> Result<T, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        if let Err(err) = request.validate() {
            self.record_failure(request, None, &err);
            return Err(err);
        }

        let store = match self.provider.get_client(request.client_key.as_deref()) {
            Ok(store) => store,
            Err(err) => {
                // Configuration errors already carry the right classification
                let err = if err.is_configuration() {
                    err
                } else {
                    CacheError::internal(
                        FailureStage::Unknown,
                        format!("failed to resolve cache client: {}", err),
                    )
                };
                self.record_failure(request, err.stage(), &err);
                return Err(err);
            }
        };

        match store.get(&request.key).await {
            Ok(Some(raw)) => match codec.decode(&raw) {
                Ok(value) => {
                    self.metrics.record_hit(&self.event(request));
                    tracing::debug!(
                        domain = %request.domain,
                        key = %request.key,
                        "cache hit"
                    );
                    return Ok(value);
                }
                Err(decode_err) => {
                    let err = CacheError::internal(
                        FailureStage::Deserialize,
                        format!(
                            "failed to deserialize cached value for '{}': {}",
                            request.key, decode_err
                        ),
                    );
                    self.record_failure(request, Some(FailureStage::Deserialize), &err);
                    return Err(err);
                }
            },
            Ok(None) => {}
            Err(store_err) => {
                let err = CacheError::internal(
                    FailureStage::Unknown,
                    format!("cache get failed for '{}': {}", request.key, store_err),
                );
                self.record_failure(request, Some(FailureStage::Unknown), &err);
                return Err(err);
            }
        }

        self.metrics.record_miss(&self.event(request));

        let started = Instant::now();
        let loaded = loader().await;
        self.metrics
            .record_origin_latency(&self.event(request), started.elapsed());

        let value = match loaded {
            Ok(value) => value,
            Err(source) => {
                // The origin failed, not the cache: propagate the loader's
                // error unwrapped, tagged only by its variant.
                let err = CacheError::origin(source);
                self.record_failure(request, Some(FailureStage::Loader), &err);
                return Err(err);
            }
        };

        let raw = match codec.encode(&value) {
            Ok(raw) => raw,
            Err(encode_err) => {
                let err = CacheError::internal(
                    FailureStage::Persist,
                    format!(
                        "failed to serialize value for '{}': {}",
                        request.key, encode_err
                    ),
                );
                self.record_failure(request, Some(FailureStage::Persist), &err);
                return Err(err);
            }
        };

        let expiry = request
            .ttl_secs
            .filter(|ttl| *ttl > 0)
            .map(ExpiryFlag::Ex);

        if let Err(store_err) = store.set(&request.key, &raw, expiry).await {
            let err = CacheError::internal(
                FailureStage::Persist,
                format!("cache set failed for '{}': {}", request.key, store_err),
            );
            self.record_failure(request, Some(FailureStage::Persist), &err);
            return Err(err);
        }

        tracing::debug!(
            domain = %request.domain,
            key = %request.key,
            ttl_secs = ?request.ttl_secs,
            "cache miss populated from origin"
        );
        Ok(value)
    }

    fn event(&self, request: &ReadRequest) -> MetricEvent {
        let mut event = MetricEvent::new(&request.domain).with_extra("key", &request.key);
        if let Some(tenant_id) = &request.tenant_id {
            event = event.with_tenant(tenant_id);
        }
        event
    }

    fn record_failure(&self, request: &ReadRequest, stage: Option<FailureStage>, err: &CacheError) {
        let mut event = self.event(request).with_error(err.to_string());
        if let Some(stage) = stage {
            event = event.with_stage(stage);
        }
        self.metrics.record_failure(&event);
    }
}
