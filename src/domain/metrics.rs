//! Observability hook contract

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;

use crate::domain::FailureStage;

/// Uniform envelope for cache observations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricEvent {
    pub domain: String,
    pub tenant_id: Option<String>,
    pub stage: Option<FailureStage>,
    pub error: Option<String>,
    /// Free-form context (key, lock resource, ...); sorted for stable output
    pub extra: BTreeMap<String, String>,
}

impl MetricEvent {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_stage(mut self, stage: FailureStage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Receives hit/miss/lock-wait/origin-latency/failure events.
///
/// Implementations must never panic or surface errors: losing a metric is
/// acceptable, masking the caller's error is not.
pub trait MetricsHook: Send + Sync + Debug {
    fn record_hit(&self, event: &MetricEvent);
    fn record_miss(&self, event: &MetricEvent);
    fn record_origin_latency(&self, event: &MetricEvent, elapsed: Duration);
    fn record_lock_wait(&self, event: &MetricEvent);
    fn record_failure(&self, event: &MetricEvent);
}

/// Default hook when no sink is injected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsHook for NoopMetrics {
    fn record_hit(&self, _event: &MetricEvent) {}
    fn record_miss(&self, _event: &MetricEvent) {}
    fn record_origin_latency(&self, _event: &MetricEvent, _elapsed: Duration) {}
    fn record_lock_wait(&self, _event: &MetricEvent) {}
    fn record_failure(&self, _event: &MetricEvent) {}
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_event_builder() {
        let event = MetricEvent::new("tenant-config")
            .with_tenant("acme")
            .with_stage(FailureStage::Loader)
            .with_error("boom")
            .with_extra("key", "cfg:acme");

        assert_eq!(event.domain, "tenant-config");
        assert_eq!(event.tenant_id.as_deref(), Some("acme"));
        assert_eq!(event.stage, Some(FailureStage::Loader));
        assert_eq!(event.extra.get("key").map(String::as_str), Some("cfg:acme"));
    }

    #[test]
    fn test_noop_metrics_accepts_everything() {
        let hook = NoopMetrics;
        let event = MetricEvent::new("d");
        hook.record_hit(&event);
        hook.record_miss(&event);
        hook.record_origin_latency(&event, Duration::from_millis(5));
        hook.record_lock_wait(&event);
        hook.record_failure(&event);
    }
}
