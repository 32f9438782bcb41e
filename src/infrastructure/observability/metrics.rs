//! Metrics hook backed by the `metrics` facade
//!
//! Emits through whatever recorder the host application installs (Prometheus
//! exporter or otherwise). Labels stay low-cardinality: domain and stage,
//! never raw keys or tenants.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::domain::{MetricEvent, MetricsHook};

/// Facade-backed implementation of [`MetricsHook`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn new() -> Self {
        Self
    }

    fn domain_labels(event: &MetricEvent) -> [(&'static str, String); 1] {
        [("domain", event.domain.clone())]
    }
}

impl MetricsHook for CacheMetrics {
    fn record_hit(&self, event: &MetricEvent) {
        counter!("cache_hits_total", &Self::domain_labels(event)).increment(1);
    }

    fn record_miss(&self, event: &MetricEvent) {
        counter!("cache_misses_total", &Self::domain_labels(event)).increment(1);
    }

    fn record_origin_latency(&self, event: &MetricEvent, elapsed: Duration) {
        histogram!("cache_origin_latency_seconds", &Self::domain_labels(event))
            .record(elapsed.as_secs_f64());
    }

    fn record_lock_wait(&self, event: &MetricEvent) {
        counter!("cache_lock_wait_total", &Self::domain_labels(event)).increment(1);
    }

    fn record_failure(&self, event: &MetricEvent) {
        let stage = event
            .stage
            .map(|stage| stage.to_string())
            .unwrap_or_else(|| "none".to_string());
        let labels = [("domain", event.domain.clone()), ("stage", stage)];
        counter!("cache_failures_total", &labels).increment(1);
    }
}
