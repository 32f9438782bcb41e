//! Observability infrastructure - metrics and tracing

mod metrics;
mod tracing_setup;

pub use metrics::CacheMetrics;
pub use tracing_setup::init_tracing;
