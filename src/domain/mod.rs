//! Domain layer - types, traits and errors with no I/O of their own

pub mod codec;
mod error;
pub mod lock;
pub mod metrics;
pub mod notification;
pub mod policy;
pub mod request;
pub mod store;

pub use codec::{JsonCodec, ValueCodec};
pub use error::{BoxError, CacheError, FailureStage};
pub use lock::{LockError, LockGuard, LockProvider, LockProviderFactory};
pub use metrics::{MetricEvent, MetricsHook, NoopMetrics};
pub use notification::{
    InvalidationEvent, LockContentionEvent, NoopNotificationChannel, NotificationChannel,
    PrefetchOutcome, PrefetchRequest,
};
pub use policy::{CachePolicy, EvictionPolicy, NamespacePolicyRegistry};
pub use request::{InvalidationRequest, ReadRequest};
pub use store::{ExpiryFlag, Store, StoreError};
