//! Infrastructure layer - store backends, locking, notification, services

pub mod lock;
pub mod notification;
pub mod observability;
pub mod provider;
pub mod services;
pub mod store;

pub use lock::InProcessLockProvider;
pub use notification::{RedisChannelConfig, RedisNotificationChannel};
pub use observability::{init_tracing, CacheMetrics};
pub use provider::{ClientDescriptor, ClientProvider};
pub use services::{lock_resource, ConsistencyCoordinator, CoordinatorConfig, ReadThroughCache};
pub use store::{InMemoryStore, InMemoryStoreConfig, RedisStore, RedisStoreConfig};
