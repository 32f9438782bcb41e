//! Store implementations

mod memory;
mod redis;

pub use memory::{InMemoryStore, InMemoryStoreConfig};
pub use redis::{RedisStore, RedisStoreConfig};
