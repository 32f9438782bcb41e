//! Cache services - read-through loading and consistent invalidation

mod coordinator;
mod read_through;

pub use coordinator::{lock_resource, ConsistencyCoordinator, CoordinatorConfig};
pub use read_through::ReadThroughCache;
