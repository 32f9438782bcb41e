//! In-process lock provider
//!
//! Degraded mode for when no distributed lock backend is available: mutual
//! exclusion holds within this process only, which the coordinator surfaces
//! with a warning at resolution time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use crate::domain::{LockError, LockGuard, LockProvider};

/// Keyed in-process mutexes handed out as owned guards.
#[derive(Debug, Default)]
pub struct InProcessLockProvider {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl InProcessLockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex_for(&self, resource: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(resource.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

struct InProcessGuard {
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

#[async_trait]
impl LockGuard for InProcessGuard {
    async fn release(self: Box<Self>) -> Result<(), LockError> {
        Ok(())
    }
}

#[async_trait]
impl LockProvider for InProcessLockProvider {
    async fn acquire(
        &self,
        resource: &str,
        _ttl: Duration,
    ) -> Result<Box<dyn LockGuard>, LockError> {
        // The TTL bounds cross-process staleness; an in-process guard is
        // released deterministically, so waiting here is the whole contract.
        let mutex = self.mutex_for(resource);
        let guard = mutex.lock_owned().await;
        Ok(Box::new(InProcessGuard { _guard: guard }))
    }
}
