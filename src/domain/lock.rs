//! Distributed lock contract
//!
//! The lock algorithm itself (Redlock-style consensus, renewal, quorum) lives
//! outside this crate; only the consumed acquire/release surface is defined
//! here, with a tagged error so callers never have to sniff error strings to
//! tell "busy" from "broken".

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Lock acquisition and provider failures.
#[derive(Debug, Clone, Error)]
pub enum LockError {
    /// The resource is currently held by another owner; retryable.
    #[error("lock resource '{resource}' is currently held")]
    Busy { resource: String },

    /// Acquisition did not complete within the allotted time.
    #[error("timed out acquiring lock on '{resource}'")]
    Timeout { resource: String },

    /// No usable lock provider could be reached or constructed.
    #[error("lock provider unavailable: {message}")]
    Unavailable { message: String },

    /// Any other provider-side failure.
    #[error("lock provider error: {message}")]
    Provider { message: String },
}

impl LockError {
    pub fn busy(resource: impl Into<String>) -> Self {
        Self::Busy {
            resource: resource.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}

/// A held lock. Dropping without [`release`](LockGuard::release) leaves expiry
/// to the provider's TTL semantics.
#[async_trait]
pub trait LockGuard: Send {
    async fn release(self: Box<Self>) -> Result<(), LockError>;
}

/// Mutual exclusion across processes.
///
/// `ttl` bounds how long the provider may consider the lock held if the owner
/// dies; renewal is the provider's concern, not the caller's.
#[async_trait]
pub trait LockProvider: Send + Sync + Debug {
    async fn acquire(&self, resource: &str, ttl: Duration)
        -> Result<Box<dyn LockGuard>, LockError>;
}

/// Builds the lock provider on first use, so a missing or broken lock backend
/// surfaces as a degradation rather than a startup failure.
pub trait LockProviderFactory: Send + Sync + Debug {
    fn create(&self) -> Result<Arc<dyn LockProvider>, LockError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_error_busy_is_distinguishable() {
        let err = LockError::busy("lock:cache:config:t1");
        assert!(err.is_busy());
        assert!(!LockError::provider("boom").is_busy());
    }

    #[test]
    fn test_lock_error_display() {
        assert_eq!(
            LockError::busy("r1").to_string(),
            "lock resource 'r1' is currently held"
        );
        assert_eq!(
            LockError::unavailable("not registered").to_string(),
            "lock provider unavailable: not registered"
        );
    }
}
