use std::fmt;

use thiserror::Error;

/// Boxed error type used at the loader and codec boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Phase of a cache call in which an infrastructure failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Loader,
    Deserialize,
    Persist,
    Unknown,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Loader => write!(f, "loader"),
            FailureStage::Deserialize => write!(f, "deserialize"),
            FailureStage::Persist => write!(f, "persist"),
            FailureStage::Unknown => write!(f, "unknown"),
        }
    }
}

/// Core cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error ({stage}): {message}")]
    Internal {
        stage: FailureStage,
        message: String,
    },

    #[error("Lock contention on resource '{resource}'")]
    LockContention { resource: String },

    /// The origin loader failed. The underlying error is carried unmodified so
    /// callers can tell "the origin failed" apart from a cache failure.
    #[error("{source}")]
    Origin {
        #[source]
        source: BoxError,
    },
}

impl CacheError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(stage: FailureStage, message: impl Into<String>) -> Self {
        Self::Internal {
            stage,
            message: message.into(),
        }
    }

    pub fn lock_contention(resource: impl Into<String>) -> Self {
        Self::LockContention {
            resource: resource.into(),
        }
    }

    pub fn origin(source: BoxError) -> Self {
        Self::Origin { source }
    }

    /// Configuration errors must propagate unchanged through wrapping layers.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// True when the error originated in the caller-supplied loader.
    pub fn is_origin(&self) -> bool {
        matches!(self, Self::Origin { .. })
    }

    /// The failure stage, when one applies.
    pub fn stage(&self) -> Option<FailureStage> {
        match self {
            Self::Internal { stage, .. } => Some(*stage),
            Self::Origin { .. } => Some(FailureStage::Loader),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = CacheError::validation("key must not be blank");
        assert_eq!(error.to_string(), "Validation error: key must not be blank");
    }

    #[test]
    fn test_configuration_error() {
        let error = CacheError::configuration("unknown domain 'sessions'");
        assert!(error.is_configuration());
        assert_eq!(
            error.to_string(),
            "Configuration error: unknown domain 'sessions'"
        );
    }

    #[test]
    fn test_internal_error_carries_stage() {
        let error = CacheError::internal(FailureStage::Persist, "SET failed");
        assert_eq!(error.stage(), Some(FailureStage::Persist));
        assert_eq!(error.to_string(), "Internal error (persist): SET failed");
    }

    #[test]
    fn test_origin_error_is_transparent() {
        let source: BoxError = "origin exploded".into();
        let error = CacheError::origin(source);
        assert!(error.is_origin());
        assert_eq!(error.stage(), Some(FailureStage::Loader));
        assert_eq!(error.to_string(), "origin exploded");
    }

    #[test]
    fn test_lock_contention_error() {
        let error = CacheError::lock_contention("lock:cache:config:t1");
        assert_eq!(
            error.to_string(),
            "Lock contention on resource 'lock:cache:config:t1'"
        );
    }
}
