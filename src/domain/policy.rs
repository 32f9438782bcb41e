//! Namespace cache policies

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::CacheError;

/// Strategy governing how a namespace's entries are invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Delete, wait, delete again to catch racing stale repopulation
    #[default]
    DoubleDelete,
    /// Rely on entry TTLs alone
    TtlOnly,
}

impl std::fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvictionPolicy::DoubleDelete => write!(f, "double_delete"),
            EvictionPolicy::TtlOnly => write!(f, "ttl_only"),
        }
    }
}

impl std::str::FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "double_delete" | "doubledelete" => Ok(EvictionPolicy::DoubleDelete),
            "ttl_only" | "ttlonly" => Ok(EvictionPolicy::TtlOnly),
            _ => Err(CacheError::configuration(format!(
                "Unknown eviction policy: {}. Valid policies: double_delete, ttl_only",
                s
            ))),
        }
    }
}

/// Per-domain caching policy. Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct CachePolicy {
    pub domain: String,
    pub key_prefix: String,
    pub key_suffix: Option<String>,
    pub separator: String,
    pub default_ttl_secs: u64,
    pub eviction: EvictionPolicy,
    /// Hit count above which operators want an alert; surfaced by the metrics
    /// consumer, not enforced here
    pub hit_threshold_alert: Option<u64>,
}

impl CachePolicy {
    pub fn new(domain: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            key_prefix: key_prefix.into(),
            key_suffix: None,
            separator: ":".to_string(),
            default_ttl_secs: 3600,
            eviction: EvictionPolicy::default(),
            hit_threshold_alert: None,
        }
    }

    pub fn with_key_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.key_suffix = Some(suffix.into());
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_default_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.default_ttl_secs = ttl_secs;
        self
    }

    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    pub fn with_hit_threshold_alert(mut self, threshold: u64) -> Self {
        self.hit_threshold_alert = Some(threshold);
        self
    }

    /// Composes the fully-qualified store key for a tenant-scoped entry.
    pub fn qualified_key(&self, tenant_id: &str, key: &str) -> String {
        let mut parts = vec![self.key_prefix.as_str(), tenant_id, key];
        if let Some(suffix) = &self.key_suffix {
            parts.push(suffix.as_str());
        }
        parts.join(&self.separator)
    }
}

/// Lookup table from domain name to policy.
///
/// Populated once at startup; consumers treat a missing domain as a hard
/// configuration failure, never as an implicit default.
#[derive(Debug, Default)]
pub struct NamespacePolicyRegistry {
    policies: HashMap<String, CachePolicy>,
}

impl NamespacePolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a policy; later registrations for the same domain win.
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        if let Some(threshold) = policy.hit_threshold_alert {
            tracing::debug!(
                domain = %policy.domain,
                threshold,
                "hit threshold alert configured"
            );
        }
        self.policies.insert(policy.domain.clone(), policy);
        self
    }

    pub fn get(&self, domain: &str) -> Option<&CachePolicy> {
        self.policies.get(domain)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
