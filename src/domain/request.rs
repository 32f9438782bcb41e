//! Read and invalidation request types

use crate::domain::CacheError;

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Parameters for a read-through lookup.
///
/// The loader itself is passed separately as an async closure so the request
/// stays a plain, cloneable value.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    /// Logical cache domain (e.g. "tenant-config")
    pub domain: String,
    /// Store key to read
    pub key: String,
    /// Entry TTL in seconds; absent or zero persists until evicted
    pub ttl_secs: Option<u64>,
    /// Logical client key; falls back to the provider default
    pub client_key: Option<String>,
    /// Tenant the entry belongs to
    pub tenant_id: Option<String>,
}

impl ReadRequest {
    pub fn new(domain: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            key: key.into(),
            ttl_secs: None,
            client_key: None,
            tenant_id: None,
        }
    }

    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = Some(ttl_secs);
        self
    }

    pub fn with_client_key(mut self, client_key: impl Into<String>) -> Self {
        self.client_key = Some(client_key.into());
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Checked before any I/O happens.
    pub fn validate(&self) -> Result<(), CacheError> {
        if is_blank(&self.domain) {
            return Err(CacheError::validation("domain must not be blank"));
        }
        if is_blank(&self.key) {
            return Err(CacheError::validation("key must not be blank"));
        }
        Ok(())
    }
}

/// Parameters for a double-delete invalidation.
#[derive(Debug, Clone)]
pub struct InvalidationRequest {
    pub domain: String,
    pub tenant_id: String,
    pub keys: Vec<String>,
    /// Free-form audit reason, forwarded in the invalidation event
    pub reason: String,
    /// Delay between the two deletes; coordinator default when absent
    pub delay_ms: Option<u64>,
    /// Distributed lock hold duration; coordinator default when absent
    pub lock_duration_ms: Option<u64>,
    /// Publish an invalidation event to other nodes on success
    pub notify: bool,
    pub client_key: Option<String>,
}

impl InvalidationRequest {
    pub fn new(
        domain: impl Into<String>,
        tenant_id: impl Into<String>,
        keys: Vec<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            tenant_id: tenant_id.into(),
            keys,
            reason: reason.into(),
            delay_ms: None,
            lock_duration_ms: None,
            notify: true,
            client_key: None,
        }
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    pub fn with_lock_duration_ms(mut self, lock_duration_ms: u64) -> Self {
        self.lock_duration_ms = Some(lock_duration_ms);
        self
    }

    pub fn without_notify(mut self) -> Self {
        self.notify = false;
        self
    }

    pub fn with_client_key(mut self, client_key: impl Into<String>) -> Self {
        self.client_key = Some(client_key.into());
        self
    }

    /// Checked before any I/O happens.
    pub fn validate(&self) -> Result<(), CacheError> {
        if is_blank(&self.domain) {
            return Err(CacheError::validation("domain must not be blank"));
        }
        if is_blank(&self.tenant_id) {
            return Err(CacheError::validation("tenant_id must not be blank"));
        }
        if self.keys.is_empty() {
            return Err(CacheError::validation("keys must not be empty"));
        }
        if self.keys.iter().any(|key| is_blank(key)) {
            return Err(CacheError::validation("keys must not contain blank entries"));
        }
        Ok(())
    }
}
