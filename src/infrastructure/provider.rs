//! Store client routing and fallback

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::domain::{CacheError, Store};
use crate::infrastructure::store::InMemoryStore;

/// Configured identity of one logical store client.
#[derive(Debug, Clone, Default)]
pub struct ClientDescriptor {
    /// Routing key; some deployments configure only a namespace
    pub key: Option<String>,
    /// Namespace prefix callers compose into fully-qualified keys
    pub namespace: Option<String>,
}

impl ClientDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Resolves a logical client key to a concrete store handle.
///
/// When no real client map is injected, a single process-local in-memory
/// store is constructed lazily and shared by every caller. That mode is for
/// development and tests only and logs a warning when activated.
#[derive(Debug, Default)]
pub struct ClientProvider {
    default_client_key: Option<String>,
    descriptors: Vec<ClientDescriptor>,
    clients: Option<HashMap<String, Arc<dyn Store>>>,
    fallback: OnceLock<Arc<InMemoryStore>>,
}

impl ClientProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_client_key(mut self, key: impl Into<String>) -> Self {
        self.default_client_key = Some(key.into());
        self
    }

    /// Registers a configured client identity, in configuration order.
    pub fn with_descriptor(mut self, descriptor: ClientDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Injects a concrete store handle for a client key. The first injection
    /// switches the provider out of fallback mode.
    pub fn with_client(mut self, key: impl Into<String>, store: Arc<dyn Store>) -> Self {
        self.clients
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), store);
        self
    }

    /// The client key used when the caller supplies none (or a blank one).
    fn effective_key(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .or_else(|| self.default_client_key.clone())
            .or_else(|| {
                self.descriptors
                    .first()
                    .and_then(|descriptor| descriptor.key.clone())
            })
            .or_else(|| {
                self.descriptors
                    .first()
                    .and_then(|descriptor| descriptor.namespace.clone())
            })
            .unwrap_or_else(|| "default".to_string())
    }

    /// Resolves the store handle for a client key.
    pub fn get_client(&self, client_key: Option<&str>) -> Result<Arc<dyn Store>, CacheError> {
        let effective = self.effective_key(client_key);

        match &self.clients {
            Some(clients) => clients.get(&effective).cloned().ok_or_else(|| {
                CacheError::configuration(format!(
                    "no cache client registered for key '{}'",
                    effective
                ))
            }),
            None => Ok(self.fallback_store()),
        }
    }

    /// The configured namespace for a resolved client key; absence is not an
    /// error at this layer.
    pub fn get_namespace_prefix(&self, client_key: Option<&str>) -> Option<String> {
        let effective = self.effective_key(client_key);
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.key.as_deref() == Some(effective.as_str()))
            .and_then(|descriptor| descriptor.namespace.clone())
    }

    fn fallback_store(&self) -> Arc<dyn Store> {
        self.fallback
            .get_or_init(|| {
                tracing::warn!(
                    "no store clients configured; using process-local in-memory fallback \
                     (not suitable for production)"
                );
                Arc::new(InMemoryStore::new())
            })
            .clone()
    }
}
