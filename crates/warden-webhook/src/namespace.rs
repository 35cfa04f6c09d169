//! Namespace resolution for review context

use crate::error::WebhookError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use warden_types::Namespace;

/// Source of namespace objects.
#[async_trait]
pub trait NamespaceReader: Send + Sync {
    /// `Ok(None)` means the namespace does not exist in this source.
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, WebhookError>;
}

/// Namespace cache fed by the external reconciler.
#[derive(Debug, Default)]
pub struct InMemoryNamespaceStore {
    namespaces: RwLock<HashMap<String, Namespace>>,
}

impl InMemoryNamespaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, namespace: Namespace) {
        let name = namespace.name().to_string();
        self.namespaces.write().insert(name, namespace);
    }

    /// Returns the removed namespace, if it was cached.
    pub fn remove(&self, name: &str) -> Option<Namespace> {
        self.namespaces.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Namespace> {
        self.namespaces.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.namespaces.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.read().is_empty()
    }
}

#[async_trait]
impl NamespaceReader for InMemoryNamespaceStore {
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, WebhookError> {
        Ok(self.get(name))
    }
}

/// Reader that knows every namespace by name only.
///
/// Used as the direct reader when no control plane is reachable: any
/// namespace missing from the cache resolves to a bare object without labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct BareNamespaceReader;

#[async_trait]
impl NamespaceReader for BareNamespaceReader {
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, WebhookError> {
        Ok(Some(Namespace::new(name)))
    }
}

/// Cached read with a direct fallback.
///
/// The direct read covers a cache that has not yet observed a namespace
/// created moments before the request.
#[derive(Clone)]
pub struct NamespaceLookup {
    cached: Arc<dyn NamespaceReader>,
    direct: Arc<dyn NamespaceReader>,
}

impl NamespaceLookup {
    pub fn new(cached: Arc<dyn NamespaceReader>, direct: Arc<dyn NamespaceReader>) -> Self {
        Self { cached, direct }
    }

    pub async fn resolve(&self, name: &str) -> Result<Namespace, WebhookError> {
        if let Some(ns) = self.cached.get_namespace(name).await? {
            return Ok(ns);
        }
        debug!(namespace = %name, "Namespace not cached, reading directly");
        self.direct
            .get_namespace(name)
            .await?
            .ok_or_else(|| WebhookError::NamespaceNotFound(name.to_string()))
    }
}

impl std::fmt::Debug for NamespaceLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceLookup").finish_non_exhaustive()
    }
}
