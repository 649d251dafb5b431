use std::sync::Arc;
use tracing::trace;

use super::{AsyncCache, CacheProvider, DisabledCacheProvider, SyncCache};

/// Resolves the cache region for a resource type
#[derive(Clone)]
pub struct CacheResolver {
    provider: Arc<dyn CacheProvider>,
}

impl CacheResolver {
    pub fn new(provider: Arc<dyn CacheProvider>) -> Self {
        Self { provider }
    }

    /// Resolver that never finds a region
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledCacheProvider))
    }

    pub fn is_sync_enabled(&self) -> bool {
        self.provider.is_sync_supported()
    }

    pub fn is_async_enabled(&self) -> bool {
        self.provider.is_async_supported()
    }

    /// Blocking region named after `type_name`
    pub fn sync_cache(&self, type_name: &str) -> Option<Arc<dyn SyncCache>> {
        if !self.provider.is_sync_supported() {
            trace!(type_name, "Blocking cache unavailable");
            return None;
        }
        self.provider.sync_cache(type_name)
    }

    /// Async region named after `type_name`
    pub fn async_cache(&self, type_name: &str) -> Option<Arc<dyn AsyncCache>> {
        if !self.provider.is_async_supported() {
            trace!(type_name, "Async cache unavailable");
            return None;
        }
        self.provider.async_cache(type_name)
    }
}

impl Default for CacheResolver {
    fn default() -> Self {
        Self::disabled()
    }
}
