use std::sync::Arc;

use super::{AsyncCache, CacheProvider, SyncCache};

/// Provider used when caching is turned off; every lookup misses
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCacheProvider;

impl CacheProvider for DisabledCacheProvider {
    fn is_sync_supported(&self) -> bool {
        false
    }

    fn is_async_supported(&self) -> bool {
        false
    }

    fn sync_cache(&self, _name: &str) -> Option<Arc<dyn SyncCache>> {
        None
    }

    fn async_cache(&self, _name: &str) -> Option<Arc<dyn AsyncCache>> {
        None
    }
}
