//! Cache layer
//!
//! Per-resource-type cache regions holding flattened payloads keyed by href.
//! Providers may support blocking access, async access, or neither.

mod config;
mod disabled;
mod memory;
mod resolver;

pub use config::{CacheConfig, CacheProviderBuilder, DEFAULT_TTI, DEFAULT_TTL};
pub use disabled::DisabledCacheProvider;
pub use memory::{CacheEntry, InMemoryCacheProvider, MemoryCache};
pub use resolver::CacheResolver;

use async_trait::async_trait;
use nimbus_core::Properties;
use std::sync::Arc;

/// Blocking cache region
pub trait SyncCache: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Option<Properties>;

    fn put(&self, key: &str, value: Properties);

    fn remove(&self, key: &str) -> Option<Properties>;
}

/// Async cache region, for providers backed by a remote store
#[async_trait]
pub trait AsyncCache: Send + Sync {
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Option<Properties>;

    async fn put(&self, key: &str, value: Properties);

    async fn remove(&self, key: &str) -> Option<Properties>;
}

/// Source of named cache regions
pub trait CacheProvider: Send + Sync {
    fn is_sync_supported(&self) -> bool;

    fn is_async_supported(&self) -> bool;

    /// Blocking region by name, `None` when blocking access is unsupported
    fn sync_cache(&self, name: &str) -> Option<Arc<dyn SyncCache>>;

    /// Async region by name, `None` when async access is unsupported
    fn async_cache(&self, name: &str) -> Option<Arc<dyn AsyncCache>>;
}
