use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{DataStore, DataStoreInner};
use crate::cache::{CacheProvider, CacheResolver, DisabledCacheProvider, InMemoryCacheProvider};
use crate::error::{DataStoreError, Result};
use crate::factory::ResourceFactory;
use crate::filter::{
    AsyncFilter, AsyncFilterChain, AsyncNetworkFilter, ReadCacheFilter, SyncFilter, SyncFilterChain,
    SyncNetworkFilter, WriteCacheFilter,
};
use crate::identity::{IdentityMap, DEFAULT_SLIDING_EXPIRATION};
use crate::schema::{SchemaCatalog, SchemaRegistry};
use crate::serializer::{JsonSerializer, Serializer};
use crate::transport::{RequestExecutor, SyncRequestExecutor};
use nimbus_core::CanonicalUri;

/// Builder for [`DataStore`]
pub struct DataStoreBuilder {
    base_url: String,
    executor: Option<Arc<dyn RequestExecutor>>,
    sync_executor: Option<Arc<dyn SyncRequestExecutor>>,
    serializer: Arc<dyn Serializer>,
    catalog: Arc<dyn SchemaCatalog>,
    cache_provider: Arc<dyn CacheProvider>,
    identity_map_expiration: Duration,
    async_filters: Vec<Arc<dyn AsyncFilter>>,
    sync_filters: Vec<Arc<dyn SyncFilter>>,
}

impl DataStoreBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            executor: None,
            sync_executor: None,
            serializer: Arc::new(JsonSerializer),
            catalog: Arc::new(SchemaRegistry::new()),
            cache_provider: Arc::new(InMemoryCacheProvider::new()),
            identity_map_expiration: DEFAULT_SLIDING_EXPIRATION,
            async_filters: Vec::new(),
            sync_filters: Vec::new(),
        }
    }

    /// Executor used by the async operations
    pub fn with_executor(mut self, executor: Arc<dyn RequestExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Executor used by the `_blocking` operations
    pub fn with_sync_executor(mut self, executor: Arc<dyn SyncRequestExecutor>) -> Self {
        self.sync_executor = Some(executor);
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn SchemaCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_cache_provider(mut self, provider: Arc<dyn CacheProvider>) -> Self {
        self.cache_provider = provider;
        self
    }

    /// Turn caching off
    pub fn without_cache(self) -> Self {
        self.with_cache_provider(Arc::new(DisabledCacheProvider))
    }

    pub fn with_identity_map_expiration(mut self, expiration: Duration) -> Self {
        self.identity_map_expiration = expiration;
        self
    }

    /// Async filter run ahead of the built-in filters
    pub fn with_async_filter(mut self, filter: impl AsyncFilter + 'static) -> Self {
        self.async_filters.push(Arc::new(filter));
        self
    }

    /// Blocking filter run ahead of the built-in filters
    pub fn with_sync_filter(mut self, filter: impl SyncFilter + 'static) -> Self {
        self.sync_filters.push(Arc::new(filter));
        self
    }

    pub fn with_shared_async_filter(mut self, filter: Arc<dyn AsyncFilter>) -> Self {
        self.async_filters.push(filter);
        self
    }

    pub fn with_shared_sync_filter(mut self, filter: Arc<dyn SyncFilter>) -> Self {
        self.sync_filters.push(filter);
        self
    }

    pub fn build(self) -> Result<DataStore> {
        if self.executor.is_none() && self.sync_executor.is_none() {
            return Err(DataStoreError::ExecutorUnavailable("async or blocking"));
        }

        let base_url = self.base_url.trim_end_matches('/').to_string();
        CanonicalUri::parse(&base_url)
            .map_err(|e| DataStoreError::InvalidHref(format!("{}: {}", base_url, e)))?;

        let resolver = CacheResolver::new(self.cache_provider);
        let identity_map = Arc::new(IdentityMap::new(self.identity_map_expiration));

        let async_chain = self.executor.map(|executor| {
            let mut chain = AsyncFilterChain::new();
            for filter in self.async_filters {
                chain = chain.with_filter(filter);
            }
            if resolver.is_async_enabled() {
                chain = chain
                    .add(ReadCacheFilter::new(resolver.clone(), self.catalog.clone()))
                    .add(WriteCacheFilter::new(resolver.clone(), self.catalog.clone()));
            }
            chain.add(AsyncNetworkFilter::new(executor, self.serializer.clone()))
        });

        let sync_chain = self.sync_executor.map(|executor| {
            let mut chain = SyncFilterChain::new();
            for filter in self.sync_filters {
                chain = chain.with_filter(filter);
            }
            if resolver.is_sync_enabled() {
                chain = chain
                    .add(ReadCacheFilter::new(resolver.clone(), self.catalog.clone()))
                    .add(WriteCacheFilter::new(resolver.clone(), self.catalog.clone()));
            }
            chain.add(SyncNetworkFilter::new(executor, self.serializer.clone()))
        });

        info!(
            base_url = %base_url,
            async_filters = async_chain.as_ref().map_or(0, |c| c.len()),
            sync_filters = sync_chain.as_ref().map_or(0, |c| c.len()),
            "Data store created"
        );

        let catalog = self.catalog;
        let inner = Arc::new_cyclic(|store| DataStoreInner {
            base_url,
            factory: ResourceFactory::attached(catalog.clone(), identity_map, store.clone()),
            catalog,
            async_chain,
            sync_chain,
        });
        Ok(DataStore::from_inner(inner))
    }
}
