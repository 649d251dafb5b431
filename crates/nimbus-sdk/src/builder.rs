//! Client builder

use nimbus_runtime::{
    AsyncFilter, BlockingExecutor, DataStore, DataStoreBuilder, DataStoreError, HttpExecutor,
    RequestExecutor, SchemaCatalog, SyncFilter, SyncRequestExecutor,
};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Result, SdkError};

/// Builder that turns a [`ClientConfig`] into a ready [`DataStore`]
pub struct ClientBuilder {
    config: ClientConfig,
    catalog: Option<Arc<dyn SchemaCatalog>>,
    executor: Option<Arc<dyn RequestExecutor>>,
    sync_executor: Option<Arc<dyn SyncRequestExecutor>>,
    blocking: bool,
    async_filters: Vec<Arc<dyn AsyncFilter>>,
    sync_filters: Vec<Arc<dyn SyncFilter>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            catalog: None,
            executor: None,
            sync_executor: None,
            blocking: false,
            async_filters: Vec::new(),
            sync_filters: Vec::new(),
        }
    }

    /// Start from a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(ClientConfig::from_file(path)?))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Schema catalog describing the resource types
    pub fn with_catalog(mut self, catalog: Arc<dyn SchemaCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Replace the HTTP executor
    pub fn with_executor(mut self, executor: Arc<dyn RequestExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Replace the executor used by the `_blocking` operations
    pub fn with_sync_executor(mut self, executor: Arc<dyn SyncRequestExecutor>) -> Self {
        self.sync_executor = Some(executor);
        self.blocking = true;
        self
    }

    /// Enable the `_blocking` operations.
    ///
    /// Without an explicit sync executor the async executor is wrapped in a
    /// [`BlockingExecutor`], which owns a runtime and so must be built and
    /// dropped outside of any async context.
    pub fn with_blocking(mut self, enabled: bool) -> Self {
        self.blocking = enabled;
        self
    }

    pub fn with_async_filter(mut self, filter: impl AsyncFilter + 'static) -> Self {
        self.async_filters.push(Arc::new(filter));
        self
    }

    pub fn with_sync_filter(mut self, filter: impl SyncFilter + 'static) -> Self {
        self.sync_filters.push(Arc::new(filter));
        self
    }

    pub fn build(self) -> Result<DataStore> {
        self.config.validate()?;
        let catalog = self
            .catalog
            .ok_or_else(|| SdkError::ConfigError("A schema catalog is required".to_string()))?;

        let executor: Arc<dyn RequestExecutor> = match self.executor {
            Some(executor) => executor,
            None => Arc::new(
                HttpExecutor::with_timeout(self.config.timeout()).map_err(DataStoreError::from)?,
            ),
        };

        let sync_executor: Option<Arc<dyn SyncRequestExecutor>> = match self.sync_executor {
            Some(executor) => Some(executor),
            None if self.blocking => Some(Arc::new(
                BlockingExecutor::new(executor.clone()).map_err(DataStoreError::from)?,
            )),
            None => None,
        };

        debug!(
            base_url = %self.config.base_url,
            cache_enabled = self.config.cache.enabled,
            blocking = sync_executor.is_some(),
            "Building data store from client configuration"
        );

        let mut builder = DataStoreBuilder::new(self.config.base_url.trim())
            .with_catalog(catalog)
            .with_executor(executor)
            .with_cache_provider(self.config.cache.to_provider())
            .with_identity_map_expiration(self.config.identity_map_expiration());
        if let Some(sync_executor) = sync_executor {
            builder = builder.with_sync_executor(sync_executor);
        }
        for filter in self.async_filters {
            builder = builder.with_shared_async_filter(filter);
        }
        for filter in self.sync_filters {
            builder = builder.with_shared_sync_filter(filter);
        }

        Ok(builder.build()?)
    }
}
