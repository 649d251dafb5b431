//! Nimbus Runtime - Data store runtime for the Nimbus resource client
//!
//! This crate provides:
//! - The request filter chain, in blocking and async form
//! - Cache providers and the read/write cache filters
//! - The identity map and shared resource records
//! - The resource factory and schema catalog
//! - HTTP transport and payload serialization
//! - The data store that ties them together

pub mod cache;
pub mod datastore;
pub mod error;
pub mod factory;
pub mod filter;
pub mod identity;
pub mod resource;
pub mod schema;
pub mod serializer;
pub mod transport;

// Re-export commonly used types
pub use cache::{
    AsyncCache, CacheConfig, CacheProvider, CacheProviderBuilder, CacheResolver, DisabledCacheProvider,
    InMemoryCacheProvider, SyncCache,
};
pub use datastore::{DataStore, DataStoreBuilder};
pub use error::{ApiError, CollectionField, DataStoreError, Result};
pub use factory::{Materialized, ResourceFactory};
pub use filter::{
    async_filter_fn, sync_filter_fn, AsyncFilter, AsyncFilterChain, AsyncNext, ResourceAction,
    ResourceDataRequest, ResourceDataResult, SyncFilter, SyncFilterChain, SyncNext,
};
pub use identity::IdentityMap;
pub use resource::{CollectionPage, Resource, ResourceData, ResourceHandle, ResourceKey};
pub use schema::{IdentityMapPolicy, ResourceSchema, SchemaCatalog, SchemaRegistry};
pub use serializer::{JsonSerializer, Serializer};
pub use transport::{
    BlockingExecutor, HttpExecutor, HttpResponse, RequestExecutor, SyncRequestExecutor, TransportError,
};

pub use tokio_util::sync::CancellationToken;
