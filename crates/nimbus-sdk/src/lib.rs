//! Nimbus SDK
//!
//! Configuration loading, logging setup and the [`ClientBuilder`] that wires
//! a [`DataStore`] together from a [`ClientConfig`].

pub mod builder;
pub mod config;
pub mod error;
pub mod logging;

pub use builder::ClientBuilder;
pub use config::{CacheRegionConfig, CacheSettings, ClientConfig};
pub use error::{Result, SdkError};
pub use logging::init_logging;

pub use nimbus_core::query::field;
pub use nimbus_core::{CollectionQuery, Properties};
pub use nimbus_runtime::{
    CancellationToken, CollectionPage, DataStore, DataStoreError, Resource, ResourceHandle,
    ResourceSchema, SchemaRegistry,
};
