//! Data store
//!
//! Entry point for resource access. Requests run through the filter chain
//! (user filters, read cache, write cache, network) and responses are
//! materialized by the resource factory. Async operations take a
//! [`CancellationToken`]; blocking counterparts carry a `_blocking` suffix.

mod builder;

pub use builder::DataStoreBuilder;

use nimbus_core::{types::get_href, CanonicalUri, CollectionQuery, Properties};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{CollectionField, DataStoreError, Result};
use crate::factory::ResourceFactory;
use crate::filter::{AsyncFilterChain, ResourceAction, ResourceDataRequest, ResourceDataResult, SyncFilterChain};
use crate::identity::IdentityMap;
use crate::resource::{is_autogen_href, CollectionPage, Resource, ResourceHandle};
use crate::schema::SchemaCatalog;

/// Shared state behind a [`DataStore`]
pub struct DataStoreInner {
    base_url: String,
    catalog: Arc<dyn SchemaCatalog>,
    factory: ResourceFactory,
    async_chain: Option<AsyncFilterChain>,
    sync_chain: Option<SyncFilterChain>,
}

/// Nested resource resolved from a link property
enum Link<T> {
    Expanded(T),
    Href(String),
}

/// Handle to a configured data store; clones share state
#[derive(Clone)]
pub struct DataStore {
    inner: Arc<DataStoreInner>,
}

impl DataStore {
    pub fn builder(base_url: impl Into<String>) -> DataStoreBuilder {
        DataStoreBuilder::new(base_url)
    }

    pub(crate) fn from_inner(inner: Arc<DataStoreInner>) -> Self {
        Self { inner }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn catalog(&self) -> &Arc<dyn SchemaCatalog> {
        &self.inner.catalog
    }

    pub fn identity_map(&self) -> &Arc<IdentityMap> {
        self.inner.factory.identity_map()
    }

    /// Unsaved resource with an autogen href
    pub fn instantiate<T: Resource>(&self) -> Result<T> {
        self.inner.factory.create(None, None)
    }

    /// Release the identity map
    pub fn dispose(&self) {
        self.inner.factory.dispose();
    }

    // ========== Async operations ==========

    pub async fn get_resource<T: Resource>(&self, href: &str, cancel: &CancellationToken) -> Result<T> {
        let request = self.read_request::<T>(href)?;
        let result = self.execute(request, cancel).await?;
        self.finish_single(result, None)
    }

    pub async fn get_collection<T: Resource>(
        &self,
        href: &str,
        query: Option<&CollectionQuery>,
        cancel: &CancellationToken,
    ) -> Result<CollectionPage<T>> {
        let request = self.collection_request::<T>(href, query)?;
        let result = self.execute(request, cancel).await?;
        self.finish_collection(result)
    }

    /// Create `resource` under `parent_href`; `resource` is linked to the created record
    pub async fn create<T: Resource>(&self, parent_href: &str, resource: &T, cancel: &CancellationToken) -> Result<T> {
        let request = self.create_request(parent_href, resource)?;
        let result = self.execute(request, cancel).await?;
        self.finish_single(result, Some(resource.handle()))
    }

    /// Send local modifications of `resource`
    pub async fn save<T: Resource>(&self, resource: &T, cancel: &CancellationToken) -> Result<T> {
        let request = self.save_request(resource)?;
        let result = self.execute(request, cancel).await?;
        self.finish_save(result, resource)
    }

    pub async fn delete<T: Resource>(&self, resource: &T, cancel: &CancellationToken) -> Result<bool> {
        let request = self.delete_request(resource)?;
        let result = self.execute(request, cancel).await?;
        Ok(result.is_success())
    }

    /// Resolve the resource linked from `property`, from its expanded payload when present
    pub async fn get_link<T: Resource>(
        &self,
        handle: &ResourceHandle,
        property: &str,
        cancel: &CancellationToken,
    ) -> Result<T> {
        match self.resolve_link::<T>(handle, property)? {
            Link::Expanded(resource) => Ok(resource),
            Link::Href(href) => self.get_resource(&href, cancel).await,
        }
    }

    async fn execute(&self, request: ResourceDataRequest, cancel: &CancellationToken) -> Result<ResourceDataResult> {
        let chain = self
            .inner
            .async_chain
            .as_ref()
            .ok_or(DataStoreError::ExecutorUnavailable("async"))?;
        if cancel.is_cancelled() {
            return Err(DataStoreError::Cancelled);
        }
        let result = chain.execute(request, cancel).await?;
        if cancel.is_cancelled() {
            return Err(DataStoreError::Cancelled);
        }
        Ok(result)
    }

    // ========== Blocking operations ==========

    pub fn get_resource_blocking<T: Resource>(&self, href: &str) -> Result<T> {
        let request = self.read_request::<T>(href)?;
        let result = self.execute_blocking(request)?;
        self.finish_single(result, None)
    }

    pub fn get_collection_blocking<T: Resource>(
        &self,
        href: &str,
        query: Option<&CollectionQuery>,
    ) -> Result<CollectionPage<T>> {
        let request = self.collection_request::<T>(href, query)?;
        let result = self.execute_blocking(request)?;
        self.finish_collection(result)
    }

    pub fn create_blocking<T: Resource>(&self, parent_href: &str, resource: &T) -> Result<T> {
        let request = self.create_request(parent_href, resource)?;
        let result = self.execute_blocking(request)?;
        self.finish_single(result, Some(resource.handle()))
    }

    pub fn save_blocking<T: Resource>(&self, resource: &T) -> Result<T> {
        let request = self.save_request(resource)?;
        let result = self.execute_blocking(request)?;
        self.finish_save(result, resource)
    }

    pub fn delete_blocking<T: Resource>(&self, resource: &T) -> Result<bool> {
        let request = self.delete_request(resource)?;
        let result = self.execute_blocking(request)?;
        Ok(result.is_success())
    }

    pub fn get_link_blocking<T: Resource>(&self, handle: &ResourceHandle, property: &str) -> Result<T> {
        match self.resolve_link::<T>(handle, property)? {
            Link::Expanded(resource) => Ok(resource),
            Link::Href(href) => self.get_resource_blocking(&href),
        }
    }

    fn execute_blocking(&self, request: ResourceDataRequest) -> Result<ResourceDataResult> {
        let chain = self
            .inner
            .sync_chain
            .as_ref()
            .ok_or(DataStoreError::ExecutorUnavailable("blocking"))?;
        chain.execute(request)
    }

    // ========== Request construction ==========

    /// Qualify a relative href against the base URL
    fn qualify(&self, href: &str) -> Result<CanonicalUri> {
        if href.is_empty() || is_autogen_href(href) {
            return Err(DataStoreError::InvalidHref(href.to_string()));
        }
        let absolute = if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.inner.base_url, href)
        } else {
            format!("{}/{}", self.inner.base_url, href)
        };
        CanonicalUri::parse(&absolute).map_err(|e| DataStoreError::InvalidHref(format!("{}: {}", href, e)))
    }

    fn saved_href<T: Resource>(resource: &T) -> Result<String> {
        match resource.href() {
            Some(href) if !is_autogen_href(&href) => Ok(href),
            Some(href) => Err(DataStoreError::InvalidHref(format!(
                "{} has not been created yet",
                href
            ))),
            None => Err(DataStoreError::InvalidHref(format!(
                "{} has no href",
                T::TYPE_NAME
            ))),
        }
    }

    fn read_request<T: Resource>(&self, href: &str) -> Result<ResourceDataRequest> {
        Ok(ResourceDataRequest::new(ResourceAction::Read, T::TYPE_NAME, self.qualify(href)?))
    }

    fn collection_request<T: Resource>(&self, href: &str, query: Option<&CollectionQuery>) -> Result<ResourceDataRequest> {
        let collection_type = self
            .inner
            .catalog
            .collection_type_for(T::TYPE_NAME)
            .ok_or_else(|| DataStoreError::UnknownResourceType(format!("collection of {}", T::TYPE_NAME)))?;

        let mut uri = self.qualify(href)?;
        if let Some(query) = query {
            uri = uri.with_query(&query.to_query_string()?);
        }
        Ok(ResourceDataRequest::new(ResourceAction::Read, collection_type, uri))
    }

    fn create_request<T: Resource>(&self, parent_href: &str, resource: &T) -> Result<ResourceDataRequest> {
        if !resource.handle().is_new() {
            return Err(DataStoreError::InvalidHref(format!(
                "{} already exists at {}",
                T::TYPE_NAME,
                resource.href().unwrap_or_default()
            )));
        }
        let body = creation_payload(resource.handle());
        Ok(ResourceDataRequest::new(ResourceAction::Create, T::TYPE_NAME, self.qualify(parent_href)?).with_body(body))
    }

    fn save_request<T: Resource>(&self, resource: &T) -> Result<ResourceDataRequest> {
        let href = Self::saved_href(resource)?;
        let data = resource.handle().data();
        let body = if data.is_dirty() {
            data.dirty_properties()
        } else {
            data.properties()
        };
        debug!(href = %href, fields = body.len(), "Saving resource");
        Ok(ResourceDataRequest::new(ResourceAction::Update, T::TYPE_NAME, self.qualify(&href)?).with_body(body))
    }

    fn delete_request<T: Resource>(&self, resource: &T) -> Result<ResourceDataRequest> {
        let href = Self::saved_href(resource)?;
        Ok(ResourceDataRequest::new(ResourceAction::Delete, T::TYPE_NAME, self.qualify(&href)?))
    }

    // ========== Materialization ==========

    fn finish_single<T: Resource>(&self, result: ResourceDataResult, link_from: Option<&ResourceHandle>) -> Result<T> {
        let body = result.body.ok_or_else(|| {
            DataStoreError::UnexpectedResponse(format!("{} of {} returned no body", result.action, T::TYPE_NAME))
        })?;
        self.inner.factory.create(Some(body), link_from)
    }

    fn finish_save<T: Resource>(&self, result: ResourceDataResult, resource: &T) -> Result<T> {
        match result.body {
            Some(body) => self.inner.factory.create(Some(body), Some(resource.handle())),
            None => {
                let handle = resource.handle().clone();
                handle.data().clear_dirty();
                Ok(T::from_handle(handle))
            }
        }
    }

    fn finish_collection<T: Resource>(&self, result: ResourceDataResult) -> Result<CollectionPage<T>> {
        let collection_type = result
            .type_name
            .clone()
            .or_else(|| self.inner.catalog.collection_type_for(T::TYPE_NAME))
            .ok_or_else(|| DataStoreError::UnknownResourceType(format!("collection of {}", T::TYPE_NAME)))?;

        let body = result.body.ok_or_else(|| DataStoreError::InvalidCollectionPayload {
            type_name: T::TYPE_NAME.to_string(),
            field: CollectionField::Items,
        })?;
        self.inner.factory.create_collection(&collection_type, body)
    }

    fn resolve_link<T: Resource>(&self, handle: &ResourceHandle, property: &str) -> Result<Link<T>> {
        let not_a_link = || {
            DataStoreError::InvalidHref(format!(
                "property '{}' of {} is not a link",
                property,
                handle.type_name()
            ))
        };

        let Some(Value::Object(nested)) = handle.get(property) else {
            return Err(not_a_link());
        };
        let href = get_href(&nested).ok_or_else(not_a_link)?.to_string();

        if nested.len() > 1 {
            debug!(href = %href, property, "Resolving expanded link");
            return self.inner.factory.existing_or_create(nested).map(Link::Expanded);
        }
        Ok(Link::Href(href))
    }
}

impl std::fmt::Debug for DataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("base_url", &self.inner.base_url)
            .field("identity_map_len", &self.identity_map().len())
            .finish()
    }
}

/// Every property except a minted autogen href
fn creation_payload(handle: &ResourceHandle) -> Properties {
    let mut body = handle.properties();
    if get_href(&body).map_or(false, is_autogen_href) {
        body.remove("href");
    }
    body
}
