//! Filter chain ordering, shared by the blocking and async variants

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{ResourceDataRequest, ResourceDataResult};
use crate::error::{DataStoreError, Result};

/// Ordered, immutable sequence of filters
pub struct FilterChain<F: ?Sized> {
    filters: Vec<Arc<F>>,
}

impl<F: ?Sized> FilterChain<F> {
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    /// Chain starting with every filter of `prefix`
    pub fn from_prefix(prefix: &FilterChain<F>) -> Self {
        prefix.clone()
    }

    /// New chain with `filter` appended; `self` is left unchanged
    pub fn with_filter(&self, filter: Arc<F>) -> Self {
        let mut filters = self.filters.clone();
        filters.push(filter);
        Self { filters }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Continuation positioned at the first filter
    pub fn next(&self) -> Next<'_, F> {
        Next {
            remaining: &self.filters,
        }
    }
}

impl<F: ?Sized> Clone for FilterChain<F> {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.clone(),
        }
    }
}

impl<F: ?Sized> Default for FilterChain<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for FilterChain<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("len", &self.filters.len())
            .finish()
    }
}

/// The rest of a chain, handed to each filter as its continuation
pub struct Next<'a, F: ?Sized> {
    remaining: &'a [Arc<F>],
}

impl<'a, F: ?Sized> Next<'a, F> {
    /// Filters still to run
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    fn split(self) -> Option<(&'a F, Next<'a, F>)> {
        let (head, rest) = self.remaining.split_first()?;
        Some((head.as_ref(), Next { remaining: rest }))
    }
}

impl<F: ?Sized> Clone for Next<'_, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: ?Sized> Copy for Next<'_, F> {}

// ========== Blocking ==========

/// Blocking request filter
pub trait SyncFilter: Send + Sync {
    fn filter(&self, request: ResourceDataRequest, next: SyncNext<'_>) -> Result<ResourceDataResult>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

pub type SyncFilterChain = FilterChain<dyn SyncFilter>;
pub type SyncNext<'a> = Next<'a, dyn SyncFilter>;

impl SyncNext<'_> {
    /// Run the next filter
    pub fn run(self, request: ResourceDataRequest) -> Result<ResourceDataResult> {
        let (filter, rest) = self.split().ok_or(DataStoreError::ChainExhausted)?;
        trace!(filter = filter.name(), action = %request.action, "Dispatching to filter");
        filter.filter(request, rest)
    }
}

impl SyncFilterChain {
    /// New chain with `filter` appended
    pub fn add<T: SyncFilter + 'static>(&self, filter: T) -> Self {
        self.with_filter(Arc::new(filter))
    }

    pub fn execute(&self, request: ResourceDataRequest) -> Result<ResourceDataResult> {
        self.next().run(request)
    }
}

// ========== Async ==========

/// Async request filter
#[async_trait]
pub trait AsyncFilter: Send + Sync {
    async fn filter(
        &self,
        request: ResourceDataRequest,
        next: AsyncNext<'_>,
        cancel: &CancellationToken,
    ) -> Result<ResourceDataResult>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

pub type AsyncFilterChain = FilterChain<dyn AsyncFilter>;
pub type AsyncNext<'a> = Next<'a, dyn AsyncFilter>;

impl AsyncNext<'_> {
    /// Run the next filter
    pub async fn run(
        self,
        request: ResourceDataRequest,
        cancel: &CancellationToken,
    ) -> Result<ResourceDataResult> {
        let (filter, rest) = self.split().ok_or(DataStoreError::ChainExhausted)?;
        trace!(filter = filter.name(), action = %request.action, "Dispatching to filter");
        filter.filter(request, rest, cancel).await
    }
}

impl AsyncFilterChain {
    /// New chain with `filter` appended
    pub fn add<T: AsyncFilter + 'static>(&self, filter: T) -> Self {
        self.with_filter(Arc::new(filter))
    }

    pub async fn execute(
        &self,
        request: ResourceDataRequest,
        cancel: &CancellationToken,
    ) -> Result<ResourceDataResult> {
        self.next().run(request, cancel).await
    }
}

// ========== Inline filters ==========

/// Blocking filter backed by a closure
pub struct SyncFilterFn<F> {
    name: String,
    func: F,
}

impl<F> SyncFilterFn<F>
where
    F: Fn(ResourceDataRequest, SyncNext<'_>) -> Result<ResourceDataResult> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> SyncFilter for SyncFilterFn<F>
where
    F: Fn(ResourceDataRequest, SyncNext<'_>) -> Result<ResourceDataResult> + Send + Sync,
{
    fn filter(&self, request: ResourceDataRequest, next: SyncNext<'_>) -> Result<ResourceDataResult> {
        (self.func)(request, next)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a closure as a blocking filter
pub fn sync_filter_fn<F>(name: impl Into<String>, func: F) -> SyncFilterFn<F>
where
    F: Fn(ResourceDataRequest, SyncNext<'_>) -> Result<ResourceDataResult> + Send + Sync,
{
    SyncFilterFn::new(name, func)
}

/// Async filter backed by a closure returning a boxed future
pub struct AsyncFilterFn<F> {
    name: String,
    func: F,
}

impl<F> AsyncFilterFn<F>
where
    F: for<'a> Fn(ResourceDataRequest, AsyncNext<'a>, &'a CancellationToken) -> BoxFuture<'a, Result<ResourceDataResult>>
        + Send
        + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F> AsyncFilter for AsyncFilterFn<F>
where
    F: for<'a> Fn(ResourceDataRequest, AsyncNext<'a>, &'a CancellationToken) -> BoxFuture<'a, Result<ResourceDataResult>>
        + Send
        + Sync,
{
    async fn filter(
        &self,
        request: ResourceDataRequest,
        next: AsyncNext<'_>,
        cancel: &CancellationToken,
    ) -> Result<ResourceDataResult> {
        (self.func)(request, next, cancel).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a closure as an async filter
pub fn async_filter_fn<F>(name: impl Into<String>, func: F) -> AsyncFilterFn<F>
where
    F: for<'a> Fn(ResourceDataRequest, AsyncNext<'a>, &'a CancellationToken) -> BoxFuture<'a, Result<ResourceDataResult>>
        + Send
        + Sync,
{
    AsyncFilterFn::new(name, func)
}
