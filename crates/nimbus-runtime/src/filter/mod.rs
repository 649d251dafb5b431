//! Request filter chain
//!
//! Every data store request flows through an ordered chain of filters. Each
//! filter either answers the request itself or hands it to the rest of the
//! chain; the last filter is normally the network filter.

mod cache;
mod chain;
mod network;

pub use cache::{ReadCacheFilter, WriteCacheFilter};
pub use chain::{
    async_filter_fn, sync_filter_fn, AsyncFilter, AsyncFilterChain, AsyncFilterFn, AsyncNext,
    FilterChain, Next, SyncFilter, SyncFilterChain, SyncFilterFn, SyncNext,
};
pub use network::{AsyncNetworkFilter, SyncNetworkFilter};

use nimbus_core::{CanonicalUri, Properties};
use std::collections::HashMap;
use std::fmt;

/// What a request does to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAction {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceAction::Create => "create",
            ResourceAction::Read => "read",
            ResourceAction::Update => "update",
            ResourceAction::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Request passed through the filter chain
#[derive(Debug, Clone)]
pub struct ResourceDataRequest {
    pub action: ResourceAction,
    pub type_name: String,
    pub uri: CanonicalUri,
    pub body: Option<Properties>,
    pub headers: HashMap<String, String>,
}

impl ResourceDataRequest {
    pub fn new(action: ResourceAction, type_name: impl Into<String>, uri: CanonicalUri) -> Self {
        Self {
            action,
            type_name: type_name.into(),
            uri,
            body: None,
            headers: HashMap::new(),
        }
    }

    pub fn with_body(mut self, body: Properties) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Href the request targets, without its query string
    pub fn href(&self) -> &str {
        self.uri.resource_path()
    }
}

/// Output of the filter chain
#[derive(Debug, Clone)]
pub struct ResourceDataResult {
    pub action: ResourceAction,
    pub type_name: Option<String>,
    pub uri: Option<CanonicalUri>,
    pub status: u16,
    pub body: Option<Properties>,
}

impl ResourceDataResult {
    pub fn new(action: ResourceAction, status: u16) -> Self {
        Self {
            action,
            type_name: None,
            uri: None,
            status,
            body: None,
        }
    }

    /// Result answering `request` with the given status and payload
    pub fn for_request(request: &ResourceDataRequest, status: u16, body: Option<Properties>) -> Self {
        Self {
            action: request.action,
            type_name: Some(request.type_name.clone()),
            uri: Some(request.uri.clone()),
            status,
            body,
        }
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_uri(mut self, uri: CanonicalUri) -> Self {
        self.uri = Some(uri);
        self
    }

    pub fn with_body(mut self, body: Properties) -> Self {
        self.body = Some(body);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
