//! Canonical HTTP requests

use super::method::HttpMethod;
use super::query_string::QueryString;
use super::uri::CanonicalUri;
use std::collections::HashMap;

/// An outbound request, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRequest {
    method: HttpMethod,
    uri: CanonicalUri,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
}

impl CanonicalRequest {
    /// Create a new request with no headers and no body
    pub fn new(method: HttpMethod, uri: CanonicalUri) -> Self {
        Self {
            method,
            uri,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Create a request, merging `query` into the URI's own query string
    pub fn with_parts(
        method: HttpMethod,
        uri: CanonicalUri,
        query: Option<&QueryString>,
        headers: HashMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> Self {
        let uri = match query {
            Some(query) if !query.is_empty() => uri.with_query(query),
            _ => uri,
        };

        Self {
            method,
            uri,
            headers,
            body,
        }
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the body
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Copy of this request aimed at another href; query parameters are merged.
    pub fn with_resource_path(&self, override_href: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            method: self.method,
            uri: self.uri.with_resource_path(override_href)?,
            headers: self.headers.clone(),
            body: self.body.clone(),
        })
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn uri(&self) -> &CanonicalUri {
        &self.uri
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn has_body(&self) -> bool {
        self.body.as_ref().is_some_and(|b| !b.is_empty())
    }
}
