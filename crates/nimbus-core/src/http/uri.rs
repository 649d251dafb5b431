//! Canonical resource URIs

use super::query_string::QueryString;
use std::fmt;
use url::Url;

/// A resource location split into its path part and its canonical query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalUri {
    resource_path: String,
    query: QueryString,
}

impl CanonicalUri {
    /// Parse an absolute href. Query parameters in the href become part of
    /// the canonical query string.
    pub fn parse(href: &str) -> Result<Self, url::ParseError> {
        let mut url = Url::parse(href)?;
        let query = url.query().map(QueryString::parse).unwrap_or_default();
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self {
            resource_path: url.to_string(),
            query,
        })
    }

    pub fn new(resource_path: impl Into<String>, query: QueryString) -> Self {
        Self {
            resource_path: resource_path.into(),
            query,
        }
    }

    /// The href without its query string
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    pub fn query(&self) -> &QueryString {
        &self.query
    }

    /// Same URI with extra query parameters merged in
    pub fn with_query(&self, extra: &QueryString) -> Self {
        Self {
            resource_path: self.resource_path.clone(),
            query: self.query.merge(extra),
        }
    }

    /// Re-target this URI at another href.
    ///
    /// Parameters of the current query survive; parameters carried by the
    /// override win on the same key.
    pub fn with_resource_path(&self, override_href: &str) -> Result<Self, url::ParseError> {
        let target = CanonicalUri::parse(override_href)?;
        Ok(Self {
            resource_path: target.resource_path,
            query: self.query.merge(&target.query),
        })
    }
}

impl fmt::Display for CanonicalUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            f.write_str(&self.resource_path)
        } else {
            write!(f, "{}?{}", self.resource_path, self.query)
        }
    }
}
