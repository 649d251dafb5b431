//! Data store error types

use nimbus_core::{Properties, QueryError};
use std::fmt;
use thiserror::Error;

use crate::transport::TransportError;

/// Field of a collection payload that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionField {
    Offset,
    Limit,
    Size,
    Href,
    Items,
}

impl fmt::Display for CollectionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollectionField::Offset => "offset",
            CollectionField::Limit => "limit",
            CollectionField::Size => "size",
            CollectionField::Href => "href",
            CollectionField::Items => "items",
        };
        f.write_str(name)
    }
}

/// Error payload returned by the remote API with a non-success status
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: u16,
    pub code: Option<i64>,
    pub message: Option<String>,
    pub developer_message: Option<String>,
    pub more_info: Option<String>,
}

impl ApiError {
    /// Read the standard error fields from a response payload
    pub fn from_payload(status: u16, payload: &Properties) -> Self {
        let text = |key: &str| payload.get(key).and_then(|v| v.as_str()).map(str::to_string);
        Self {
            status,
            code: payload.get("code").and_then(|v| v.as_i64()),
            message: text("message"),
            developer_message: text("developerMessage"),
            more_info: text("moreInfo"),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(code) = self.code {
            write!(f, " (code {})", code)?;
        }
        if let Some(message) = self.developer_message.as_ref().or(self.message.as_ref()) {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

/// Data store error
#[derive(Error, Debug)]
pub enum DataStoreError {
    /// No schema is registered for the type
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    /// Materializing a resource failed
    #[error("Error creating resource type {type_name}: {source}")]
    ResourceConstruction {
        type_name: String,
        #[source]
        source: Box<DataStoreError>,
    },

    /// A collection payload is missing or has a malformed field
    #[error("Unable to create collection resource of type {type_name}: invalid '{field}' value")]
    InvalidCollectionPayload {
        type_name: String,
        field: CollectionField,
    },

    /// Query translation failed
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Transport failure, surfaced unchanged
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The API answered with an error status
    #[error("API error: {0}")]
    Api(ApiError),

    /// Payload (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The operation was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Every filter delegated and nothing produced a result
    #[error("Filter chain exhausted without producing a result")]
    ChainExhausted,

    /// The owning data store was dropped
    #[error("Data store has been disposed")]
    StoreDisposed,

    /// Href could not be resolved
    #[error("Invalid href: {0}")]
    InvalidHref(String),

    /// Response did not have the expected shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The store was built without an executor for this execution mode
    #[error("No {0} request executor configured")]
    ExecutorUnavailable(&'static str),
}

impl DataStoreError {
    /// Innermost cause, looking through construction wrappers
    pub fn root_cause(&self) -> &DataStoreError {
        match self {
            DataStoreError::ResourceConstruction { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type for data store operations
pub type Result<T> = std::result::Result<T, DataStoreError>;
