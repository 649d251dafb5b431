//! Nimbus Core - Core types and definitions for the Nimbus resource client
//!
//! This crate provides the leaf types used across the Nimbus workspace:
//! - Property maps for resource payloads
//! - The canonical HTTP request model
//! - Query expression AST and the where/order translator
//! - Error types

pub mod error;
pub mod http;
pub mod query;
pub mod types;

// Re-export commonly used types
pub use error::{QueryError, Result};
pub use http::{CanonicalRequest, CanonicalUri, HttpMethod, QueryString};
pub use query::{
    CollectionQuery, Comparison, DatePartMatch, Expression, Literal, OrderClause,
    OrderDirection, WhereClause, WhereValue,
};
pub use types::Properties;
