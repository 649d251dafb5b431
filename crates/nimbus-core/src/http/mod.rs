//! Canonical HTTP request model
//!
//! Requests are built once and never mutated; re-targeting a request
//! produces a new value whose query parameters are merged with the
//! original ones.

pub mod method;
pub mod query_string;
pub mod request;
pub mod uri;

pub use method::HttpMethod;
pub use query_string::QueryString;
pub use request::CanonicalRequest;
pub use uri::CanonicalUri;
