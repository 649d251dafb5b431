//! Payload types

pub mod value;

pub use value::{get_href, get_i64, Properties};
