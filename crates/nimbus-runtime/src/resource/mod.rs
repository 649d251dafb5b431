//! Resource model
//!
//! A [`ResourceData`] is the mutable record shared by every handle to one
//! remote entity. [`ResourceHandle`] is the cheap, cloneable reference typed
//! resources wrap; [`Resource`] is the trait those wrappers implement.

mod data;
mod handle;
mod key;
mod page;

pub use data::ResourceData;
pub use handle::ResourceHandle;
pub use key::{is_autogen_href, ResourceKey, AUTOGEN_SCHEME};
pub use page::CollectionPage;

use crate::error::Result;
use nimbus_core::Properties;

/// A typed resource backed by a [`ResourceHandle`]
pub trait Resource: Sized + Send + Sync + 'static {
    /// Schema type name this resource is registered under
    const TYPE_NAME: &'static str;

    /// Wrap a handle
    fn from_handle(handle: ResourceHandle) -> Self;

    /// Backing handle
    fn handle(&self) -> &ResourceHandle;

    /// Called after fresh properties were merged into the backing record
    fn on_update(&self, _properties: &Properties) -> Result<()> {
        Ok(())
    }

    /// Current href, if the resource has one
    fn href(&self) -> Option<String> {
        self.handle().href()
    }
}
