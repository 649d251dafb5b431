use nimbus_core::Properties;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::key::{is_autogen_href, ResourceKey};
use super::ResourceData;
use crate::datastore::DataStore;
use crate::error::{DataStoreError, Result};

/// Cloneable reference to a shared [`ResourceData`].
///
/// Clones share the link target: re-linking one clone re-targets all of them.
#[derive(Clone)]
pub struct ResourceHandle {
    type_name: Arc<str>,
    target: Arc<RwLock<LinkTarget>>,
}

struct LinkTarget {
    key: ResourceKey,
    data: Arc<ResourceData>,
}

impl ResourceHandle {
    pub fn new(type_name: &str, key: ResourceKey, data: Arc<ResourceData>) -> Self {
        Self {
            type_name: Arc::from(type_name),
            target: Arc::new(RwLock::new(LinkTarget { key, data })),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn key(&self) -> ResourceKey {
        self.target.read().key.clone()
    }

    /// Backing record
    pub fn data(&self) -> Arc<ResourceData> {
        self.target.read().data.clone()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.data().get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.data().set(name, value.into());
    }

    pub fn href(&self) -> Option<String> {
        self.data().href()
    }

    /// True until the resource has been created remotely
    pub fn is_new(&self) -> bool {
        self.href().map_or(true, |href| is_autogen_href(&href))
    }

    pub fn properties(&self) -> Properties {
        self.data().properties()
    }

    /// Href of a nested link property such as `customData`
    pub fn link_href(&self, property: &str) -> Option<String> {
        match self.get(property)? {
            Value::Object(map) => map
                .get("href")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }

    /// True when both handles observe the same backing record
    pub fn is_linked_to(&self, other: &ResourceHandle) -> bool {
        Arc::ptr_eq(&self.data(), &other.data())
    }

    /// Re-target this handle, and every clone of it, at another record
    pub(crate) fn link(&self, key: ResourceKey, data: Arc<ResourceData>) {
        let mut target = self.target.write();
        target.key = key;
        target.data = data;
    }

    /// Data store that materialized this resource
    pub fn data_store(&self) -> Result<DataStore> {
        self.data()
            .store()
            .map(DataStore::from_inner)
            .ok_or(DataStoreError::StoreDisposed)
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("type_name", &self.type_name)
            .field("key", &self.key())
            .finish()
    }
}
