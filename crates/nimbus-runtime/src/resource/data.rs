use nimbus_core::{types::get_href, Properties};
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::datastore::DataStoreInner;

/// Shared mutable record behind every handle to one remote entity
pub struct ResourceData {
    store: Weak<DataStoreInner>,
    state: RwLock<DataState>,
}

#[derive(Default)]
struct DataState {
    properties: Properties,
    dirty: Vec<String>,
}

impl ResourceData {
    pub(crate) fn new(store: Weak<DataStoreInner>) -> Self {
        Self {
            store,
            state: RwLock::new(DataState::default()),
        }
    }

    /// Record not attached to any data store
    pub fn detached() -> Self {
        Self::new(Weak::new())
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.state.read().properties.get(name).cloned()
    }

    pub fn href(&self) -> Option<String> {
        get_href(&self.state.read().properties).map(str::to_string)
    }

    /// Snapshot of all properties
    pub fn properties(&self) -> Properties {
        self.state.read().properties.clone()
    }

    /// Set a property locally and mark it dirty
    pub fn set(&self, name: &str, value: Value) {
        let mut state = self.state.write();
        state.properties.insert(name.to_string(), value);
        if !state.dirty.iter().any(|d| d == name) {
            state.dirty.push(name.to_string());
        }
    }

    /// Merge fresher properties; merged names stop being dirty
    pub fn merge(&self, properties: &Properties) {
        let mut state = self.state.write();
        for (name, value) in properties {
            state.properties.insert(name.clone(), value.clone());
        }
        state.dirty.retain(|d| !properties.contains_key(d));
    }

    /// Locally modified properties, in modification order
    pub fn dirty_properties(&self) -> Properties {
        let state = self.state.read();
        state
            .dirty
            .iter()
            .filter_map(|name| {
                state
                    .properties
                    .get(name)
                    .map(|v| (name.clone(), v.clone()))
            })
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.state.read().dirty.is_empty()
    }

    pub fn clear_dirty(&self) {
        self.state.write().dirty.clear();
    }

    pub(crate) fn store(&self) -> Option<Arc<DataStoreInner>> {
        self.store.upgrade()
    }
}

impl fmt::Debug for ResourceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ResourceData")
            .field("properties", &state.properties)
            .field("dirty", &state.dirty)
            .finish()
    }
}
