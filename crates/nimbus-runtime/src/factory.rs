//! Resource factory
//!
//! Turns raw payloads into typed resources. Single resources go through the
//! identity map so every materialization of one href shares a record;
//! collection payloads are validated and their items materialized in order.

use nimbus_core::{
    types::{get_href, get_i64},
    Properties,
};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::trace;

use crate::datastore::DataStoreInner;
use crate::error::{CollectionField, DataStoreError, Result};
use crate::identity::IdentityMap;
use crate::resource::{CollectionPage, Resource, ResourceData, ResourceHandle, ResourceKey};
use crate::schema::SchemaCatalog;

/// Outcome of [`ResourceFactory::materialize`]
#[derive(Debug)]
pub enum Materialized<T> {
    Single(T),
    Collection(CollectionPage<T>),
}

impl<T> Materialized<T> {
    pub fn into_single(self) -> Option<T> {
        match self {
            Materialized::Single(resource) => Some(resource),
            Materialized::Collection(_) => None,
        }
    }

    pub fn into_collection(self) -> Option<CollectionPage<T>> {
        match self {
            Materialized::Collection(page) => Some(page),
            Materialized::Single(_) => None,
        }
    }
}

/// Builds typed resources from payloads
pub struct ResourceFactory {
    catalog: Arc<dyn SchemaCatalog>,
    identity_map: Arc<IdentityMap>,
    store: Weak<DataStoreInner>,
}

impl ResourceFactory {
    pub fn new(catalog: Arc<dyn SchemaCatalog>, identity_map: Arc<IdentityMap>) -> Self {
        Self::attached(catalog, identity_map, Weak::new())
    }

    pub(crate) fn attached(
        catalog: Arc<dyn SchemaCatalog>,
        identity_map: Arc<IdentityMap>,
        store: Weak<DataStoreInner>,
    ) -> Self {
        Self {
            catalog,
            identity_map,
            store,
        }
    }

    pub fn identity_map(&self) -> &Arc<IdentityMap> {
        &self.identity_map
    }

    /// Materialize `payload` as `type_name`, single or collection per the schema
    pub fn materialize<T: Resource>(
        &self,
        type_name: &str,
        payload: Option<Properties>,
        link_from: Option<&ResourceHandle>,
    ) -> Result<Materialized<T>> {
        if self.catalog.is_collection_type(type_name) {
            let payload = payload.ok_or_else(|| DataStoreError::InvalidCollectionPayload {
                type_name: type_name.to_string(),
                field: CollectionField::Items,
            })?;
            self.create_collection(type_name, payload)
                .map(Materialized::Collection)
        } else {
            self.instantiate(type_name, payload, link_from)
                .map(Materialized::Single)
        }
    }

    /// Materialize a single resource of type `T`
    pub fn create<T: Resource>(&self, payload: Option<Properties>, link_from: Option<&ResourceHandle>) -> Result<T> {
        self.instantiate(T::TYPE_NAME, payload, link_from)
    }

    fn instantiate<T: Resource>(
        &self,
        type_name: &str,
        payload: Option<Properties>,
        link_from: Option<&ResourceHandle>,
    ) -> Result<T> {
        let concrete = self
            .catalog
            .resolve_concrete_type(type_name)
            .ok_or_else(|| DataStoreError::UnknownResourceType(type_name.to_string()))?;

        self.build_single::<T>(&concrete, payload.unwrap_or_default(), link_from)
            .map_err(|source| DataStoreError::ResourceConstruction {
                type_name: concrete.clone(),
                source: Box::new(source),
            })
    }

    fn build_single<T: Resource>(
        &self,
        type_name: &str,
        payload: Properties,
        link_from: Option<&ResourceHandle>,
    ) -> Result<T> {
        let (key, data, payload) = self.record(type_name, payload)?;

        let handle = ResourceHandle::new(type_name, key.clone(), data.clone());
        let resource = T::from_handle(handle);
        resource.on_update(&payload)?;

        if let Some(original) = link_from {
            original.link(key, data);
        }
        Ok(resource)
    }

    /// Merge `payload` into the record for its key, then do the same for its expanded links
    fn record(
        &self,
        type_name: &str,
        mut payload: Properties,
    ) -> Result<(ResourceKey, Arc<ResourceData>, Properties)> {
        let key = match payload.get("href") {
            None | Some(Value::Null) => {
                let key = ResourceKey::autogen(type_name);
                payload.insert("href".to_string(), Value::String(key.as_str().to_string()));
                key
            }
            Some(Value::String(href)) if !href.is_empty() => ResourceKey::for_href(type_name, href),
            Some(other) => {
                return Err(DataStoreError::UnexpectedResponse(format!(
                    "href must be a non-empty string, found {}",
                    other
                )))
            }
        };

        let policy = self.catalog.identity_policy(type_name);
        let data = if policy.skip {
            Arc::new(ResourceData::new(self.store.clone()))
        } else {
            self.identity_map.get_or_add(
                &key,
                || ResourceData::new(self.store.clone()),
                policy.store_indefinitely,
            )
        };

        data.merge(&payload);
        trace!(key = %key, "Materialized resource");

        for (property, value) in &payload {
            let Value::Object(nested) = value else {
                continue;
            };
            if nested.len() < 2 || get_href(nested).is_none() {
                continue;
            }
            let Some(link_type) = self.catalog.link_type(type_name, property) else {
                continue;
            };
            let concrete = self
                .catalog
                .resolve_concrete_type(&link_type)
                .ok_or_else(|| DataStoreError::UnknownResourceType(link_type.clone()))?;
            self.record(&concrete, nested.clone())?;
        }

        Ok((key, data, payload))
    }

    /// Typed view of the live record for `payload`'s href.
    ///
    /// `payload` is only materialized when no live record exists, so a stale
    /// embedded copy never overwrites newer or locally modified state.
    pub fn existing_or_create<T: Resource>(&self, payload: Properties) -> Result<T> {
        let concrete = self
            .catalog
            .resolve_concrete_type(T::TYPE_NAME)
            .ok_or_else(|| DataStoreError::UnknownResourceType(T::TYPE_NAME.to_string()))?;

        if !self.catalog.identity_policy(&concrete).skip {
            if let Some(href) = get_href(&payload) {
                let key = ResourceKey::for_href(&concrete, href);
                if let Some(data) = self.identity_map.get(&key) {
                    return Ok(T::from_handle(ResourceHandle::new(&concrete, key, data)));
                }
            }
        }
        self.create(Some(payload), None)
    }

    /// Materialize a collection page of `T` items
    pub fn create_collection<T: Resource>(&self, collection_type: &str, payload: Properties) -> Result<CollectionPage<T>> {
        let item_type = self
            .catalog
            .inner_type(collection_type)
            .ok_or_else(|| DataStoreError::UnknownResourceType(collection_type.to_string()))?;

        let invalid = |field| DataStoreError::InvalidCollectionPayload {
            type_name: item_type.clone(),
            field,
        };

        let offset = get_i64(&payload, "offset").ok_or_else(|| invalid(CollectionField::Offset))?;
        let limit = get_i64(&payload, "limit").ok_or_else(|| invalid(CollectionField::Limit))?;
        let size = get_i64(&payload, "size").ok_or_else(|| invalid(CollectionField::Size))?;
        let href = get_href(&payload)
            .map(str::to_string)
            .ok_or_else(|| invalid(CollectionField::Href))?;

        let items = match payload.get("items") {
            Some(Value::Array(items)) => items,
            _ => return Err(invalid(CollectionField::Items)),
        };

        let mut resources = Vec::with_capacity(items.len());
        for item in items {
            let Value::Object(item) = item else {
                return Err(invalid(CollectionField::Items));
            };
            let resource = self
                .instantiate::<T>(&item_type, Some(item.clone()), None)
                .map_err(|source| DataStoreError::ResourceConstruction {
                    type_name: collection_type.to_string(),
                    source: Box::new(source),
                })?;
            resources.push(resource);
        }

        Ok(CollectionPage::new(href, offset, limit, size, resources))
    }

    /// Dispose the identity map
    pub fn dispose(&self) {
        self.identity_map.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{IdentityMapPolicy, ResourceSchema, SchemaRegistry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug)]
    struct Account {
        handle: ResourceHandle,
    }

    impl Resource for Account {
        const TYPE_NAME: &'static str = "Account";

        fn from_handle(handle: ResourceHandle) -> Self {
            Self { handle }
        }

        fn handle(&self) -> &ResourceHandle {
            &self.handle
        }

        fn on_update(&self, properties: &Properties) -> Result<()> {
            match properties.get("status") {
                Some(Value::String(s)) if s == "UNKNOWN" => {
                    Err(DataStoreError::UnexpectedResponse("unknown status".to_string()))
                }
                _ => Ok(()),
            }
        }
    }

    fn props(value: Value) -> Properties {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn factory() -> ResourceFactory {
        let catalog = SchemaRegistry::new()
            .register(ResourceSchema::single("Account"))
            .register(ResourceSchema::single("IAccount").with_concrete("Account"))
            .register(ResourceSchema::collection("AccountList", "Account"))
            .register(ResourceSchema::single("Token").with_identity_policy(IdentityMapPolicy {
                skip: true,
                store_indefinitely: false,
            }));
        ResourceFactory::new(Arc::new(catalog), Arc::new(IdentityMap::default()))
    }

    fn page(items: Value) -> Properties {
        props(json!({
            "href": "https://api.example.com/v1/accounts",
            "offset": 0,
            "limit": 25,
            "size": 2,
            "items": items,
        }))
    }

    // ========== Single ==========

    #[test]
    fn test_same_href_shares_record() {
        let factory = factory();
        let payload = props(json!({"href": "https://api.example.com/v1/accounts/1", "givenName": "Han"}));
        let a: Account = factory.create(Some(payload.clone()), None).unwrap();
        let b: Account = factory.create(Some(payload), None).unwrap();

        assert!(a.handle().is_linked_to(b.handle()));
        a.handle().set("givenName", "Ben");
        assert_eq!(b.handle().get_str("givenName").as_deref(), Some("Ben"));
    }

    #[test]
    fn test_fresher_payload_merges_in_place() {
        let factory = factory();
        let a: Account = factory
            .create(Some(props(json!({"href": "h1", "givenName": "Han", "surname": "Solo"}))), None)
            .unwrap();
        a.handle().set("surname", "Organa");

        let _b: Account = factory
            .create(Some(props(json!({"href": "h1", "givenName": "Leia"}))), None)
            .unwrap();

        assert_eq!(a.handle().get_str("givenName").as_deref(), Some("Leia"));
        assert_eq!(a.handle().get_str("surname").as_deref(), Some("Organa"));
        assert!(a.handle().data().dirty_properties().contains_key("surname"));
    }

    #[test]
    fn test_missing_href_mints_autogen() {
        let factory = factory();
        let a: Account = factory.create(None, None).unwrap();
        let href = a.href().unwrap();
        assert!(href.starts_with("autogen://Account/"));
        assert!(a.handle().is_new());
        assert_eq!(a.handle().key().as_str(), href);
    }

    #[test]
    fn test_abstract_type_resolves_to_concrete() {
        let factory = factory();
        let resource = factory
            .materialize::<Account>("IAccount", Some(props(json!({"href": "h1"}))), None)
            .unwrap()
            .into_single()
            .unwrap();
        assert_eq!(resource.handle().type_name(), "Account");
    }

    #[test]
    fn test_unknown_type() {
        let factory = factory();
        let err = factory
            .materialize::<Account>("Directory", None, None)
            .unwrap_err();
        assert!(matches!(err, DataStoreError::UnknownResourceType(ref t) if t == "Directory"));
    }

    #[test]
    fn test_skip_policy_bypasses_identity_map() {
        let factory = factory();
        let payload = props(json!({"href": "https://api.example.com/v1/tokens/1"}));
        let a = factory.materialize::<Account>("Token", Some(payload.clone()), None).unwrap().into_single().unwrap();
        let b = factory.materialize::<Account>("Token", Some(payload), None).unwrap().into_single().unwrap();
        assert!(!a.handle().is_linked_to(b.handle()));
        assert!(factory.identity_map().is_empty());
    }

    fn linked_factory() -> ResourceFactory {
        let catalog = SchemaRegistry::new()
            .register(ResourceSchema::single("Account").with_link("manager", "Account"));
        ResourceFactory::new(Arc::new(catalog), Arc::new(IdentityMap::default()))
    }

    #[test]
    fn test_expanded_link_gets_its_own_record() {
        let factory = linked_factory();
        let _: Account = factory
            .create(
                Some(props(json!({
                    "href": "h1",
                    "givenName": "Han",
                    "manager": {"href": "h2", "givenName": "Leia"}
                }))),
                None,
            )
            .unwrap();

        assert_eq!(factory.identity_map().len(), 2);
        let manager = factory.identity_map().peek(&ResourceKey::for_href("Account", "h2")).unwrap();
        assert_eq!(manager.get("givenName"), Some(json!("Leia")));
    }

    #[test]
    fn test_existing_or_create_does_not_merge_live_record() {
        let factory = linked_factory();
        let live: Account = factory
            .create(Some(props(json!({"href": "h2", "givenName": "Leia"}))), None)
            .unwrap();
        live.handle().set("givenName", "General Organa");

        let resolved: Account = factory
            .existing_or_create(props(json!({"href": "h2", "givenName": "Leia"})))
            .unwrap();
        assert!(resolved.handle().is_linked_to(live.handle()));
        assert_eq!(resolved.handle().get_str("givenName").as_deref(), Some("General Organa"));
        assert!(resolved.handle().data().is_dirty());

        let fresh: Account = factory
            .existing_or_create(props(json!({"href": "h3", "givenName": "Luke"})))
            .unwrap();
        assert_eq!(fresh.handle().get_str("givenName").as_deref(), Some("Luke"));
        assert_eq!(factory.identity_map().len(), 2);
    }

    #[test]
    fn test_link_from_retargets_original() {
        let factory = factory();
        let unsaved: Account = factory.create(None, None).unwrap();
        let created: Account = factory
            .create(Some(props(json!({"href": "h-new", "givenName": "Han"}))), Some(unsaved.handle()))
            .unwrap();

        assert!(unsaved.handle().is_linked_to(created.handle()));
        assert_eq!(unsaved.href().as_deref(), Some("h-new"));
    }

    #[test]
    fn test_on_update_failure_is_wrapped() {
        let factory = factory();
        let err = factory
            .create::<Account>(Some(props(json!({"href": "h1", "status": "UNKNOWN"}))), None)
            .unwrap_err();
        match err {
            DataStoreError::ResourceConstruction { type_name, source } => {
                assert_eq!(type_name, "Account");
                assert!(matches!(*source, DataStoreError::UnexpectedResponse(_)));
            }
            other => panic!("Expected construction error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_string_href_is_rejected() {
        let factory = factory();
        let err = factory.create::<Account>(Some(props(json!({"href": 42}))), None).unwrap_err();
        assert!(matches!(err.root_cause(), DataStoreError::UnexpectedResponse(_)));
    }

    // ========== Collection ==========

    #[test]
    fn test_collection_items_in_order() {
        let factory = factory();
        let page = factory
            .create_collection::<Account>(
                "AccountList",
                page(json!([
                    {"href": "https://api.example.com/v1/accounts/1", "givenName": "Han"},
                    {"href": "https://api.example.com/v1/accounts/2", "givenName": "Leia"}
                ])),
            )
            .unwrap();

        assert_eq!(page.size(), 2);
        assert_eq!(page.limit(), 25);
        let names: Vec<_> = page.iter().filter_map(|a| a.handle().get_str("givenName")).collect();
        assert_eq!(names, vec!["Han", "Leia"]);
    }

    #[test]
    fn test_collection_accepts_numeric_strings() {
        let factory = factory();
        let mut payload = page(json!([]));
        payload.insert("offset".to_string(), json!("0"));
        payload.insert("limit".to_string(), json!("25"));
        let page = factory.create_collection::<Account>("AccountList", payload).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_collection_field_errors() {
        let factory = factory();
        let cases = [
            ("offset", CollectionField::Offset),
            ("limit", CollectionField::Limit),
            ("size", CollectionField::Size),
            ("href", CollectionField::Href),
            ("items", CollectionField::Items),
        ];

        for (name, expected) in cases {
            let mut payload = page(json!([]));
            payload.remove(name);
            let err = factory.create_collection::<Account>("AccountList", payload).unwrap_err();
            match err {
                DataStoreError::InvalidCollectionPayload { field, .. } => assert_eq!(field, expected),
                other => panic!("Expected collection error for {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_collection_items_must_be_objects() {
        let factory = factory();
        let err = factory
            .create_collection::<Account>("AccountList", page(json!(["not-an-object"])))
            .unwrap_err();
        assert!(matches!(
            err,
            DataStoreError::InvalidCollectionPayload { field: CollectionField::Items, .. }
        ));
    }

    #[test]
    fn test_item_failure_aborts_page() {
        let factory = factory();
        let err = factory
            .create_collection::<Account>(
                "AccountList",
                page(json!([{"href": "h1"}, {"href": "h2", "status": "UNKNOWN"}])),
            )
            .unwrap_err();
        match err {
            DataStoreError::ResourceConstruction { type_name, .. } => assert_eq!(type_name, "AccountList"),
            other => panic!("Expected construction error, got {:?}", other),
        }
    }

    #[test]
    fn test_materialize_dispatches_collection() {
        let factory = factory();
        let page = factory
            .materialize::<Account>("AccountList", Some(page(json!([{"href": "h1"}]))), None)
            .unwrap()
            .into_collection()
            .unwrap();
        assert_eq!(page.len(), 1);
    }
}
