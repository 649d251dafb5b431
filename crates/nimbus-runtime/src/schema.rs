//! Schema catalog
//!
//! Maps resource type names to their concrete type, collection shape,
//! identity-map policy and nested link properties.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the identity map treats records of a type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMapPolicy {
    /// Never share records of this type
    #[serde(default)]
    pub skip: bool,

    /// Exempt records of this type from sliding expiration
    #[serde(default)]
    pub store_indefinitely: bool,
}

/// Type metadata consulted by the factory, the cache filters and the data store
pub trait SchemaCatalog: Send + Sync {
    /// Concrete type name for an abstract or concrete type name
    fn resolve_concrete_type(&self, type_name: &str) -> Option<String>;

    fn is_collection_type(&self, type_name: &str) -> bool;

    /// Item type of a collection type
    fn inner_type(&self, collection_type: &str) -> Option<String>;

    fn identity_policy(&self, type_name: &str) -> IdentityMapPolicy;

    /// Collection type whose items are `item_type`
    fn collection_type_for(&self, item_type: &str) -> Option<String>;

    /// Type of the resource linked from `property` of `type_name`
    fn link_type(&self, type_name: &str, property: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
enum SchemaKind {
    Single {
        concrete: String,
        links: HashMap<String, String>,
    },
    Collection {
        item: String,
    },
}

/// Registration for one resource type
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    name: String,
    kind: SchemaKind,
    identity: IdentityMapPolicy,
}

impl ResourceSchema {
    /// Single resource type, concrete under its own name
    pub fn single(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: SchemaKind::Single {
                concrete: name.clone(),
                links: HashMap::new(),
            },
            name,
            identity: IdentityMapPolicy::default(),
        }
    }

    /// Collection type holding `item` resources
    pub fn collection(name: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SchemaKind::Collection { item: item.into() },
            identity: IdentityMapPolicy::default(),
        }
    }

    /// Materialize this type as another concrete type
    pub fn with_concrete(mut self, concrete: impl Into<String>) -> Self {
        if let SchemaKind::Single { concrete: c, .. } = &mut self.kind {
            *c = concrete.into();
        }
        self
    }

    /// Declare `property` as a link to a resource of `target_type`
    pub fn with_link(mut self, property: impl Into<String>, target_type: impl Into<String>) -> Self {
        if let SchemaKind::Single { links, .. } = &mut self.kind {
            links.insert(property.into(), target_type.into());
        }
        self
    }

    pub fn with_identity_policy(mut self, policy: IdentityMapPolicy) -> Self {
        self.identity = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// In-memory [`SchemaCatalog`]
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, ResourceSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any prior one with the same name
    pub fn register(mut self, schema: ResourceSchema) -> Self {
        self.schemas.insert(schema.name.clone(), schema);
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.schemas.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaCatalog for SchemaRegistry {
    fn resolve_concrete_type(&self, type_name: &str) -> Option<String> {
        match &self.schemas.get(type_name)?.kind {
            SchemaKind::Single { concrete, .. } => Some(concrete.clone()),
            SchemaKind::Collection { .. } => Some(type_name.to_string()),
        }
    }

    fn is_collection_type(&self, type_name: &str) -> bool {
        matches!(
            self.schemas.get(type_name).map(|s| &s.kind),
            Some(SchemaKind::Collection { .. })
        )
    }

    fn inner_type(&self, collection_type: &str) -> Option<String> {
        match &self.schemas.get(collection_type)?.kind {
            SchemaKind::Collection { item } => Some(item.clone()),
            SchemaKind::Single { .. } => None,
        }
    }

    fn identity_policy(&self, type_name: &str) -> IdentityMapPolicy {
        self.schemas
            .get(type_name)
            .map(|s| s.identity)
            .unwrap_or_default()
    }

    fn collection_type_for(&self, item_type: &str) -> Option<String> {
        // Sorted so the choice is stable when several collections share an item type
        let mut names: Vec<&String> = self
            .schemas
            .values()
            .filter_map(|s| match &s.kind {
                SchemaKind::Collection { item } if item == item_type => Some(&s.name),
                _ => None,
            })
            .collect();
        names.sort();
        names.first().map(|n| n.to_string())
    }

    fn link_type(&self, type_name: &str, property: &str) -> Option<String> {
        match &self.schemas.get(type_name)?.kind {
            SchemaKind::Single { links, .. } => links.get(property).cloned(),
            SchemaKind::Collection { .. } => None,
        }
    }
}
