use std::fmt;
use uuid::Uuid;

/// Scheme used for hrefs minted for resources that were never saved
pub const AUTOGEN_SCHEME: &str = "autogen://";

/// Identity of a resource record: `{typeName}/{href}` or an autogen href
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Key for a resource with a known href
    pub fn for_href(type_name: &str, href: &str) -> Self {
        if is_autogen_href(href) {
            // Autogen hrefs already embed the type name
            Self(href.to_string())
        } else {
            Self(format!("{}/{}", type_name, href))
        }
    }

    /// Fresh key for an unsaved resource; the key doubles as its href
    pub fn autogen(type_name: &str) -> Self {
        Self(format!(
            "{}{}/{}",
            AUTOGEN_SCHEME,
            type_name,
            Uuid::new_v4().simple()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_autogen(&self) -> bool {
        is_autogen_href(&self.0)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// True for hrefs minted by [`ResourceKey::autogen`]
pub fn is_autogen_href(href: &str) -> bool {
    href.starts_with(AUTOGEN_SCHEME)
}
