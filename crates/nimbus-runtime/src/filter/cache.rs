//! Read-through and write-back cache filters
//!
//! Cached entries are flattened: expanded nested resources declared as links
//! in the schema are stored in their own region and replaced in the parent
//! entry by an `{ "href": ... }` reference. Reads re-inflate those references.

use async_trait::async_trait;
use nimbus_core::{types::get_href, Properties};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{AsyncFilter, AsyncNext, ResourceAction, ResourceDataRequest, ResourceDataResult, SyncFilter, SyncNext};
use crate::cache::CacheResolver;
use crate::error::{DataStoreError, Result};
use crate::schema::SchemaCatalog;

/// One payload to store in a cache region
#[derive(Debug, Clone, PartialEq)]
struct CacheWrite {
    region: String,
    href: String,
    value: Properties,
}

/// Reference to a nested resource held in a cache entry
#[derive(Debug, Clone, PartialEq)]
struct LinkRef {
    property: String,
    region: String,
    href: String,
}

fn href_ref(href: &str) -> Value {
    let mut reference = Properties::new();
    reference.insert("href".to_string(), Value::String(href.to_string()));
    Value::Object(reference)
}

/// An expanded nested resource carries fields beyond its href
fn is_expanded(nested: &Properties) -> bool {
    get_href(nested).is_some() && nested.len() > 1
}

/// Flatten `payload`, collecting writes for it and every expanded link below it
fn flatten(catalog: &dyn SchemaCatalog, type_name: &str, payload: &Properties, writes: &mut Vec<CacheWrite>) {
    let Some(href) = get_href(payload) else {
        return;
    };

    let mut flat = Properties::new();
    for (name, value) in payload {
        let link_type = catalog.link_type(type_name, name);
        match (value, link_type) {
            (Value::Object(nested), Some(link_type)) if is_expanded(nested) => {
                flatten(catalog, &link_type, nested, writes);
                flat.insert(name.clone(), href_ref(get_href(nested).unwrap_or_default()));
            }
            _ => {
                flat.insert(name.clone(), value.clone());
            }
        }
    }

    writes.push(CacheWrite {
        region: type_name.to_string(),
        href: href.to_string(),
        value: flat,
    });
}

/// Writes for a response body; collection pages contribute only their items
fn writes_for(catalog: &dyn SchemaCatalog, type_name: &str, body: &Properties) -> Vec<CacheWrite> {
    let mut writes = Vec::new();
    if catalog.is_collection_type(type_name) {
        let Some(item_type) = catalog.inner_type(type_name) else {
            return writes;
        };
        if let Some(Value::Array(items)) = body.get("items") {
            for item in items {
                if let Value::Object(item) = item {
                    flatten(catalog, &item_type, item, &mut writes);
                }
            }
        }
    } else {
        flatten(catalog, type_name, body, &mut writes);
    }
    writes
}

/// Collapsed link references in a cached entry
fn link_refs(catalog: &dyn SchemaCatalog, type_name: &str, entry: &Properties) -> Vec<LinkRef> {
    entry
        .iter()
        .filter_map(|(name, value)| {
            let Value::Object(nested) = value else {
                return None;
            };
            let href = get_href(nested)?;
            let region = catalog.link_type(type_name, name)?;
            Some(LinkRef {
                property: name.clone(),
                region,
                href: href.to_string(),
            })
        })
        .collect()
}

/// Links of a removed entry that live under the removed href
fn derived_refs(catalog: &dyn SchemaCatalog, type_name: &str, href: &str, removed: &Properties) -> Vec<LinkRef> {
    let prefix = format!("{}/", href.trim_end_matches('/'));
    link_refs(catalog, type_name, removed)
        .into_iter()
        .filter(|link| link.href.starts_with(&prefix))
        .collect()
}

/// Single-resource reads without query parameters can be answered from cache
fn is_cacheable_read(catalog: &dyn SchemaCatalog, request: &ResourceDataRequest) -> bool {
    request.action == ResourceAction::Read
        && request.uri.query().is_empty()
        && !catalog.is_collection_type(&request.type_name)
}

// ========== Read ==========

/// Answers single-resource reads from the cache
pub struct ReadCacheFilter {
    resolver: CacheResolver,
    catalog: Arc<dyn SchemaCatalog>,
}

impl ReadCacheFilter {
    pub fn new(resolver: CacheResolver, catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self { resolver, catalog }
    }

    fn lookup_sync(&self, request: &ResourceDataRequest) -> Option<Properties> {
        let cache = self.resolver.sync_cache(&request.type_name)?;
        let mut entry = cache.get(request.href())?;
        for link in link_refs(self.catalog.as_ref(), &request.type_name, &entry) {
            let nested = self
                .resolver
                .sync_cache(&link.region)
                .and_then(|region| region.get(&link.href));
            if let Some(nested) = nested {
                entry.insert(link.property, Value::Object(nested));
            }
        }
        Some(entry)
    }

    async fn lookup_async(&self, request: &ResourceDataRequest) -> Option<Properties> {
        let cache = self.resolver.async_cache(&request.type_name)?;
        let mut entry = cache.get(request.href()).await?;
        for link in link_refs(self.catalog.as_ref(), &request.type_name, &entry) {
            if let Some(region) = self.resolver.async_cache(&link.region) {
                if let Some(nested) = region.get(&link.href).await {
                    entry.insert(link.property, Value::Object(nested));
                }
            }
        }
        Some(entry)
    }
}

impl SyncFilter for ReadCacheFilter {
    fn filter(&self, request: ResourceDataRequest, next: SyncNext<'_>) -> Result<ResourceDataResult> {
        if is_cacheable_read(self.catalog.as_ref(), &request) {
            if let Some(entry) = self.lookup_sync(&request) {
                debug!(href = request.href(), "Cache hit");
                return Ok(ResourceDataResult::for_request(&request, 200, Some(entry)));
            }
            debug!(href = request.href(), "Cache miss");
        }
        next.run(request)
    }

    fn name(&self) -> &str {
        "read-cache"
    }
}

#[async_trait]
impl AsyncFilter for ReadCacheFilter {
    async fn filter(
        &self,
        request: ResourceDataRequest,
        next: AsyncNext<'_>,
        cancel: &CancellationToken,
    ) -> Result<ResourceDataResult> {
        if is_cacheable_read(self.catalog.as_ref(), &request) {
            if let Some(entry) = self.lookup_async(&request).await {
                debug!(href = request.href(), "Cache hit");
                return Ok(ResourceDataResult::for_request(&request, 200, Some(entry)));
            }
            debug!(href = request.href(), "Cache miss");
        }
        next.run(request, cancel).await
    }

    fn name(&self) -> &str {
        "read-cache"
    }
}

// ========== Write ==========

/// Stores successful responses and evicts deleted resources
pub struct WriteCacheFilter {
    resolver: CacheResolver,
    catalog: Arc<dyn SchemaCatalog>,
}

impl WriteCacheFilter {
    pub fn new(resolver: CacheResolver, catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self { resolver, catalog }
    }

    fn pending_writes(&self, request_type: &str, result: &ResourceDataResult) -> Vec<CacheWrite> {
        if !result.is_success() {
            return Vec::new();
        }
        let Some(body) = &result.body else {
            return Vec::new();
        };
        let type_name = result.type_name.as_deref().unwrap_or(request_type);
        writes_for(self.catalog.as_ref(), type_name, body)
    }

    fn store_sync(&self, writes: Vec<CacheWrite>) {
        for write in writes {
            if let Some(cache) = self.resolver.sync_cache(&write.region) {
                debug!(region = %write.region, href = %write.href, "Caching resource");
                cache.put(&write.href, write.value);
            }
        }
    }

    async fn store_async(&self, writes: Vec<CacheWrite>) {
        for write in writes {
            if let Some(cache) = self.resolver.async_cache(&write.region) {
                debug!(region = %write.region, href = %write.href, "Caching resource");
                cache.put(&write.href, write.value).await;
            }
        }
    }

    fn evict_sync(&self, type_name: &str, href: &str) {
        let Some(cache) = self.resolver.sync_cache(type_name) else {
            return;
        };
        let Some(removed) = cache.remove(href) else {
            return;
        };
        debug!(href, "Evicted deleted resource from cache");
        for link in derived_refs(self.catalog.as_ref(), type_name, href, &removed) {
            if let Some(region) = self.resolver.sync_cache(&link.region) {
                region.remove(&link.href);
            }
        }
    }

    async fn evict_async(&self, type_name: &str, href: &str) {
        let Some(cache) = self.resolver.async_cache(type_name) else {
            return;
        };
        let Some(removed) = cache.remove(href).await else {
            return;
        };
        debug!(href, "Evicted deleted resource from cache");
        for link in derived_refs(self.catalog.as_ref(), type_name, href, &removed) {
            if let Some(region) = self.resolver.async_cache(&link.region) {
                region.remove(&link.href).await;
            }
        }
    }
}

fn was_cancelled(result: &Result<ResourceDataResult>) -> bool {
    matches!(result, Err(DataStoreError::Cancelled))
}

impl SyncFilter for WriteCacheFilter {
    fn filter(&self, request: ResourceDataRequest, next: SyncNext<'_>) -> Result<ResourceDataResult> {
        let action = request.action;
        let type_name = request.type_name.clone();
        let href = request.href().to_string();

        let result = next.run(request);
        if was_cancelled(&result) {
            return result;
        }

        match (action, &result) {
            (ResourceAction::Delete, _) => self.evict_sync(&type_name, &href),
            (_, Ok(response)) => self.store_sync(self.pending_writes(&type_name, response)),
            _ => {}
        }
        result
    }

    fn name(&self) -> &str {
        "write-cache"
    }
}

#[async_trait]
impl AsyncFilter for WriteCacheFilter {
    async fn filter(
        &self,
        request: ResourceDataRequest,
        next: AsyncNext<'_>,
        cancel: &CancellationToken,
    ) -> Result<ResourceDataResult> {
        let action = request.action;
        let type_name = request.type_name.clone();
        let href = request.href().to_string();

        let result = next.run(request, cancel).await;
        if was_cancelled(&result) || cancel.is_cancelled() {
            return result;
        }

        match (action, &result) {
            (ResourceAction::Delete, _) => self.evict_async(&type_name, &href).await,
            (_, Ok(response)) => {
                let writes = self.pending_writes(&type_name, response);
                self.store_async(writes).await
            }
            _ => {}
        }
        result
    }

    fn name(&self) -> &str {
        "write-cache"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheProvider;
    use crate::filter::{sync_filter_fn, SyncFilterChain};
    use crate::schema::{ResourceSchema, SchemaRegistry};
    use nimbus_core::CanonicalUri;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ACCOUNT: &str = "https://api.example.com/v1/accounts/a1";
    const CUSTOM_DATA: &str = "https://api.example.com/v1/accounts/a1/customData";

    fn props(value: Value) -> Properties {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn catalog() -> Arc<dyn SchemaCatalog> {
        Arc::new(
            SchemaRegistry::new()
                .register(ResourceSchema::single("Account").with_link("customData", "CustomData"))
                .register(ResourceSchema::single("CustomData"))
                .register(ResourceSchema::collection("AccountList", "Account")),
        )
    }

    fn expanded_account() -> Properties {
        props(json!({
            "href": ACCOUNT,
            "givenName": "Han",
            "customData": { "href": CUSTOM_DATA, "rank": "captain" }
        }))
    }

    fn read(type_name: &str, href: &str) -> ResourceDataRequest {
        ResourceDataRequest::new(ResourceAction::Read, type_name, CanonicalUri::parse(href).unwrap())
    }

    #[test]
    fn test_flatten_splits_expanded_links() {
        let writes = writes_for(catalog().as_ref(), "Account", &expanded_account());

        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].region, "CustomData");
        assert_eq!(writes[0].href, CUSTOM_DATA);
        assert_eq!(writes[1].region, "Account");
        assert_eq!(writes[1].value["customData"], json!({ "href": CUSTOM_DATA }));
    }

    #[test]
    fn test_collection_page_is_not_cached() {
        let page = props(json!({
            "href": "https://api.example.com/v1/accounts",
            "offset": 0, "limit": 25, "size": 2,
            "items": [
                { "href": "https://api.example.com/v1/accounts/1", "givenName": "Han" },
                { "href": "https://api.example.com/v1/accounts/2", "givenName": "Leia" }
            ]
        }));
        let writes = writes_for(catalog().as_ref(), "AccountList", &page);
        let hrefs: Vec<_> = writes.iter().map(|w| w.href.as_str()).collect();

        assert_eq!(
            hrefs,
            vec![
                "https://api.example.com/v1/accounts/1",
                "https://api.example.com/v1/accounts/2"
            ]
        );
        assert!(writes.iter().all(|w| w.region == "Account"));
    }

    #[test]
    fn test_unexpanded_link_stays_inline() {
        let payload = props(json!({ "href": ACCOUNT, "customData": { "href": CUSTOM_DATA } }));
        let writes = writes_for(catalog().as_ref(), "Account", &payload);
        assert_eq!(writes.len(), 1);
    }

    #[test]
    fn test_derived_refs_only_under_deleted_href() {
        let entry = props(json!({
            "href": ACCOUNT,
            "customData": { "href": CUSTOM_DATA },
        }));
        let refs = derived_refs(catalog().as_ref(), "Account", ACCOUNT, &entry);
        assert_eq!(refs.len(), 1);

        let unrelated = derived_refs(catalog().as_ref(), "Account", "https://api.example.com/v1/accounts/a", &entry);
        assert!(unrelated.is_empty());
    }

    #[test]
    fn test_read_and_write_filters_round_trip_through_cache() {
        let provider = Arc::new(InMemoryCacheProvider::new());
        let resolver = CacheResolver::new(provider);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let chain = SyncFilterChain::new()
            .add(ReadCacheFilter::new(resolver.clone(), catalog()))
            .add(WriteCacheFilter::new(resolver, catalog()))
            .add(sync_filter_fn("network", move |request, _next| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(ResourceDataResult::for_request(&request, 200, Some(expanded_account())))
            }));

        let first = chain.execute(read("Account", ACCOUNT)).unwrap();
        let second = chain.execute(read("Account", ACCOUNT)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.body, second.body);
        assert_eq!(second.body.unwrap()["customData"]["rank"], json!("captain"));

        chain.execute(read("CustomData", CUSTOM_DATA)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_read_with_query_bypasses_cache() {
        let provider = Arc::new(InMemoryCacheProvider::new());
        let resolver = CacheResolver::new(provider);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let chain = SyncFilterChain::new()
            .add(ReadCacheFilter::new(resolver.clone(), catalog()))
            .add(WriteCacheFilter::new(resolver, catalog()))
            .add(sync_filter_fn("network", move |request, _next| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(ResourceDataResult::for_request(&request, 200, Some(expanded_account())))
            }));

        chain.execute(read("Account", ACCOUNT)).unwrap();
        chain
            .execute(read("Account", &format!("{}?expand=customData", ACCOUNT)))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_delete_evicts_entry_and_derived_links() {
        let provider = Arc::new(InMemoryCacheProvider::new());
        let resolver = CacheResolver::new(provider.clone());

        let chain = SyncFilterChain::new()
            .add(WriteCacheFilter::new(resolver, catalog()))
            .add(sync_filter_fn("network", |request, _next| match request.action {
                ResourceAction::Delete => Ok(ResourceDataResult::new(ResourceAction::Delete, 204)),
                _ => Ok(ResourceDataResult::for_request(&request, 200, Some(expanded_account()))),
            }));

        chain.execute(read("Account", ACCOUNT)).unwrap();
        assert_eq!(provider.region("Account").len(), 1);
        assert_eq!(provider.region("CustomData").len(), 1);

        let delete = ResourceDataRequest::new(
            ResourceAction::Delete,
            "Account",
            CanonicalUri::parse(ACCOUNT).unwrap(),
        );
        chain.execute(delete).unwrap();

        assert!(provider.region("Account").is_empty());
        assert!(provider.region("CustomData").is_empty());
    }

    #[test]
    fn test_error_responses_are_not_cached() {
        let provider = Arc::new(InMemoryCacheProvider::new());
        let resolver = CacheResolver::new(provider.clone());

        let chain = SyncFilterChain::new()
            .add(WriteCacheFilter::new(resolver, catalog()))
            .add(sync_filter_fn("network", |request, _next| {
                Ok(ResourceDataResult::for_request(&request, 404, Some(expanded_account())))
            }));

        chain.execute(read("Account", ACCOUNT)).unwrap();
        assert!(provider.region("Account").is_empty());
    }

    #[tokio::test]
    async fn test_async_write_skipped_when_cancelled() {
        use crate::filter::{async_filter_fn, AsyncFilterChain};
        use futures::FutureExt;

        let provider = Arc::new(InMemoryCacheProvider::new());
        let resolver = CacheResolver::new(provider.clone());

        let chain = AsyncFilterChain::new()
            .add(WriteCacheFilter::new(resolver, catalog()))
            .add(async_filter_fn("network", |request, _next, cancel| {
                async move {
                    cancel.cancel();
                    Ok(ResourceDataResult::for_request(&request, 200, Some(expanded_account())))
                }
                .boxed()
            }));

        let cancel = CancellationToken::new();
        chain.execute(read("Account", ACCOUNT), &cancel).await.unwrap();
        assert!(provider.region("Account").is_empty());
    }
}
