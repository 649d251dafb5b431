//! Common test utilities for runtime integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use nimbus_core::{CanonicalRequest, HttpMethod, Properties};
use nimbus_runtime::{
    CancellationToken, DataStore, DataStoreBuilder, HttpResponse, RequestExecutor, Resource,
    ResourceHandle, ResourceSchema, SchemaRegistry, SyncRequestExecutor, TransportError,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub const BASE_URL: &str = "https://api.example.com/v1";

pub fn href(path: &str) -> String {
    format!("{}{}", BASE_URL, path)
}

pub fn props(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        _ => panic!("Expected JSON object"),
    }
}

// ========== Resource types ==========

#[derive(Debug, Clone)]
pub struct Account {
    handle: ResourceHandle,
}

impl Account {
    pub fn given_name(&self) -> Option<String> {
        self.handle.get_str("givenName")
    }

    pub fn set_given_name(&self, name: &str) {
        self.handle.set("givenName", name);
    }

    pub fn email(&self) -> Option<String> {
        self.handle.get_str("email")
    }

    pub fn set_email(&self, email: &str) {
        self.handle.set("email", email);
    }
}

impl Resource for Account {
    const TYPE_NAME: &'static str = "Account";

    fn from_handle(handle: ResourceHandle) -> Self {
        Self { handle }
    }

    fn handle(&self) -> &ResourceHandle {
        &self.handle
    }
}

#[derive(Debug, Clone)]
pub struct CustomData {
    handle: ResourceHandle,
}

impl CustomData {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.handle.get(key)
    }
}

impl Resource for CustomData {
    const TYPE_NAME: &'static str = "CustomData";

    fn from_handle(handle: ResourceHandle) -> Self {
        Self { handle }
    }

    fn handle(&self) -> &ResourceHandle {
        &self.handle
    }
}

#[derive(Debug, Clone)]
pub struct Application {
    handle: ResourceHandle,
}

impl Application {
    pub fn name(&self) -> Option<String> {
        self.handle.get_str("name")
    }
}

impl Resource for Application {
    const TYPE_NAME: &'static str = "Application";

    fn from_handle(handle: ResourceHandle) -> Self {
        Self { handle }
    }

    fn handle(&self) -> &ResourceHandle {
        &self.handle
    }
}

pub fn catalog() -> Arc<SchemaRegistry> {
    Arc::new(
        SchemaRegistry::new()
            .register(ResourceSchema::single("Account").with_link("customData", "CustomData"))
            .register(ResourceSchema::collection("AccountList", "Account"))
            .register(ResourceSchema::single("CustomData"))
            .register(ResourceSchema::single("Application"))
            .register(ResourceSchema::collection("ApplicationList", "Application")),
    )
}

// ========== Fake payloads ==========

pub fn account_json(id: &str, given_name: &str) -> Value {
    json!({
        "href": href(&format!("/accounts/{}", id)),
        "givenName": given_name,
        "surname": "Solo",
        "email": format!("{}@example.com", given_name.to_lowercase()),
        "status": "ENABLED",
        "customData": { "href": href(&format!("/accounts/{}/customData", id)) }
    })
}

pub fn account_with_custom_data(id: &str, given_name: &str) -> Value {
    let mut account = account_json(id, given_name);
    account["customData"] = json!({
        "href": href(&format!("/accounts/{}/customData", id)),
        "createdAt": "2015-01-01T00:00:00.000Z",
        "rank": "captain"
    });
    account
}

pub fn account_page(path: &str, accounts: Vec<Value>) -> Value {
    json!({
        "href": href(path),
        "offset": 0,
        "limit": 25,
        "size": accounts.len(),
        "items": accounts
    })
}

// ========== Stub transport ==========

/// Canned-response executor that records every request
#[derive(Default)]
pub struct StubExecutor {
    routes: Mutex<HashMap<(HttpMethod, String), HttpResponse>>,
    calls: Mutex<Vec<CanonicalRequest>>,
}

impl StubExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Respond to `method` on `url` (full URL including any query string)
    pub fn respond(&self, method: HttpMethod, url: &str, status: u16, body: Value) {
        let bytes = if body.is_null() {
            Vec::new()
        } else {
            serde_json::to_vec(&body).unwrap()
        };
        self.routes
            .lock()
            .insert((method, url.to_string()), HttpResponse::new(status, bytes));
    }

    pub fn calls(&self) -> Vec<CanonicalRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn count(&self, method: HttpMethod) -> usize {
        self.calls.lock().iter().filter(|r| r.method() == method).count()
    }

    pub fn last_body(&self) -> Option<Value> {
        let calls = self.calls.lock();
        let body = calls.last()?.body()?;
        serde_json::from_slice(body).ok()
    }

    fn answer(&self, request: CanonicalRequest) -> HttpResponse {
        let key = (request.method(), request.uri().to_string());
        self.calls.lock().push(request);
        self.routes.lock().get(&key).cloned().unwrap_or_else(|| {
            HttpResponse::new(
                404,
                serde_json::to_vec(&json!({
                    "status": 404,
                    "code": 404,
                    "message": "The requested resource does not exist.",
                    "developerMessage": format!("No route for {} {}", key.0, key.1)
                }))
                .unwrap(),
            )
        })
    }
}

#[async_trait]
impl RequestExecutor for StubExecutor {
    async fn execute(
        &self,
        request: CanonicalRequest,
        _cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        Ok(self.answer(request))
    }
}

impl SyncRequestExecutor for StubExecutor {
    fn execute(&self, request: CanonicalRequest) -> Result<HttpResponse, TransportError> {
        Ok(self.answer(request))
    }
}

/// Executor that never answers until its token is cancelled
pub struct HangingExecutor;

#[async_trait]
impl RequestExecutor for HangingExecutor {
    async fn execute(
        &self,
        _request: CanonicalRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        cancel.cancelled().await;
        Err(TransportError::new("cancelled"))
    }
}

// ========== Data stores ==========

pub fn builder(executor: &Arc<StubExecutor>) -> DataStoreBuilder {
    DataStore::builder(BASE_URL)
        .with_catalog(catalog())
        .with_executor(executor.clone())
        .with_sync_executor(executor.clone())
}

pub fn cached_store(executor: &Arc<StubExecutor>) -> DataStore {
    builder(executor).build().unwrap()
}

pub fn uncached_store(executor: &Arc<StubExecutor>) -> DataStore {
    builder(executor).without_cache().build().unwrap()
}
