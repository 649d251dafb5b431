//! Shared fixtures for SDK integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use nimbus_core::{CanonicalRequest, HttpMethod};
use nimbus_runtime::{
    CancellationToken, HttpResponse, RequestExecutor, Resource, ResourceHandle, ResourceSchema,
    SchemaRegistry, TransportError,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const BASE_URL: &str = "https://api.example.com/v1";

#[derive(Debug, Clone)]
pub struct Account {
    handle: ResourceHandle,
}

impl Account {
    pub fn given_name(&self) -> Option<String> {
        self.handle.get_str("givenName")
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

pub fn catalog() -> Arc<SchemaRegistry> {
    Arc::new(
        SchemaRegistry::new()
            .register(ResourceSchema::single("Account"))
            .register(ResourceSchema::collection("AccountList", "Account")),
    )
}

pub fn account_json(id: &str, given_name: &str) -> Value {
    json!({
        "href": format!("{}/accounts/{}", BASE_URL, id),
        "givenName": given_name,
        "surname": "Solo"
    })
}

/// Async executor answering every GET with the same account
pub struct AccountExecutor {
    body: Vec<u8>,
    calls: Mutex<Vec<(HttpMethod, String)>>,
}

impl AccountExecutor {
    pub fn new(account: Value) -> Arc<Self> {
        Arc::new(Self {
            body: serde_json::to_vec(&account).unwrap(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, url)| url.clone()).collect()
    }
}

#[async_trait]
impl RequestExecutor for AccountExecutor {
    async fn execute(
        &self,
        request: CanonicalRequest,
        _cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.method(), request.uri().to_string()));
        Ok(HttpResponse::new(200, self.body.clone()))
    }
}
