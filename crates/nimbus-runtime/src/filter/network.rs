//! Terminal filters that send requests over the transport

use async_trait::async_trait;
use nimbus_core::{CanonicalRequest, HttpMethod};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{AsyncFilter, AsyncNext, ResourceAction, ResourceDataRequest, ResourceDataResult, SyncFilter, SyncNext};
use crate::error::{ApiError, DataStoreError, Result};
use crate::serializer::Serializer;
use crate::transport::{HttpResponse, RequestExecutor, SyncRequestExecutor};

fn method_for(action: ResourceAction) -> HttpMethod {
    match action {
        ResourceAction::Create | ResourceAction::Update => HttpMethod::POST,
        ResourceAction::Read => HttpMethod::GET,
        ResourceAction::Delete => HttpMethod::DELETE,
    }
}

fn build_request(request: &ResourceDataRequest, serializer: &dyn Serializer) -> Result<CanonicalRequest> {
    let mut http = CanonicalRequest::new(method_for(request.action), request.uri.clone())
        .with_header("Accept", serializer.content_type());
    for (key, value) in &request.headers {
        http = http.with_header(key.clone(), value.clone());
    }
    if let Some(body) = &request.body {
        http = http
            .with_header("Content-Type", serializer.content_type())
            .with_body(serializer.serialize(body)?);
    }
    Ok(http)
}

fn into_result(
    request: &ResourceDataRequest,
    response: HttpResponse,
    serializer: &dyn Serializer,
) -> Result<ResourceDataResult> {
    if !response.is_success() {
        // Error bodies that are not valid payloads still carry the status
        let payload = serializer.deserialize(&response.body).unwrap_or_default();
        let error = ApiError::from_payload(response.status, &payload);
        warn!(href = request.href(), status = response.status, "API returned an error: {}", error);
        return Err(DataStoreError::Api(error));
    }

    let body = serializer.deserialize(&response.body)?;
    let body = (!body.is_empty()).then_some(body);
    Ok(ResourceDataResult::for_request(request, response.status, body))
}

/// Blocking network filter
pub struct SyncNetworkFilter {
    executor: Arc<dyn SyncRequestExecutor>,
    serializer: Arc<dyn Serializer>,
}

impl SyncNetworkFilter {
    pub fn new(executor: Arc<dyn SyncRequestExecutor>, serializer: Arc<dyn Serializer>) -> Self {
        Self { executor, serializer }
    }
}

impl SyncFilter for SyncNetworkFilter {
    fn filter(&self, request: ResourceDataRequest, _next: SyncNext<'_>) -> Result<ResourceDataResult> {
        let http = build_request(&request, self.serializer.as_ref())?;
        let response = self.executor.execute(http)?;
        into_result(&request, response, self.serializer.as_ref())
    }

    fn name(&self) -> &str {
        "network"
    }
}

/// Async network filter; the call races the cancellation token
pub struct AsyncNetworkFilter {
    executor: Arc<dyn RequestExecutor>,
    serializer: Arc<dyn Serializer>,
}

impl AsyncNetworkFilter {
    pub fn new(executor: Arc<dyn RequestExecutor>, serializer: Arc<dyn Serializer>) -> Self {
        Self { executor, serializer }
    }
}

#[async_trait]
impl AsyncFilter for AsyncNetworkFilter {
    async fn filter(
        &self,
        request: ResourceDataRequest,
        _next: AsyncNext<'_>,
        cancel: &CancellationToken,
    ) -> Result<ResourceDataResult> {
        if cancel.is_cancelled() {
            return Err(DataStoreError::Cancelled);
        }
        let http = build_request(&request, self.serializer.as_ref())?;

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DataStoreError::Cancelled),
            response = self.executor.execute(http, cancel) => response?,
        };

        if cancel.is_cancelled() {
            return Err(DataStoreError::Cancelled);
        }
        into_result(&request, response, self.serializer.as_ref())
    }

    fn name(&self) -> &str {
        "network"
    }
}
