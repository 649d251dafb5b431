use nimbus_core::CanonicalRequest;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

use super::{HttpResponse, RequestExecutor, SyncRequestExecutor, TransportError};

/// Runs an async executor on a dedicated current-thread runtime.
///
/// Must not be called from within an async context.
pub struct BlockingExecutor {
    inner: Arc<dyn RequestExecutor>,
    runtime: Runtime,
}

impl BlockingExecutor {
    pub fn new(inner: Arc<dyn RequestExecutor>) -> Result<Self, TransportError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TransportError::new(format!("Failed to start blocking runtime: {}", e)))?;
        Ok(Self { inner, runtime })
    }
}

impl SyncRequestExecutor for BlockingExecutor {
    fn execute(&self, request: CanonicalRequest) -> Result<HttpResponse, TransportError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(TransportError::new(
                "Blocking executor called from within an async runtime",
            ));
        }
        let cancel = CancellationToken::new();
        self.runtime.block_on(self.inner.execute(request, &cancel))
    }
}
