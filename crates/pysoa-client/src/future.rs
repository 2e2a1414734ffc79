//! Future handles for the `*_future` call variants (spec §4.4, §5).
//!
//! A handle represents one already-issued request. `result()` blocks the
//! first caller until the response arrives (or the wait errors) and caches
//! the outcome so every subsequent caller gets the same value without
//! re-waiting — mirroring spec §5's "the cached exception's traceback is
//! preserved across re-raises".

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use crate::error::ClientError;
use crate::handler::ServiceHandler;
use pysoa_core::message::JobResponse;

/// A handle to a single in-flight (or already-issued) request.
pub struct ActionFuture {
    handler: Arc<ServiceHandler>,
    request_id: i64,
    cached: OnceCell<Result<JobResponse, ClientError>>,
}

impl ActionFuture {
    pub(crate) fn new(handler: Arc<ServiceHandler>, request_id: i64) -> Self {
        Self {
            handler,
            request_id,
            cached: OnceCell::new(),
        }
    }

    /// The request ID this future represents.
    #[must_use]
    pub fn request_id(&self) -> i64 {
        self.request_id
    }

    /// Block until the response is available, waiting at most `timeout` the
    /// first time this is called; subsequent calls return the cached
    /// result immediately regardless of `timeout`.
    pub async fn result(&self, timeout: Option<Duration>) -> Result<JobResponse, ClientError> {
        self.cached
            .get_or_init(|| async { self.handler.result(self.request_id, timeout).await })
            .await
            .clone()
    }

    /// Whether this future's result has already been fetched and cached.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cached.initialized()
    }
}
