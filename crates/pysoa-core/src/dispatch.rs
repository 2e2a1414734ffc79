//! The [`JobDispatcher`] seam: a way for code that must not depend on
//! `pysoa-client` (namely `pysoa-expansion`) to still send jobs through it.
//!
//! The expansion engine issues its own action calls to fetch the objects a
//! response's expansions point at (spec §6, "Dispatch loop"). Those calls go
//! through the same client a caller used for the original request, so
//! `pysoa-expansion` needs *some* way to reach it. If `pysoa-expansion`
//! depended on `pysoa-client` directly, and `pysoa-client` depended on
//! `pysoa-expansion` to perform expansion after a call, the crate graph
//! would cycle. `pysoa-core` sits below both, so the trait lives here;
//! `pysoa-client` implements it, `pysoa-expansion` is generic over it.
//!
//! Mirrors [`crate::message::LocalActionDispatcher`]'s resolution of the
//! equivalent problem on the server side.

use crate::message::JobRequest;
use crate::message::JobResponse;

/// Sends a [`JobRequest`] to the named service and awaits its
/// [`JobResponse`], the same way a top-level client call would.
///
/// Implemented by `pysoa-client`'s `Client`; consumed by `pysoa-expansion`'s
/// dispatch loop and by anything else that needs to issue jobs without
/// depending on the concrete client type.
#[async_trait::async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Dispatch `job` to `service` and return its response, or a
    /// [`DispatchError`] if the job could not be completed at the transport
    /// level (the job having run and itself containing action errors is not
    /// a `DispatchError` — that's a normal [`JobResponse`]).
    async fn dispatch_job(
        &self,
        service: &str,
        job: JobRequest,
    ) -> Result<JobResponse, DispatchError>;
}

/// A failure to complete a job dispatch at the transport level, distinct
/// from the job itself running and returning action errors.
///
/// Parallel dispatch (spec §5, "send all requests, then collect all
/// responses") catches these per-service so one unreachable service doesn't
/// abort the whole batch; callers that asked for a future see it resolve to
/// this error instead of panicking the collection loop.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The underlying transport could not send or receive for `service`.
    #[error("transport error dispatching job to {service}: {message}")]
    Transport { service: String, message: String },
    /// No handler or transport configuration exists for `service`.
    #[error("no handler configured for service {service}")]
    UnknownService {
        /// The service name the caller asked for.
        service: String,
    },
    /// The caller asked for a response (`suppress_response == false`) but
    /// none arrived before the configured timeout.
    #[error("timed out waiting for a response from {service}")]
    Timeout {
        /// The service name the caller asked for.
        service: String,
    },
}

impl DispatchError {
    /// The name of the service this dispatch failure pertains to.
    #[must_use]
    pub fn service(&self) -> &str {
        match self {
            Self::Transport { service, .. }
            | Self::UnknownService { service }
            | Self::Timeout { service } => service,
        }
    }
}
