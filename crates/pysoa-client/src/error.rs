//! Client-facing error type (spec §4.4, §5).

use pysoa_core::{DispatchError, Error};
use pysoa_transport::SerializerError;

/// A failure surfaced by a `Client` call.
///
/// Job-level and action-level errors are not automatically raised — by
/// default the `raise_job_errors`/`raise_action_errors` flags on
/// `call_jobs_parallel` (and the equivalent implicit behavior of
/// `call_action`/`call_actions`) are `true`, matching spec §4.4, so most
/// callers see these as `Err` rather than having to inspect a response's
/// `errors` field themselves. Passing `false` gets the raw `JobResponse`
/// back instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// The transport or target service could not be reached.
    #[error("transport dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
    /// The response could not be decoded.
    #[error("failed to decode response: {0}")]
    Serializer(#[from] SerializerError),
    /// The job itself failed (envelope validation, etc.) before any action ran.
    #[error("job-level error: {0:?}")]
    JobError(Vec<Error>),
    /// A specific action in the job returned errors.
    #[error("action `{action}` returned errors: {errors:?}")]
    ActionError {
        /// The name of the action that returned errors.
        action: String,
        /// The errors the action returned.
        errors: Vec<Error>,
    },
    /// No response arrived within the caller's timeout.
    #[error("timed out waiting for a response from {service}")]
    Timeout {
        /// The service the caller was waiting on.
        service: String,
    },
    /// `suppress_response` was set on a call that requires a response.
    #[error("suppress_response is incompatible with call_actions and the parallel variants")]
    SuppressResponseIncompatible,
}
