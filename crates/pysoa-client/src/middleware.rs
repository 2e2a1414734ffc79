//! Client-side middleware hook shapes (spec §4.3).
//!
//! The generic onion engine lives in `pysoa-core`; this module only
//! instantiates it with the two concrete shapes the client needs: wrapping
//! an outbound send, and wrapping an inbound decode. Kept as two distinct
//! trait aliases rather than one, per the design note in spec.md §9.

use pysoa_core::message::JobRequest;
use pysoa_core::{Middleware, NextFn};
use pysoa_transport::MessageMeta;

use crate::error::ClientError;

/// What the request middleware chain wraps: a job about to be sent to
/// `service`.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// The target service name.
    pub service: String,
    /// The correlation ID already allocated for this send.
    pub request_id: i64,
    /// The job about to be encoded and sent.
    pub job: JobRequest,
}

/// A layer wrapping the client's send-request step (spec §4.3: "wraps...
/// send-request... on the client side"). Outer-to-inner on the way out,
/// matching spec §4.1's data-flow description.
pub trait ClientRequestMiddleware: Middleware<OutboundRequest, Result<i64, ClientError>> {}
impl<T> ClientRequestMiddleware for T where
    T: Middleware<OutboundRequest, Result<i64, ClientError>>
{
}

/// What the response middleware chain wraps: a raw response blob that has
/// arrived off the transport and is about to be decoded.
#[derive(Debug, Clone)]
pub struct RawReceived {
    /// The target service name the request was sent to.
    pub service: String,
    /// The correlation ID this response is for.
    pub request_id: i64,
    /// Per-message metadata delivered by the transport (carries `mime_type`).
    pub meta: MessageMeta,
    /// The raw, not-yet-decoded response bytes.
    pub bytes: Vec<u8>,
}

/// A layer wrapping the client's receive-response step (spec §4.3: "...and
/// receive-response on the client side"). Inner-to-outer on the way back,
/// i.e. the first-registered middleware is the last to see the decoded
/// result before it reaches the caller.
pub trait ClientResponseMiddleware: Middleware<RawReceived, Result<JobRequestResponse, ClientError>> {}
impl<T> ClientResponseMiddleware for T where
    T: Middleware<RawReceived, Result<JobRequestResponse, ClientError>>
{
}

/// The decoded counterpart of [`OutboundRequest`], produced by the base
/// decode step at the bottom of the response onion.
pub type JobRequestResponse = pysoa_core::message::JobResponse;

pub(crate) type RequestChain = Vec<std::sync::Arc<dyn Middleware<OutboundRequest, Result<i64, ClientError>>>>;
pub(crate) type ResponseChain =
    Vec<std::sync::Arc<dyn Middleware<RawReceived, Result<JobRequestResponse, ClientError>>>>;

/// Compose a request middleware chain around `base`.
pub fn compose_request(
    chain: &RequestChain,
    base: NextFn<OutboundRequest, Result<i64, ClientError>>,
) -> NextFn<OutboundRequest, Result<i64, ClientError>> {
    pysoa_core::compose(chain, base)
}

/// Compose a response middleware chain around `base`.
pub fn compose_response(
    chain: &ResponseChain,
    base: NextFn<RawReceived, Result<JobRequestResponse, ClientError>>,
) -> NextFn<RawReceived, Result<JobRequestResponse, ClientError>> {
    pysoa_core::compose(chain, base)
}
