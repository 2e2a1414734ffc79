//! The `Transport` and `Serializer` contracts (spec §4.2).
//!
//! Deliberately abstract: no concrete backing broker lives in this crate.
//! Shapes follow the teacher's `turbomcp-transport-traits::traits` module,
//! which keeps transport and serialization as two small `async_trait`
//! contracts rather than one monolithic interface.

use crate::error::TransportError;
use crate::message::MessageMeta;
use async_trait::async_trait;
use pysoa_core::JsonObject;
use std::time::Duration;

/// The client side of a transport: send a request blob tagged with a
/// correlation ID, and poll for response blobs as they arrive.
///
/// `receive_response_message` returns `Ok(None)` rather than blocking
/// forever when `timeout` elapses with nothing received — the spec's "nil"
/// sentinel for "no message yet" (§4.2).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request blob, tagged with `request_id`, expiring after
    /// `expiry` if the backing transport supports message TTLs.
    async fn send_request_message(
        &self,
        request_id: i64,
        meta: MessageMeta,
        body: Vec<u8>,
        expiry: Option<Duration>,
    ) -> Result<(), TransportError>;

    /// Poll for the next available response blob, waiting up to `timeout`.
    ///
    /// Returns `Ok(None)` on a timeout with no message received — this is
    /// not itself a [`TransportError::MessageReceiveTimeout`]; that variant
    /// is for the caller-facing `call_*` timeout (spec §5), not this
    /// single-poll primitive.
    async fn receive_response_message(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<(i64, MessageMeta, Vec<u8>)>, TransportError>;
}

/// The server side of a transport: receive request blobs, send response
/// blobs keyed to the same correlation ID (spec §4.2, "symmetric").
#[async_trait]
pub trait ServerTransport: Send + Sync {
    /// Block (up to `timeout`) for the next incoming request blob.
    async fn receive_request_message(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<(i64, MessageMeta, Vec<u8>)>, TransportError>;

    /// Send a response blob keyed to `request_id`.
    async fn send_response_message(
        &self,
        request_id: i64,
        meta: MessageMeta,
        body: Vec<u8>,
    ) -> Result<(), TransportError>;
}

/// A pure codec between [`JsonObject`] and opaque bytes (spec §4.2).
///
/// Implementations carry no transport knowledge; `mime_type` identifies the
/// codec so a peer can select a matching decoder from the metadata the
/// transport delivers alongside the blob.
pub trait Serializer: Send + Sync {
    /// The MIME type this serializer's encoded bytes carry.
    fn mime_type(&self) -> &str;

    /// Encode a JSON object into bytes.
    fn encode(&self, value: &JsonObject) -> Result<Vec<u8>, SerializerError>;

    /// Decode bytes back into a JSON object.
    fn decode(&self, bytes: &[u8]) -> Result<JsonObject, SerializerError>;
}

/// A failure to encode or decode a message body.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SerializerError {
    /// The payload could not be encoded into this serializer's format.
    #[error("failed to encode message: {reason}")]
    Encode {
        /// A human-readable description of the underlying failure.
        reason: String,
    },
    /// The payload could not be decoded from this serializer's format.
    #[error("failed to decode message: {reason}")]
    Decode {
        /// A human-readable description of the underlying failure.
        reason: String,
    },
}
