//! Transport failure modes (spec §4.2).
//!
//! Mirrors the teacher's `turbomcp-transport-traits::error::TransportError`:
//! a `#[non_exhaustive]` `thiserror` enum with one variant per named failure
//! mode, plus size-validation helpers transports can call before attempting
//! to send.

/// Failures a [`crate::traits::Transport`] or [`crate::traits::ServerTransport`]
/// implementation may report.
///
/// `#[non_exhaustive]` so a concrete transport crate (a Redis gateway, say)
/// can be added later without this becoming a breaking change for existing
/// match arms.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The transport could not send the outgoing request or response blob.
    #[error("failed to send message for request {request_id}: {reason}")]
    MessageSendError {
        /// The correlation ID of the message that failed to send.
        request_id: i64,
        /// A human-readable description of the underlying failure.
        reason: String,
    },

    /// The transport encountered an error while receiving a message.
    #[error("failed to receive message: {reason}")]
    MessageReceiveError {
        /// A human-readable description of the underlying failure.
        reason: String,
    },

    /// No message arrived within the caller's requested timeout.
    #[error("timed out after {timeout_secs:.3}s waiting for a message")]
    MessageReceiveTimeout {
        /// The timeout, in seconds, that elapsed.
        timeout_secs: f64,
    },

    /// The message exceeds the transport's configured size limit.
    #[error("message of {actual_bytes} bytes exceeds the transport limit of {max_bytes} bytes")]
    MessageTooLarge {
        /// The actual encoded size of the message, in bytes.
        actual_bytes: usize,
        /// The transport's configured maximum, in bytes.
        max_bytes: usize,
    },

    /// A transient failure (e.g. a backing broker failover) that is safe to
    /// retry without caller-visible side effects.
    #[error("transient transport error: {reason}")]
    Transient {
        /// A human-readable description of the underlying failure.
        reason: String,
    },
}

impl TransportError {
    /// Whether retrying the same operation is expected to be safe and may
    /// succeed (spec §4.2: "Transient errors are recoverable by retrying").
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Validate an outgoing message's encoded size against `max_bytes`, if any.
///
/// Transports call this before attempting to send so an oversized message
/// fails fast as [`TransportError::MessageTooLarge`] rather than being
/// rejected by the wire protocol further downstream.
pub fn validate_message_size(
    encoded: &[u8],
    max_bytes: Option<usize>,
) -> Result<(), TransportError> {
    if let Some(max_bytes) = max_bytes {
        if encoded.len() > max_bytes {
            return Err(TransportError::MessageTooLarge {
                actual_bytes: encoded.len(),
                max_bytes,
            });
        }
    }
    Ok(())
}
