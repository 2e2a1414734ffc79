//! Transport and serializer contracts, plus a JSON serializer (spec §4.2).
//!
//! No concrete broker transport ships here; that is deliberately an
//! external collaborator's responsibility.

pub mod error;
pub mod json;
pub mod message;
pub mod traits;

pub use error::{TransportError, validate_message_size};
pub use json::JsonSerializer;
pub use message::MessageMeta;
pub use traits::{Serializer, SerializerError, ServerTransport, Transport};
