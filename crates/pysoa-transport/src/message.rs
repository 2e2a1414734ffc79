//! Per-message metadata carried alongside every blob (spec §4.2, §6).

use compact_str::CompactString;
use std::collections::HashMap;

/// Metadata delivered by the transport alongside a message blob.
///
/// At minimum carries `mime_type` so the receiver can pick a matching
/// [`crate::traits::Serializer`]; `extra` lets transport-specific fields
/// (e.g. a Redis stream's delivery count) ride along unchanged, as the spec
/// requires ("Additional transport-specific fields may ride along
/// unchanged").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMeta {
    /// The MIME type identifying which serializer encoded this message.
    pub mime_type: CompactString,
    /// Transport-specific fields the core does not interpret.
    pub extra: HashMap<String, String>,
}

impl MessageMeta {
    /// Build metadata carrying only a `mime_type`, no extra fields.
    #[must_use]
    pub fn new(mime_type: impl Into<CompactString>) -> Self {
        Self {
            mime_type: mime_type.into(),
            extra: HashMap::new(),
        }
    }

    /// Attach an extra transport-specific field.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
