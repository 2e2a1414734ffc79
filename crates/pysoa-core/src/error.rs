//! The wire-level [`Error`] value type and the canonical error codes.
//!
//! PySOA errors are not exceptions carried out of band — they are plain,
//! immutable values that travel inside a [`crate::message::JobResponse`] or
//! [`crate::message::ActionResponse`]. `ErrorCode` intentionally stays an
//! open string rather than a closed enum: application actions are free to
//! raise their own domain codes (see spec §7), while the six codes the core
//! itself emits are exposed as associated constants for convenience and
//! exhaustive matching in tests.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The machine-readable error code carried on every [`Error`].
///
/// This is a thin wrapper around a short string rather than a closed enum,
/// because application actions may raise codes the core doesn't know about
/// (spec §7: "plus domain codes defined by application actions").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub CompactString);

impl ErrorCode {
    /// Request or response body failed schema validation.
    pub const INVALID: &'static str = "INVALID";
    /// A required field was absent from the request.
    pub const MISSING: &'static str = "MISSING";
    /// The referenced action does not exist on the target server.
    pub const UNKNOWN: &'static str = "UNKNOWN";
    /// An uncaught exception occurred while running an action.
    pub const SERVER_ERROR: &'static str = "SERVER_ERROR";
    /// The serialized response exceeded the transport's size limit.
    pub const RESPONSE_TOO_LARGE: &'static str = "RESPONSE_TOO_LARGE";
    /// The caller lacked the permissions required to perform the action.
    pub const NOT_AUTHORIZED: &'static str = "NOT_AUTHORIZED";

    /// Build a code from any string-like value, including application-defined codes.
    pub fn new(code: impl Into<CompactString>) -> Self {
        Self(code.into())
    }

    /// Shorthand for the `INVALID` code.
    #[must_use]
    pub fn invalid() -> Self {
        Self::new(Self::INVALID)
    }

    /// Shorthand for the `MISSING` code.
    #[must_use]
    pub fn missing() -> Self {
        Self::new(Self::MISSING)
    }

    /// Shorthand for the `UNKNOWN` code.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN)
    }

    /// Shorthand for the `SERVER_ERROR` code.
    #[must_use]
    pub fn server_error() -> Self {
        Self::new(Self::SERVER_ERROR)
    }

    /// Shorthand for the `RESPONSE_TOO_LARGE` code.
    #[must_use]
    pub fn response_too_large() -> Self {
        Self::new(Self::RESPONSE_TOO_LARGE)
    }

    /// Shorthand for the `NOT_AUTHORIZED` code.
    #[must_use]
    pub fn not_authorized() -> Self {
        Self::new(Self::NOT_AUTHORIZED)
    }

    /// Returns the code as a plain string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ErrorCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ErrorCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// An immutable error value, in the format transmitted between client and
/// server (spec §3, §4.1).
///
/// `Error` values are never mutated after construction; every setter here
/// consumes `self` and returns a new value, mirroring the teacher's
/// `McpError::with_operation`-style builder chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// Dotted path into the request that the error pertains to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Server-side stack trace, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
    /// Variables captured at the error site, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, Value>>,
    /// Permissions that were denied, if this is a `NOT_AUTHORIZED` error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denied_permissions: Option<Vec<String>>,
    /// Whether the caller (rather than the server) is at fault.
    ///
    /// Defaults to `false`. Schema-validation errors and missing-action
    /// errors set this to `true` at the point they're raised; an error
    /// whose origin is unknown is never retroactively upgraded (spec §9).
    pub is_caller_error: bool,
}

impl Error {
    /// Construct a new error with the given code and message.
    ///
    /// `is_caller_error` defaults to `false`; use [`Error::caller`] for the
    /// common case of a caller-attributable error.
    #[must_use]
    pub fn new(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            traceback: None,
            variables: None,
            denied_permissions: None,
            is_caller_error: false,
        }
    }

    /// Construct a new error with `is_caller_error` set to `true`.
    #[must_use]
    pub fn caller(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self::new(code, message).with_is_caller_error(true)
    }

    /// A `MISSING` caller error for the given field.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::caller(ErrorCode::missing(), format!("Field is required: {field}")).with_field(field)
    }

    /// An `INVALID` caller error for the given field and reason.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::caller(ErrorCode::invalid(), reason.into()).with_field(field)
    }

    /// An `UNKNOWN` caller error reporting that `action` does not exist.
    #[must_use]
    pub fn unknown_action(action: &str) -> Self {
        Self::caller(
            ErrorCode::unknown(),
            format!("Action does not exist: {action}"),
        )
        .with_field("action")
    }

    /// A `SERVER_ERROR` for an uncaught exception, carrying its traceback.
    #[must_use]
    pub fn server_error(message: impl Into<String>, traceback: Option<String>) -> Self {
        let mut err = Self::new(ErrorCode::server_error(), message);
        err.traceback = traceback;
        err
    }

    /// A `RESPONSE_TOO_LARGE` job-level error.
    #[must_use]
    pub fn response_too_large(size: usize, max: usize) -> Self {
        Self::new(
            ErrorCode::response_too_large(),
            format!("Response size ({size} bytes) exceeds maximum allowed ({max} bytes)"),
        )
    }

    /// A `NOT_AUTHORIZED` error carrying the permissions that were denied.
    #[must_use]
    pub fn not_authorized(denied_permissions: Vec<String>) -> Self {
        let mut err = Self::caller(
            ErrorCode::not_authorized(),
            "Caller lacks required permissions",
        );
        err.denied_permissions = Some(denied_permissions);
        err
    }

    /// Set the `field` this error pertains to.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Set the `traceback` for this error.
    #[must_use]
    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }

    /// Attach a captured variable to this error.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Explicitly set `is_caller_error`.
    #[must_use]
    pub fn with_is_caller_error(mut self, is_caller_error: bool) -> Self {
        self.is_caller_error = is_caller_error;
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(field) = &self.field {
            write!(f, " (field: {field})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_is_caller_error() {
        let err = Error::missing_field("name");
        assert_eq!(err.code.as_str(), ErrorCode::MISSING);
        assert_eq!(err.field.as_deref(), Some("name"));
        assert!(err.is_caller_error);
    }

    #[test]
    fn server_error_defaults_to_not_caller_error() {
        let err = Error::server_error("boom", Some("trace".into()));
        assert!(!err.is_caller_error);
        assert_eq!(err.traceback.as_deref(), Some("trace"));
    }

    #[test]
    fn equality_is_value_equality() {
        let a = Error::missing_field("name");
        let b = Error::missing_field("name");
        assert_eq!(a, b);
    }

    #[test]
    fn custom_domain_code_round_trips() {
        let err = Error::new("RATE_LIMITED", "slow down");
        let json = serde_json::to_string(&err).unwrap();
        let back: Error = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
