//! Server-internal failure modes that don't travel as wire [`Error`] values.

use pysoa_core::Error;

/// A defect detected while processing a single action, distinct from a
/// caller error: the outer job handler converts this into a job-level
/// `SERVER_ERROR` response rather than letting it reach the caller as an
/// ordinary action error (spec §4.5: "a server defect... reported as a
/// job-level `SERVER_ERROR`").
#[derive(Debug, Clone, PartialEq)]
pub enum ServerError {
    /// The action's `run` returned a body that failed `validate_response`.
    ResponseValidation {
        /// The action whose response failed validation.
        action: String,
        /// The validation errors raised.
        errors: Vec<Error>,
    },
}
