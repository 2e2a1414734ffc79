//! The `Action` contract every server-side action implements (spec §4.5).

use async_trait::async_trait;
use pysoa_core::message::EnrichedActionRequest;
use pysoa_core::{Error, JsonObject};

/// A single action a server can run.
///
/// `validate_request` and `validate_response` default to no-ops; most
/// actions only need to implement `run`. Both validation hooks see the full
/// [`EnrichedActionRequest`] (not just the raw body) so a composite action
/// like [`crate::switched::SwitchedAction`] can select a branch by switch
/// and delegate all three calls to it consistently.
#[async_trait]
pub trait Action: Send + Sync {
    /// Validate the incoming request before `run` is called. Errors
    /// returned here are caller errors by convention.
    fn validate_request(&self, _request: &EnrichedActionRequest) -> Result<(), Vec<Error>> {
        Ok(())
    }

    /// Run the action, producing a response body or a list of errors.
    async fn run(&self, request: EnrichedActionRequest) -> Result<JsonObject, Vec<Error>>;

    /// Validate the outgoing response body after `run` succeeds. A failure
    /// here reflects a bug in the action, not the caller.
    fn validate_response(&self, _body: &JsonObject) -> Result<(), Vec<Error>> {
        Ok(())
    }
}
