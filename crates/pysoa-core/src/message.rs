//! The RPC wire envelope: requests, responses, and the context/control
//! side-channels that travel alongside them (spec §3, §6).

use crate::error::Error;
use crate::switches::SwitchSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A free-form JSON object, used for action bodies, `Context`, and `Control`.
pub type JsonObject = serde_json::Map<String, Value>;

/// Build an empty [`JsonObject`].
#[must_use]
pub fn empty_object() -> JsonObject {
    JsonObject::new()
}

/// Free-form context propagated end-to-end through a job and into any
/// expansion sub-calls it triggers (spec §3).
pub type Context = JsonObject;

/// Recognized control keys for a [`JobRequest`] (spec §3, §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Control {
    /// Feature switches active for this job.
    #[serde(default)]
    pub switches: Vec<i64>,
    /// If `true`, a failing action does not halt the remaining actions in the job.
    #[serde(default)]
    pub continue_on_error: bool,
    /// Caller-supplied or server-generated correlation ID, echoed back end-to-end.
    #[serde(default)]
    pub correlation_id: Option<String>,
    /// If `true`, the caller does not want a response (one-way send).
    ///
    /// Incompatible with `call_actions` and the parallel variants (spec §5).
    #[serde(default)]
    pub suppress_response: bool,
}

impl Control {
    /// Build a `Control` from a switch set and the usual call-site flags.
    #[must_use]
    pub fn new(switches: Vec<i64>, continue_on_error: bool) -> Self {
        Self {
            switches,
            continue_on_error,
            correlation_id: None,
            suppress_response: false,
        }
    }

    /// Compile the `switches` field into a queryable [`SwitchSet`].
    #[must_use]
    pub fn switch_set(&self) -> SwitchSet {
        SwitchSet::from_iter(self.switches.iter().copied())
    }
}

/// A single action invocation within a [`JobRequest`] (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// The name of the action to invoke.
    pub action: String,
    /// The action's request body.
    #[serde(default)]
    pub body: JsonObject,
}

impl ActionRequest {
    /// Build a new request for `action` with an empty body.
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            body: empty_object(),
        }
    }

    /// Build a new request for `action` with the given body.
    #[must_use]
    pub fn with_body(action: impl Into<String>, body: JsonObject) -> Self {
        Self {
            action: action.into(),
            body,
        }
    }
}

/// The result of running a single action (spec §3).
///
/// `action` always equals the requesting [`ActionRequest::action`] (spec §3
/// invariant); `errors` is non-empty iff this specific action failed —
/// a job-level failure lives on [`JobResponse::errors`] instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionResponse {
    /// The name of the action that produced this response.
    pub action: String,
    /// The action's response body.
    #[serde(default)]
    pub body: JsonObject,
    /// Errors raised while processing this action.
    #[serde(default)]
    pub errors: Vec<Error>,
}

impl ActionResponse {
    /// Build a successful response for `action`.
    #[must_use]
    pub fn new(action: impl Into<String>, body: JsonObject) -> Self {
        Self {
            action: action.into(),
            body,
            errors: Vec::new(),
        }
    }

    /// Build a failed response for `action` carrying the given errors.
    #[must_use]
    pub fn with_errors(action: impl Into<String>, errors: Vec<Error>) -> Self {
        Self {
            action: action.into(),
            body: empty_object(),
            errors,
        }
    }

    /// Whether this action's response carries any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A job: one or more actions sent and returned together (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    /// The ordered list of actions to invoke, 1..N.
    pub actions: Vec<ActionRequest>,
    /// Job-level control flags.
    #[serde(default)]
    pub control: Control,
    /// Free-form context propagated to every action and any expansion sub-calls.
    #[serde(default)]
    pub context: Context,
}

impl JobRequest {
    /// Build a job with a single action and default control/context.
    #[must_use]
    pub fn single(action: ActionRequest) -> Self {
        Self {
            actions: vec![action],
            control: Control::default(),
            context: empty_object(),
        }
    }
}

/// The result of processing a [`JobRequest`] (spec §3).
///
/// `actions` has the same length and order as the request's `actions`,
/// except truncated on first error if `control.continue_on_error` was
/// `false` (spec §8 invariant). `errors` is non-empty iff the whole job
/// failed envelope validation and no actions ran at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobResponse {
    /// Per-action responses, in request order.
    #[serde(default)]
    pub actions: Vec<ActionResponse>,
    /// Job-level errors; non-empty iff the job could not be dispatched at all.
    #[serde(default)]
    pub errors: Vec<Error>,
    /// Context echoed back to the caller; carries at least `correlation_id`.
    #[serde(default)]
    pub context: Context,
}

impl JobResponse {
    /// Build a job-level failure response (no actions ran).
    #[must_use]
    pub fn job_error(errors: Vec<Error>, context: Context) -> Self {
        Self {
            actions: Vec::new(),
            errors,
            context,
        }
    }

    /// Whether this response represents a job-level failure (no actions ran).
    #[must_use]
    pub fn is_job_error(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// An [`ActionRequest`] enriched with per-job context on the server side
/// (spec §3, §4.5): the compiled switch set, the job's context and control,
/// and a handle the action can use to invoke other actions on the same
/// server without going through the transport (spec §4.5 "In-process action
/// calls").
#[derive(Clone)]
pub struct EnrichedActionRequest {
    /// The underlying action request (name + body).
    pub request: ActionRequest,
    /// The job's compiled switch set.
    pub switches: SwitchSet,
    /// The job's context, shared (not copied) with any expansion sub-calls.
    pub context: Arc<Context>,
    /// The job's control flags.
    pub control: Arc<Control>,
    /// A handle for invoking other actions on the same server in-process.
    pub local_dispatcher: Arc<dyn LocalActionDispatcher>,
}

impl EnrichedActionRequest {
    /// The action name being invoked.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.request.action
    }

    /// The action's request body.
    #[must_use]
    pub fn body(&self) -> &JsonObject {
        &self.request.body
    }

    /// Invoke another action on the same server, reusing this request's
    /// context and control but replacing the body (spec §4.5).
    pub async fn call_local_action(
        &self,
        action: &str,
        body: JsonObject,
    ) -> ActionResponse {
        self.local_dispatcher
            .call_local_action(action, body, self.context.clone(), self.control.clone())
            .await
    }
}

impl std::fmt::Debug for EnrichedActionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichedActionRequest")
            .field("request", &self.request)
            .field("switches", &self.switches)
            .finish_non_exhaustive()
    }
}

/// A handle that lets an [`EnrichedActionRequest`] invoke sibling actions on
/// the same server without going through the transport.
///
/// Defined here (rather than in `pysoa-server`) so `pysoa-core` has no
/// dependency on the server crate — the server implements this trait and
/// hands a trait object to each enriched request it builds.
#[async_trait::async_trait]
pub trait LocalActionDispatcher: Send + Sync {
    /// Run `action` with `body`, reusing `context` and `control` from the
    /// calling job, exactly as a transport-mediated call would.
    async fn call_local_action(
        &self,
        action: &str,
        body: JsonObject,
        context: Arc<Context>,
        control: Arc<Control>,
    ) -> ActionResponse;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_response_actions_never_exceed_request_actions() {
        let req = JobRequest {
            actions: vec![ActionRequest::new("a"), ActionRequest::new("b")],
            control: Control::default(),
            context: empty_object(),
        };
        let resp = JobResponse {
            actions: vec![ActionResponse::new("a", empty_object())],
            errors: Vec::new(),
            context: empty_object(),
        };
        assert!(resp.actions.len() <= req.actions.len());
    }

    #[test]
    fn control_switch_set_membership() {
        let control = Control::new(vec![1, 2, 3], false);
        let switches = control.switch_set();
        assert!(switches.contains(2));
        assert!(!switches.contains(4));
    }
}
