//! A single stubbed `(service, action)` and the script it plays back.
//!
//! Grounded on `stub_service.py`'s `StubServer.stub_action`/`process_message`:
//! a stub is keyed by `(service, action)` and answers with a fixed body, a
//! fixed error list, or a callable given the incoming body. Spec §4.7 adds a
//! sequence form ("one per sequential call"); once the sequence is
//! exhausted this plays the last step on every further call, rather than
//! erroring, so a long-running test doesn't need to size the script exactly.

use std::sync::Arc;

use parking_lot::Mutex;
use pysoa_core::{DispatchError, Error, JsonObject};

/// What a single stubbed call resolves to.
#[derive(Debug, Clone)]
pub enum StubCallOutcome {
    /// The action succeeds with this body.
    Body(JsonObject),
    /// The action fails with these action-level errors.
    Errors(Vec<Error>),
    /// The whole job fails; no other actions in the job run.
    JobError(Vec<Error>),
    /// The call fails as if the transport itself had failed.
    Transport(DispatchError),
}

/// A callable side-effect invoked with the incoming request body.
pub type StubSideEffect = Arc<dyn Fn(&JsonObject) -> StubCallOutcome + Send + Sync>;

/// One step of a stub's script.
#[derive(Clone)]
pub enum StubStep {
    /// Always succeed with this body.
    Body(JsonObject),
    /// Always fail with these action-level errors.
    Errors(Vec<Error>),
    /// Always fail the whole job with these errors.
    JobError(Vec<Error>),
    /// Always fail as a transport error.
    Transport(DispatchError),
    /// Compute the outcome from the request body at call time.
    SideEffect(StubSideEffect),
}

impl StubStep {
    fn evaluate(&self, body: &JsonObject) -> StubCallOutcome {
        match self {
            StubStep::Body(b) => StubCallOutcome::Body(b.clone()),
            StubStep::Errors(e) => StubCallOutcome::Errors(e.clone()),
            StubStep::JobError(e) => StubCallOutcome::JobError(e.clone()),
            StubStep::Transport(err) => StubCallOutcome::Transport(err.clone()),
            StubStep::SideEffect(f) => f(body),
        }
    }
}

/// A stubbed `(service, action)` pair: a script of outcomes plus the call
/// history recorded for later assertion (spec §4.7: "records call count and
/// argument bodies for later assertion").
pub struct ActionStub {
    service: String,
    action: String,
    script: Vec<StubStep>,
    calls: Mutex<Vec<JsonObject>>,
}

impl ActionStub {
    /// Always answer `action` on `service` with a fixed successful body.
    #[must_use]
    pub fn body(service: impl Into<String>, action: impl Into<String>, body: JsonObject) -> Arc<Self> {
        Self::from_script(service, action, vec![StubStep::Body(body)])
    }

    /// Always answer `action` on `service` with a fixed error list.
    #[must_use]
    pub fn errors(service: impl Into<String>, action: impl Into<String>, errors: Vec<Error>) -> Arc<Self> {
        Self::from_script(service, action, vec![StubStep::Errors(errors)])
    }

    /// Answer `action` on `service` by invoking `side_effect` with the
    /// request body on every call.
    #[must_use]
    pub fn side_effect(
        service: impl Into<String>,
        action: impl Into<String>,
        side_effect: StubSideEffect,
    ) -> Arc<Self> {
        Self::from_script(service, action, vec![StubStep::SideEffect(side_effect)])
    }

    /// Answer a sequence of calls with one step each, repeating the last
    /// step once the sequence is exhausted.
    #[must_use]
    pub fn sequence(
        service: impl Into<String>,
        action: impl Into<String>,
        steps: Vec<StubStep>,
    ) -> Arc<Self> {
        Self::from_script(service, action, steps)
    }

    fn from_script(service: impl Into<String>, action: impl Into<String>, script: Vec<StubStep>) -> Arc<Self> {
        assert!(!script.is_empty(), "a stub's script must have at least one step");
        Arc::new(Self {
            service: service.into(),
            action: action.into(),
            script,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn key(&self) -> (&str, &str) {
        (&self.service, &self.action)
    }

    pub(crate) fn record_and_evaluate(&self, body: &JsonObject) -> StubCallOutcome {
        let mut calls = self.calls.lock();
        calls.push(body.clone());
        let index = (calls.len() - 1).min(self.script.len() - 1);
        self.script[index].evaluate(body)
    }

    /// How many times this stub has been invoked.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The request bodies this stub was invoked with, in call order.
    #[must_use]
    pub fn call_bodies(&self) -> Vec<JsonObject> {
        self.calls.lock().clone()
    }

    /// Assert this stub was invoked exactly once, panicking with the
    /// observed count otherwise.
    pub fn assert_called_once(&self) {
        let count = self.call_count();
        assert_eq!(count, 1, "expected {}.{} to be called once, was called {count} times", self.service, self.action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pysoa_core::empty_object;

    #[test]
    fn body_stub_answers_every_call_with_same_body() {
        let mut body = empty_object();
        body.insert("ok".into(), true.into());
        let stub = ActionStub::body("echo", "ping", body.clone());

        assert!(matches!(
            stub.record_and_evaluate(&empty_object()),
            StubCallOutcome::Body(b) if b == body
        ));
        assert!(matches!(
            stub.record_and_evaluate(&empty_object()),
            StubCallOutcome::Body(b) if b == body
        ));
        assert_eq!(stub.call_count(), 2);
    }

    #[test]
    fn sequence_repeats_last_step_once_exhausted() {
        let mut first = empty_object();
        first.insert("n".into(), 1.into());
        let mut second = empty_object();
        second.insert("n".into(), 2.into());

        let stub = ActionStub::sequence(
            "echo",
            "ping",
            vec![StubStep::Body(first.clone()), StubStep::Body(second.clone())],
        );

        let outcomes: Vec<_> = (0..4)
            .map(|_| stub.record_and_evaluate(&empty_object()))
            .collect();
        assert!(matches!(&outcomes[0], StubCallOutcome::Body(b) if *b == first));
        assert!(matches!(&outcomes[1], StubCallOutcome::Body(b) if *b == second));
        assert!(matches!(&outcomes[2], StubCallOutcome::Body(b) if *b == second));
        assert!(matches!(&outcomes[3], StubCallOutcome::Body(b) if *b == second));
    }

    #[test]
    fn side_effect_sees_the_call_body() {
        let stub = ActionStub::side_effect(
            "echo",
            "double",
            Arc::new(|body: &JsonObject| {
                let n = body.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
                let mut out = empty_object();
                out.insert("n".into(), (n * 2).into());
                StubCallOutcome::Body(out)
            }),
        );
        let mut body = empty_object();
        body.insert("n".into(), 21.into());
        match stub.record_and_evaluate(&body) {
            StubCallOutcome::Body(out) => assert_eq!(out["n"], 42),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    #[should_panic(expected = "called once")]
    fn assert_called_once_panics_when_never_called() {
        let stub = ActionStub::body("echo", "ping", empty_object());
        stub.assert_called_once();
    }
}
