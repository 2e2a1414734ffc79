//! A `JobDispatcher` that intercepts stubbed `(service, action)` calls and
//! passes everything else through to a real dispatcher underneath
//! (spec §4.7).
//!
//! Grounded on `stub_service.py`'s `StubTransport`/`StubServer`, which patch
//! a `Client`'s transport so only stubbed actions are answered locally.
//! Rust has no global monkeypatching equivalent, so nesting here is
//! explicit: each [`Interceptor::enter`] pushes a frame of stubs that a
//! matching [`ScopedStubs::drop`] pops, and a lookup scans frames
//! innermost-first (spec §4.7: "the innermost match wins").

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use pysoa_core::message::{ActionRequest, ActionResponse, JobRequest, JobResponse};
use pysoa_core::{DispatchError, JobDispatcher};

use crate::stub::{ActionStub, StubCallOutcome};

type StubFrame = HashMap<(String, String), Arc<ActionStub>>;

/// Always fails with `UnknownService`; the fallback for an [`Interceptor`]
/// with no real dispatcher behind it (every call is expected to be stubbed).
struct UnstubbedDispatcher;

#[async_trait]
impl JobDispatcher for UnstubbedDispatcher {
    async fn dispatch_job(&self, service: &str, _job: JobRequest) -> Result<JobResponse, DispatchError> {
        Err(DispatchError::UnknownService {
            service: service.to_string(),
        })
    }
}

/// Wraps a real [`JobDispatcher`] and answers stubbed actions locally.
///
/// Actions within the same job are handled independently: a stubbed action
/// is answered from its script, an unstubbed one is forwarded to the
/// wrapped dispatcher as a single-action job carrying the same context and
/// control, and results are stitched back together in request order.
pub struct Interceptor {
    fallback: Arc<dyn JobDispatcher>,
    frames: Mutex<Vec<StubFrame>>,
}

impl Interceptor {
    /// Wrap `fallback`, answering stubbed actions locally and forwarding
    /// everything else to it.
    #[must_use]
    pub fn new(fallback: Arc<dyn JobDispatcher>) -> Arc<Self> {
        Arc::new(Self {
            fallback,
            frames: Mutex::new(vec![StubFrame::new()]),
        })
    }

    /// An interceptor with no real dispatcher behind it; any call that
    /// isn't stubbed fails with `UnknownService`.
    #[must_use]
    pub fn standalone() -> Arc<Self> {
        Self::new(Arc::new(UnstubbedDispatcher))
    }

    /// Open a new, innermost stub scope. Stubs registered on the returned
    /// guard shadow any outer stub for the same `(service, action)` until
    /// the guard is dropped.
    #[must_use]
    pub fn enter(self: &Arc<Self>) -> ScopedStubs {
        self.frames.lock().push(StubFrame::new());
        ScopedStubs {
            interceptor: self.clone(),
        }
    }

    fn register(&self, stub: Arc<ActionStub>) {
        let mut frames = self.frames.lock();
        let top = frames.last_mut().expect("base frame is never popped");
        let (service, action) = stub.key();
        top.insert((service.to_string(), action.to_string()), stub);
    }

    fn find(&self, service: &str, action: &str) -> Option<Arc<ActionStub>> {
        let frames = self.frames.lock();
        frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(&(service.to_string(), action.to_string())))
            .cloned()
    }
}

/// An open stub scope; registering a stub here makes it active until this
/// guard is dropped, at which point the scope's stubs are discarded and any
/// shadowed outer stub becomes visible again.
pub struct ScopedStubs {
    interceptor: Arc<Interceptor>,
}

impl ScopedStubs {
    /// Register `stub` in this scope.
    pub fn stub(&self, stub: Arc<ActionStub>) -> &Self {
        self.interceptor.register(stub);
        self
    }
}

impl Drop for ScopedStubs {
    fn drop(&mut self) {
        self.interceptor.frames.lock().pop();
    }
}

#[async_trait]
impl JobDispatcher for Interceptor {
    async fn dispatch_job(&self, service: &str, job: JobRequest) -> Result<JobResponse, DispatchError> {
        let mut actions = Vec::with_capacity(job.actions.len());

        for action_request in &job.actions {
            let outcome = if let Some(stub) = self.find(service, &action_request.action) {
                stub.record_and_evaluate(&action_request.body)
            } else {
                let sub_job = JobRequest {
                    actions: vec![action_request.clone()],
                    control: job.control.clone(),
                    context: job.context.clone(),
                };
                let sub_response = self.fallback.dispatch_job(service, sub_job).await?;
                if sub_response.is_job_error() {
                    return Ok(sub_response);
                }
                actions.extend(sub_response.actions);
                if !job.control.continue_on_error && actions.last().is_some_and(ActionResponse::has_errors) {
                    break;
                }
                continue;
            };

            match outcome {
                StubCallOutcome::Body(body) => {
                    actions.push(ActionResponse::new(action_request.action.clone(), body));
                }
                StubCallOutcome::Errors(errors) => {
                    actions.push(ActionResponse::with_errors(action_request.action.clone(), errors));
                }
                StubCallOutcome::JobError(errors) => {
                    return Ok(JobResponse::job_error(errors, job.context.clone()));
                }
                StubCallOutcome::Transport(err) => return Err(err),
            }

            if !job.control.continue_on_error && actions.last().is_some_and(ActionResponse::has_errors) {
                break;
            }
        }

        Ok(JobResponse {
            actions,
            errors: Vec::new(),
            context: job.context.clone(),
        })
    }
}
