//! Server-side middleware hook shapes (spec §4.3).
//!
//! Two onions run on the server: one around the whole job, one around each
//! individual action. Both reuse the generic engine in `pysoa-core`; this
//! module only supplies the two concrete shapes.

use std::sync::Arc;

use pysoa_core::message::{ActionResponse, EnrichedActionRequest, JobRequest, JobResponse};
use pysoa_core::{Middleware, NextFn};

/// A layer wrapping the server's whole-job handling (spec §4.3: "wraps
/// job processing... on the server side").
pub trait ServerJobMiddleware: Middleware<JobRequest, JobResponse> {}
impl<T> ServerJobMiddleware for T where T: Middleware<JobRequest, JobResponse> {}

/// A layer wrapping a single action's execution (spec §4.3: "...and action
/// execution on the server side").
pub trait ServerActionMiddleware: Middleware<EnrichedActionRequest, ActionResponse> {}
impl<T> ServerActionMiddleware for T where T: Middleware<EnrichedActionRequest, ActionResponse> {}

pub(crate) type JobChain = Vec<Arc<dyn Middleware<JobRequest, JobResponse>>>;
pub(crate) type ActionChain = Vec<Arc<dyn Middleware<EnrichedActionRequest, ActionResponse>>>;

/// Compose a job middleware chain around `base`.
pub fn compose_job(chain: &JobChain, base: NextFn<JobRequest, JobResponse>) -> NextFn<JobRequest, JobResponse> {
    pysoa_core::compose(chain, base)
}

/// Compose an action middleware chain around `base`.
pub fn compose_action(
    chain: &ActionChain,
    base: NextFn<EnrichedActionRequest, ActionResponse>,
) -> NextFn<EnrichedActionRequest, ActionResponse> {
    pysoa_core::compose(chain, base)
}
