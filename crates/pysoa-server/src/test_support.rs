//! Shared test fixtures for `pysoa-server`'s unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use pysoa_core::message::{
    ActionRequest, ActionResponse, Context, Control, EnrichedActionRequest, JsonObject,
    LocalActionDispatcher,
};
use pysoa_core::SwitchSet;

struct NoopLocalDispatcher;

#[async_trait]
impl LocalActionDispatcher for NoopLocalDispatcher {
    async fn call_local_action(
        &self,
        action: &str,
        body: JsonObject,
        _context: Arc<Context>,
        _control: Arc<Control>,
    ) -> ActionResponse {
        ActionResponse::new(action, body)
    }
}

/// Build an `EnrichedActionRequest` for `action`/`body` with the given
/// active switches, backed by a local dispatcher that just echoes.
pub(crate) fn enriched_request(
    action: &str,
    body: JsonObject,
    switches: &[i64],
) -> EnrichedActionRequest {
    EnrichedActionRequest {
        request: ActionRequest::with_body(action, body),
        switches: SwitchSet::from_iter(switches.iter().copied()),
        context: Arc::new(Context::new()),
        control: Arc::new(Control::default()),
        local_dispatcher: Arc::new(NoopLocalDispatcher),
    }
}
