//! `Server::process_job`: envelope validation, the job/action middleware
//! onion, and per-action dispatch (spec §4.5).

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;

use pysoa_core::message::{
    ActionRequest, ActionResponse, Context, Control, EnrichedActionRequest, JobRequest,
    JobResponse, JsonObject, LocalActionDispatcher,
};
use pysoa_core::{Error, NextFn, SwitchSet};

use crate::action::Action;
use crate::error::ServerError;
use crate::middleware::{ActionChain, JobChain, compose_action, compose_job};
use crate::settings::ServerSettings;

struct ServerInner {
    actions: HashMap<String, Arc<dyn Action>>,
    job_middleware: JobChain,
    action_middleware: ActionChain,
    settings: ServerSettings,
    self_ref: Weak<ServerInner>,
}

/// A running server: a fixed action registry plus the job/action middleware
/// chains wrapped around every call to [`Server::process_job`].
#[derive(Clone)]
pub struct Server(Arc<ServerInner>);

impl Server {
    /// Build a server over `actions`, with the given job- and
    /// action-level middleware chains (outermost first).
    ///
    /// The action-class map is fixed at construction and read-only
    /// thereafter (spec §5: "read-only after startup").
    #[must_use]
    pub fn new(
        actions: HashMap<String, Arc<dyn Action>>,
        job_middleware: JobChain,
        action_middleware: ActionChain,
    ) -> Self {
        Self::with_settings(
            actions,
            job_middleware,
            action_middleware,
            ServerSettings::default(),
        )
    }

    /// Build a server with explicit [`ServerSettings`] (job limits, handler
    /// TTL, documented middleware order) instead of the defaults.
    #[must_use]
    pub fn with_settings(
        actions: HashMap<String, Arc<dyn Action>>,
        job_middleware: JobChain,
        action_middleware: ActionChain,
        settings: ServerSettings,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak| ServerInner {
            actions,
            job_middleware,
            action_middleware,
            settings,
            self_ref: weak.clone(),
        });
        Self(inner)
    }

    /// Process one job end to end, producing its `JobResponse` (spec §4.5).
    pub async fn process_job(&self, job: JobRequest) -> JobResponse {
        let max_actions = self.0.settings.job_limits.max_actions_per_job;
        if let Err(errors) = validate_envelope(&job, max_actions) {
            let context = with_correlation_id(job.context, &job.control);
            return JobResponse::job_error(errors, context);
        }

        let inner = self.0.clone();
        let base: NextFn<JobRequest, JobResponse> = Arc::new(move |job| {
            let inner = inner.clone();
            Box::pin(async move { run_actions(&inner, job).await })
        });
        let wrapped = compose_job(&self.0.job_middleware, base);
        wrapped(job).await
    }
}

fn validate_envelope(job: &JobRequest, max_actions_per_job: usize) -> Result<(), Vec<Error>> {
    if job.actions.is_empty() {
        return Err(vec![Error::missing_field("actions")]);
    }
    if job.actions.len() > max_actions_per_job {
        return Err(vec![Error::server_error(
            format!(
                "job carries {} actions, exceeding the limit of {max_actions_per_job}",
                job.actions.len()
            ),
            None,
        )]);
    }
    Ok(())
}

/// Echo `control.correlation_id` into the response context if present and
/// not already set there (spec §4.5: "context carrying at least the
/// original correlation_id").
fn with_correlation_id(mut context: Context, control: &Control) -> Context {
    if let Some(correlation_id) = &control.correlation_id {
        context
            .entry("correlation_id")
            .or_insert_with(|| correlation_id.clone().into());
    }
    context
}

async fn run_actions(inner: &Arc<ServerInner>, job: JobRequest) -> JobResponse {
    let switches = job.control.switch_set();
    let continue_on_error = job.control.continue_on_error;
    let context = Arc::new(with_correlation_id(job.context.clone(), &job.control));
    let control = Arc::new(job.control);

    let mut responses = Vec::with_capacity(job.actions.len());
    for action_request in job.actions {
        match run_one_action(
            inner,
            action_request,
            &switches,
            context.clone(),
            control.clone(),
        )
        .await
        {
            Ok(response) => {
                let failed = response.has_errors();
                responses.push(response);
                if failed && !continue_on_error {
                    break;
                }
            }
            Err(ServerError::ResponseValidation { action, errors }) => {
                tracing::error!(action = %action, ?errors, "action response failed validation");
                return JobResponse::job_error(
                    vec![Error::server_error(
                        format!("response validation failed for action {action}"),
                        None,
                    )],
                    (*context).clone(),
                );
            }
        }
    }

    JobResponse {
        actions: responses,
        errors: Vec::new(),
        context: (*context).clone(),
    }
}

async fn run_one_action(
    inner: &Arc<ServerInner>,
    request: ActionRequest,
    switches: &SwitchSet,
    context: Arc<Context>,
    control: Arc<Control>,
) -> Result<ActionResponse, ServerError> {
    let name = request.action.clone();
    let Some(action) = inner.actions.get(&name).cloned() else {
        return Ok(ActionResponse::with_errors(
            name.clone(),
            vec![Error::unknown_action(&name)],
        ));
    };

    let enriched = EnrichedActionRequest {
        request,
        switches: switches.clone(),
        context,
        control,
        local_dispatcher: inner.clone() as Arc<dyn LocalActionDispatcher>,
    };

    let defect: Arc<parking_lot::Mutex<Option<ServerError>>> =
        Arc::new(parking_lot::Mutex::new(None));
    let base: NextFn<EnrichedActionRequest, ActionResponse> = {
        let action = action.clone();
        let defect = defect.clone();
        Arc::new(move |req| {
            let action = action.clone();
            let defect = defect.clone();
            Box::pin(async move { execute_action(action.as_ref(), req, &defect).await })
        })
    };
    let wrapped = compose_action(&inner.action_middleware, base);
    let response = wrapped(enriched).await;

    if let Some(defect) = defect.lock().take() {
        return Err(defect);
    }
    Ok(response)
}

async fn execute_action(
    action: &dyn Action,
    request: EnrichedActionRequest,
    defect: &parking_lot::Mutex<Option<ServerError>>,
) -> ActionResponse {
    let name = request.action().to_string();

    if let Err(errors) = action.validate_request(&request) {
        return ActionResponse::with_errors(name, errors);
    }

    match action.run(request).await {
        Ok(body) => {
            if let Err(errors) = action.validate_response(&body) {
                *defect.lock() = Some(ServerError::ResponseValidation {
                    action: name.clone(),
                    errors,
                });
                return ActionResponse::with_errors(
                    name.clone(),
                    vec![Error::server_error(
                        format!("response validation failed for action {name}"),
                        None,
                    )],
                );
            }
            ActionResponse::new(name, body)
        }
        Err(errors) => ActionResponse::with_errors(name, errors),
    }
}

#[async_trait]
impl LocalActionDispatcher for ServerInner {
    async fn call_local_action(
        &self,
        action: &str,
        body: JsonObject,
        context: Arc<Context>,
        control: Arc<Control>,
    ) -> ActionResponse {
        let inner = self
            .self_ref
            .upgrade()
            .expect("server outlives any in-process call it issued");
        let switches = control.switch_set();
        let request = ActionRequest::with_body(action, body);
        match run_one_action(&inner, request, &switches, context, control).await {
            Ok(response) => response,
            Err(ServerError::ResponseValidation { action, errors }) => {
                ActionResponse::with_errors(action, errors)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pysoa_core::{Error as CoreError, empty_object};

    struct Echo;

    #[async_trait]
    impl Action for Echo {
        async fn run(&self, request: EnrichedActionRequest) -> Result<JsonObject, Vec<CoreError>> {
            Ok(request.body().clone())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Action for AlwaysFails {
        async fn run(&self, _request: EnrichedActionRequest) -> Result<JsonObject, Vec<CoreError>> {
            Err(vec![CoreError::caller(
                pysoa_core::ErrorCode::invalid(),
                "nope",
            )])
        }
    }

    struct BadResponse;

    #[async_trait]
    impl Action for BadResponse {
        async fn run(&self, _request: EnrichedActionRequest) -> Result<JsonObject, Vec<CoreError>> {
            Ok(empty_object())
        }

        fn validate_response(&self, _body: &JsonObject) -> Result<(), Vec<CoreError>> {
            Err(vec![CoreError::server_error("missing required field", None)])
        }
    }

    struct CallsSibling;

    #[async_trait]
    impl Action for CallsSibling {
        async fn run(&self, request: EnrichedActionRequest) -> Result<JsonObject, Vec<CoreError>> {
            let response = request.call_local_action("echo", request.body().clone()).await;
            Ok(response.body)
        }
    }

    fn server_with(actions: Vec<(&str, Arc<dyn Action>)>) -> Server {
        let map = actions
            .into_iter()
            .map(|(name, action)| (name.to_string(), action))
            .collect();
        Server::new(map, Vec::new(), Vec::new())
    }

    fn job_for(action: &str, body: JsonObject) -> JobRequest {
        JobRequest::single(ActionRequest::with_body(action, body))
    }

    #[tokio::test]
    async fn unknown_action_is_a_caller_error_on_that_slot() {
        let server = server_with(vec![("echo", Arc::new(Echo))]);
        let response = server.process_job(job_for("ghost", empty_object())).await;
        assert_eq!(response.actions.len(), 1);
        assert!(response.actions[0].has_errors());
        assert_eq!(response.actions[0].errors[0].code.as_str(), "UNKNOWN");
    }

    #[tokio::test]
    async fn empty_actions_is_a_job_level_error() {
        let server = server_with(vec![("echo", Arc::new(Echo))]);
        let job = JobRequest {
            actions: Vec::new(),
            control: Control::default(),
            context: empty_object(),
        };
        let response = server.process_job(job).await;
        assert!(response.is_job_error());
        assert!(response.actions.is_empty());
    }

    #[tokio::test]
    async fn continue_on_error_false_stops_after_first_failure() {
        let server = server_with(vec![
            ("fails", Arc::new(AlwaysFails)),
            ("echo", Arc::new(Echo)),
        ]);
        let job = JobRequest {
            actions: vec![
                ActionRequest::new("fails"),
                ActionRequest::new("echo"),
            ],
            control: Control::new(Vec::new(), false),
            context: empty_object(),
        };
        let response = server.process_job(job).await;
        assert_eq!(response.actions.len(), 1);
        assert!(response.actions[0].has_errors());
    }

    #[tokio::test]
    async fn continue_on_error_true_runs_every_action() {
        let server = server_with(vec![
            ("fails", Arc::new(AlwaysFails)),
            ("echo", Arc::new(Echo)),
        ]);
        let job = JobRequest {
            actions: vec![
                ActionRequest::new("fails"),
                ActionRequest::new("echo"),
            ],
            control: Control::new(Vec::new(), true),
            context: empty_object(),
        };
        let response = server.process_job(job).await;
        assert_eq!(response.actions.len(), 2);
        assert!(response.actions[0].has_errors());
        assert!(!response.actions[1].has_errors());
    }

    #[tokio::test]
    async fn response_validation_failure_escalates_to_job_level_server_error() {
        let server = server_with(vec![("bad", Arc::new(BadResponse))]);
        let response = server.process_job(job_for("bad", empty_object())).await;
        assert!(response.is_job_error());
        assert!(response.actions.is_empty());
        assert_eq!(response.errors[0].code.as_str(), "SERVER_ERROR");
    }

    #[tokio::test]
    async fn in_process_action_call_reuses_context_and_control() {
        let server = server_with(vec![
            ("echo", Arc::new(Echo)),
            ("caller", Arc::new(CallsSibling)),
        ]);
        let mut body = empty_object();
        body.insert("x".to_string(), 1.into());
        let response = server.process_job(job_for("caller", body.clone())).await;
        assert_eq!(response.actions[0].body, body);
    }

    #[tokio::test]
    async fn job_response_actions_never_exceed_request_actions_count() {
        let server = server_with(vec![("echo", Arc::new(Echo))]);
        let job = JobRequest {
            actions: vec![ActionRequest::new("echo"), ActionRequest::new("echo")],
            control: Control::default(),
            context: empty_object(),
        };
        let response = server.process_job(job.clone()).await;
        assert!(response.actions.len() <= job.actions.len());
    }

    #[tokio::test]
    async fn job_exceeding_max_actions_per_job_is_a_job_level_error() {
        let actions = vec![("echo".to_string(), Arc::new(Echo) as Arc<dyn Action>)]
            .into_iter()
            .collect();
        let settings = crate::settings::ServerSettings::builder()
            .max_actions_per_job(1)
            .build();
        let server = Server::with_settings(actions, Vec::new(), Vec::new(), settings);
        let job = JobRequest {
            actions: vec![ActionRequest::new("echo"), ActionRequest::new("echo")],
            control: Control::default(),
            context: empty_object(),
        };
        let response = server.process_job(job).await;
        assert!(response.is_job_error());
        assert_eq!(response.errors[0].code.as_str(), "SERVER_ERROR");
    }

    #[tokio::test]
    async fn response_context_echoes_the_request_correlation_id() {
        let server = server_with(vec![("echo", Arc::new(Echo))]);
        let mut control = Control::default();
        control.correlation_id = Some("corr-123".to_string());
        let job = JobRequest {
            actions: vec![ActionRequest::new("echo")],
            control,
            context: empty_object(),
        };
        let response = server.process_job(job).await;
        assert_eq!(response.context["correlation_id"], "corr-123");
    }
}
