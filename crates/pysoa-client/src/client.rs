//! The `Client`: per-service handler cache plus the `call_*`/`send_request`/
//! `get_all_responses`/`*_future` surface (spec §4.4, §5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use pysoa_core::message::{ActionRequest, Context, Control, JobRequest, JobResponse};
use pysoa_core::{DispatchError, JobDispatcher};

use crate::error::ClientError;
use crate::future::ActionFuture;
use crate::handler::{ServiceHandler, ServiceHandlerConfig};

/// A client configured against a fixed set of named services.
///
/// Handlers are created lazily and cached per `(service, config fingerprint)`
/// (spec §4.4); in typical usage a service's configuration never changes
/// across the client's lifetime, so this amounts to one handler per service.
pub struct Client {
    configs: HashMap<String, ServiceHandlerConfig>,
    handlers: Mutex<HashMap<(String, u64), Arc<ServiceHandler>>>,
}

impl Client {
    /// Build a client over the given per-service configurations.
    #[must_use]
    pub fn new(configs: HashMap<String, ServiceHandlerConfig>) -> Self {
        Self {
            configs,
            handlers: Mutex::new(HashMap::new()),
        }
    }

    fn handler_for(&self, service: &str) -> Result<Arc<ServiceHandler>, ClientError> {
        let config = self
            .configs
            .get(service)
            .ok_or_else(|| ClientError::Dispatch(DispatchError::UnknownService {
                service: service.to_string(),
            }))?;
        let fingerprint = config.fingerprint();
        let key = (service.to_string(), fingerprint);

        let mut handlers = self.handlers.lock();
        if let Some(handler) = handlers.get(&key) {
            return Ok(handler.clone());
        }
        let handler = ServiceHandler::new(service, config.clone());
        handlers.insert(key, handler.clone());
        Ok(handler)
    }

    /// Call a single action on `service` and wait for its response.
    ///
    /// Raises ([`ClientError::JobError`] / [`ClientError::ActionError`]) on
    /// job- or action-level errors, matching the default `raise_*` behavior
    /// of [`Client::call_jobs_parallel`] (spec §4.4).
    pub async fn call_action(
        &self,
        service: &str,
        action: impl Into<String>,
        body: pysoa_core::JsonObject,
        context: Context,
        timeout: Option<Duration>,
    ) -> Result<JobResponse, ClientError> {
        let action = action.into();
        let job = JobRequest {
            actions: vec![ActionRequest::with_body(action.clone(), body)],
            control: Control::default(),
            context,
        };
        let response = self.dispatch_and_wait(service, job, timeout).await?;
        raise_for_errors(response, true, true)
    }

    /// Call multiple actions on `service` as a single job and wait for the response.
    pub async fn call_actions(
        &self,
        service: &str,
        actions: Vec<ActionRequest>,
        context: Context,
        continue_on_error: bool,
        timeout: Option<Duration>,
    ) -> Result<JobResponse, ClientError> {
        let job = JobRequest {
            actions,
            control: Control::new(Vec::new(), continue_on_error),
            context,
        };
        if job.control.suppress_response {
            return Err(ClientError::SuppressResponseIncompatible);
        }
        let response = self.dispatch_and_wait(service, job, timeout).await?;
        raise_for_errors(response, true, true)
    }

    /// Call the same (service, actions) shape against several services
    /// concurrently, sending all requests before waiting on any response
    /// (spec §4.4: "send all requests, then collect all responses").
    pub async fn call_actions_parallel(
        &self,
        jobs: Vec<(String, Vec<ActionRequest>, Context)>,
        timeout: Option<Duration>,
    ) -> Result<Vec<JobResponse>, ClientError> {
        let requests = jobs.into_iter().map(|(service, actions, context)| {
            let job = JobRequest {
                actions,
                control: Control::default(),
                context,
            };
            (service, job)
        });
        let settled = self
            .call_jobs_parallel(requests.collect(), true, true, false, timeout)
            .await?;
        settled.into_iter().collect()
    }

    /// Dispatch N jobs (possibly across different services) concurrently
    /// and wait for all of them to settle (spec §4.4).
    ///
    /// When `catch_transport_errors` is `true`, a transport-level failure
    /// for one job comes back as an `Err` in that job's slot rather than
    /// failing the whole batch; when `false`, the first transport-level
    /// failure observed is raised and the remaining per-job outcomes are
    /// discarded (job- and action-level errors are unaffected by this flag
    /// and always surface per-slot via `raise_job_errors`/`raise_action_errors`).
    pub async fn call_jobs_parallel(
        &self,
        jobs: Vec<(String, JobRequest)>,
        raise_job_errors: bool,
        raise_action_errors: bool,
        catch_transport_errors: bool,
        timeout: Option<Duration>,
    ) -> Result<Vec<Result<JobResponse, ClientError>>, ClientError> {
        let futures = jobs.into_iter().map(|(service, job)| async move {
            let outcome = self.dispatch_and_wait(&service, job, timeout).await;
            match outcome {
                Ok(response) => raise_for_errors(response, raise_job_errors, raise_action_errors),
                Err(err) => Err(err),
            }
        });
        let settled = futures::future::join_all(futures).await;

        if catch_transport_errors {
            return Ok(settled);
        }

        if let Some(transport_err) = settled.iter().find_map(|r| match r {
            Err(err @ ClientError::Dispatch(_)) | Err(err @ ClientError::Timeout { .. }) => {
                Some(err.clone())
            }
            _ => None,
        }) {
            return Err(transport_err);
        }

        Ok(settled)
    }

    /// Submit `job` to `service` without waiting for a response.
    pub async fn send_request(
        &self,
        service: &str,
        job: JobRequest,
    ) -> Result<i64, ClientError> {
        let handler = self.handler_for(service)?;
        handler.send_request(job).await
    }

    /// Drain every pending response on `service`'s handler.
    pub async fn get_all_responses(
        &self,
        service: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<(i64, Result<JobResponse, ClientError>)>, ClientError> {
        let handler = self.handler_for(service)?;
        Ok(handler.get_all_responses(timeout).await)
    }

    /// Send a job and return a future handle instead of waiting inline
    /// (spec §4.4 `*_future` variants).
    pub async fn call_action_future(
        &self,
        service: &str,
        action: impl Into<String>,
        body: pysoa_core::JsonObject,
        context: Context,
    ) -> Result<ActionFuture, ClientError> {
        let handler = self.handler_for(service)?;
        let job = JobRequest {
            actions: vec![ActionRequest::with_body(action.into(), body)],
            control: Control::default(),
            context,
        };
        let request_id = handler.send_request(job).await?;
        Ok(ActionFuture::new(handler, request_id))
    }

    async fn dispatch_and_wait(
        &self,
        service: &str,
        job: JobRequest,
        timeout: Option<Duration>,
    ) -> Result<JobResponse, ClientError> {
        if job.control.suppress_response {
            let handler = self.handler_for(service)?;
            handler.send_request(job).await?;
            return Ok(JobResponse::default());
        }
        let handler = self.handler_for(service)?;
        handler.call(job, timeout).await
    }
}

fn raise_for_errors(
    response: JobResponse,
    raise_job_errors: bool,
    raise_action_errors: bool,
) -> Result<JobResponse, ClientError> {
    if raise_job_errors && response.is_job_error() {
        return Err(ClientError::JobError(response.errors));
    }
    if raise_action_errors {
        if let Some(failed) = response.actions.iter().find(|a| a.has_errors()) {
            return Err(ClientError::ActionError {
                action: failed.action.clone(),
                errors: failed.errors.clone(),
            });
        }
    }
    Ok(response)
}

/// Adapts [`Client`] to the [`JobDispatcher`] seam `pysoa-expansion` uses,
/// so expansion calls reuse the same handler cache (and therefore the same
/// connections and middleware) as top-level calls (spec §4.6).
#[async_trait]
impl JobDispatcher for Client {
    async fn dispatch_job(
        &self,
        service: &str,
        job: JobRequest,
    ) -> Result<JobResponse, DispatchError> {
        self.dispatch_and_wait(service, job, None)
            .await
            .map_err(|err| match err {
                ClientError::Dispatch(dispatch_err) => dispatch_err,
                ClientError::Timeout { service } => DispatchError::Timeout { service },
                other => DispatchError::Transport {
                    service: service.to_string(),
                    message: other.to_string(),
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pysoa_transport::{JsonSerializer, MessageMeta, Transport, TransportError};
    use std::collections::VecDeque;
    use std::time::Duration as StdDuration;

    /// A loopback transport that echoes every sent request blob straight
    /// back as the next "response", so a `Client` round trip can be tested
    /// without standing up a real service. The echoed blob happens to
    /// deserialize as a trivial `JobResponse` because `ActionRequest` and
    /// `ActionResponse` share enough shape for the default-valued fields to
    /// fill in (no `errors` key, no `control` is read on the response side).
    struct LoopbackTransport {
        inbox: Mutex<VecDeque<(i64, MessageMeta, Vec<u8>)>>,
    }

    #[async_trait]
    impl Transport for LoopbackTransport {
        async fn send_request_message(
            &self,
            request_id: i64,
            meta: MessageMeta,
            body: Vec<u8>,
            _expiry: Option<StdDuration>,
        ) -> Result<(), TransportError> {
            self.inbox.lock().push_back((request_id, meta, body));
            Ok(())
        }

        async fn receive_response_message(
            &self,
            timeout: Option<StdDuration>,
        ) -> Result<Option<(i64, MessageMeta, Vec<u8>)>, TransportError> {
            if let Some(item) = self.inbox.lock().pop_front() {
                return Ok(Some(item));
            }
            if let Some(wait) = timeout {
                tokio::time::sleep(wait).await;
            }
            Ok(self.inbox.lock().pop_front())
        }
    }

    fn loopback_client(service: &str) -> Client {
        let transport = Arc::new(LoopbackTransport {
            inbox: Mutex::new(VecDeque::new()),
        });
        let config = ServiceHandlerConfig {
            transport,
            serializer: Arc::new(JsonSerializer::new()),
            request_middleware: Vec::new(),
            response_middleware: Vec::new(),
            default_timeout: Some(StdDuration::from_secs(1)),
            message_expiry: None,
        };
        let mut configs = HashMap::new();
        configs.insert(service.to_string(), config);
        Client::new(configs)
    }

    #[tokio::test]
    async fn call_action_round_trips_through_loopback_transport() {
        let client = loopback_client("echo");
        let response = client
            .call_action(
                "echo",
                "ping",
                pysoa_core::empty_object(),
                pysoa_core::empty_object(),
                Some(StdDuration::from_secs(1)),
            )
            .await
            .unwrap();
        assert_eq!(response.actions.len(), 1);
        assert_eq!(response.actions[0].action, "ping");
    }

    #[tokio::test]
    async fn unknown_service_is_a_dispatch_error() {
        let client = loopback_client("echo");
        let err = client
            .call_action(
                "ghost",
                "ping",
                pysoa_core::empty_object(),
                pysoa_core::empty_object(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Dispatch(DispatchError::UnknownService { .. })
        ));
    }

    #[tokio::test]
    async fn handler_is_cached_per_service() {
        let client = loopback_client("echo");
        let first = client.handler_for("echo").unwrap();
        let second = client.handler_for("echo").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
