//! `ServiceHandler`: one per (service, config) pair, owning the transport,
//! serializer, middleware chain, request-ID counter, and outstanding/
//! buffered response bookkeeping for a single service (spec §4.4).
//!
//! The background routing task is grounded on the teacher's
//! `turbomcp-client::client::dispatcher::MessageDispatcher`: a single task
//! is the sole consumer of `transport.receive_response_message`, and routes
//! each arrival either to a waiting caller (via a oneshot channel) or, if
//! nobody is waiting for that particular ID yet, onto a buffer that
//! `get_all_responses` later drains — this is how out-of-order responses
//! (spec §4.4, §5) are handled without every caller polling the transport
//! directly.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};

use pysoa_core::Context;
use pysoa_core::DispatchError;
use pysoa_core::message::JobRequest;
use pysoa_transport::{MessageMeta, Serializer, Transport, TransportError};

use crate::error::ClientError;
use crate::middleware::{
    JobRequestResponse, OutboundRequest, RawReceived, RequestChain, ResponseChain, compose_request,
    compose_response,
};

/// Configuration a [`ServiceHandler`] is built from.
///
/// Two handlers are considered equivalent (and so share a cache slot in
/// `Client`) only when they were built from configs whose transport and
/// serializer are the same injected instance — see
/// [`ServiceHandlerConfig::fingerprint`].
pub struct ServiceHandlerConfig {
    /// The transport this handler sends requests on and polls for responses.
    pub transport: Arc<dyn Transport>,
    /// The serializer used to encode requests and decode responses.
    pub serializer: Arc<dyn Serializer>,
    /// Request middleware chain, outermost first.
    pub request_middleware: RequestChain,
    /// Response middleware chain, outermost first.
    pub response_middleware: ResponseChain,
    /// Default timeout applied to a receive poll when a call doesn't
    /// specify its own.
    pub default_timeout: Option<Duration>,
    /// TTL passed to the transport for outgoing messages, if it supports one.
    pub message_expiry: Option<Duration>,
}

impl Clone for ServiceHandlerConfig {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            serializer: self.serializer.clone(),
            request_middleware: self.request_middleware.clone(),
            response_middleware: self.response_middleware.clone(),
            default_timeout: self.default_timeout,
            message_expiry: self.message_expiry,
        }
    }
}

impl ServiceHandlerConfig {
    /// A fingerprint identifying this configuration for cache-key purposes.
    ///
    /// Configuration here is trait objects rather than plain data (the spec's
    /// dicts), so there's no structural value to hash; identity of the
    /// injected transport/serializer instances is what actually distinguishes
    /// one configuration from another in practice, so the fingerprint is
    /// built from their `Arc` pointer identity plus middleware chain length.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        (Arc::as_ptr(&self.transport).cast::<()>() as usize).hash(&mut hasher);
        (Arc::as_ptr(&self.serializer).cast::<()>() as usize).hash(&mut hasher);
        self.request_middleware.len().hash(&mut hasher);
        self.response_middleware.len().hash(&mut hasher);
        hasher.finish()
    }
}

type PendingResult = Result<JobRequestResponse, ClientError>;

/// Owns one service's transport/serializer/middleware and tracks in-flight
/// and buffered responses for it.
pub struct ServiceHandler {
    service: String,
    transport: Arc<dyn Transport>,
    serializer: Arc<dyn Serializer>,
    request_middleware: RequestChain,
    default_timeout: Option<Duration>,
    message_expiry: Option<Duration>,
    next_request_id: AtomicI64,
    outstanding: Mutex<HashSet<i64>>,
    waiters: Mutex<HashMap<i64, oneshot::Sender<PendingResult>>>,
    buffered: Mutex<VecDeque<(i64, PendingResult)>>,
    arrived: Notify,
    shutdown: Notify,
}

impl ServiceHandler {
    /// Build a new handler for `service` and spawn its background routing task.
    pub fn new(service: impl Into<String>, config: ServiceHandlerConfig) -> Arc<Self> {
        let handler = Arc::new(Self {
            service: service.into(),
            transport: config.transport,
            serializer: config.serializer,
            request_middleware: config.request_middleware,
            default_timeout: config.default_timeout,
            message_expiry: config.message_expiry,
            next_request_id: AtomicI64::new(1),
            outstanding: Mutex::new(HashSet::new()),
            waiters: Mutex::new(HashMap::new()),
            buffered: Mutex::new(VecDeque::new()),
            arrived: Notify::new(),
            shutdown: Notify::new(),
        });

        Self::spawn_routing_task(handler.clone(), config.response_middleware);
        handler
    }

    /// The service name this handler is scoped to.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Whether this handler has any requests it hasn't yet received a
    /// response for.
    #[must_use]
    pub fn has_outstanding(&self) -> bool {
        !self.outstanding.lock().is_empty()
    }

    /// Encode and send `job`, registering the allocated request ID as
    /// outstanding. Returns the ID so the caller can correlate a later
    /// response (spec §4.4: "submits without waiting").
    ///
    /// If the caller didn't set `job.control.correlation_id`, one is
    /// generated here so every dispatched job carries one end to end.
    pub async fn send_request(&self, mut job: JobRequest) -> Result<i64, ClientError> {
        if job.control.correlation_id.is_none() {
            job.control.correlation_id = Some(uuid::Uuid::new_v4().to_string());
        }

        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let outbound = OutboundRequest {
            service: self.service.clone(),
            request_id,
            job,
        };

        let transport = self.transport.clone();
        let serializer = self.serializer.clone();
        let expiry = self.message_expiry;
        let base: pysoa_core::NextFn<OutboundRequest, Result<i64, ClientError>> =
            Arc::new(move |req| {
                let transport = transport.clone();
                let serializer = serializer.clone();
                Box::pin(async move {
                    let bytes = serializer
                        .encode(&encode_job(&req.job))
                        .map_err(ClientError::from)?;
                    let meta = MessageMeta::new(serializer.mime_type());
                    transport
                        .send_request_message(req.request_id, meta, bytes, expiry)
                        .await
                        .map_err(|err| client_error_from_transport(&req.service, err))?;
                    Ok(req.request_id)
                })
            });

        let chain = compose_request(&self.request_middleware, base);
        let request_id = chain(outbound).await?;
        self.outstanding.lock().insert(request_id);
        Ok(request_id)
    }

    /// Register interest in a specific request ID's response, checking the
    /// buffer first in case it already arrived out of order.
    fn wait_for(&self, request_id: i64) -> oneshot::Receiver<PendingResult> {
        let (tx, rx) = oneshot::channel();
        let mut buffered = self.buffered.lock();
        if let Some(pos) = buffered.iter().position(|(id, _)| *id == request_id) {
            let (_, result) = buffered.remove(pos).expect("position just found");
            let _ = tx.send(result);
            return rx;
        }
        drop(buffered);
        self.waiters.lock().insert(request_id, tx);
        rx
    }

    /// Send `job` and block (up to `timeout`, falling back to the handler's
    /// default) for its matching response. Other responses received while
    /// waiting are buffered for [`ServiceHandler::get_all_responses`]
    /// (spec §4.4).
    pub async fn call(
        &self,
        job: JobRequest,
        timeout: Option<Duration>,
    ) -> Result<JobRequestResponse, ClientError> {
        let request_id = self.send_request(job).await?;
        self.result(request_id, timeout).await
    }

    /// Block for the response to an already-sent `request_id`.
    pub async fn result(
        &self,
        request_id: i64,
        timeout: Option<Duration>,
    ) -> Result<JobRequestResponse, ClientError> {
        let rx = self.wait_for(request_id);
        let wait = timeout.or(self.default_timeout);

        let received = match wait {
            Some(duration) => match tokio::time::timeout(duration, rx).await {
                Ok(inner) => inner,
                Err(_) => {
                    self.waiters.lock().remove(&request_id);
                    return Err(ClientError::Timeout {
                        service: self.service.clone(),
                    });
                }
            },
            None => rx.await,
        };

        received.unwrap_or(Err(ClientError::Timeout {
            service: self.service.clone(),
        }))
    }

    /// Drain every buffered or newly-arriving response on this handler,
    /// stopping once there's nothing outstanding and nothing buffered
    /// (spec §4.4: "terminates when the handler has no outstanding
    /// requests and the transport reports empty").
    pub async fn get_all_responses(
        &self,
        timeout: Option<Duration>,
    ) -> Vec<(i64, Result<JobRequestResponse, ClientError>)> {
        let mut drained = Vec::new();
        let deadline_wait = timeout.or(self.default_timeout);

        loop {
            {
                let mut buffered = self.buffered.lock();
                if !buffered.is_empty() {
                    drained.extend(buffered.drain(..));
                    continue;
                }
            }

            if !self.has_outstanding() {
                break;
            }

            let notified = self.arrived.notified();
            match deadline_wait {
                Some(duration) => {
                    if tokio::time::timeout(duration, notified).await.is_err() {
                        break;
                    }
                }
                None => notified.await,
            }
        }

        drained
    }

    /// Spawn the background routing task, grounded on the teacher's
    /// `MessageDispatcher` in not pinning its own owner alive: the task
    /// holds only a [`Weak`], re-upgrading it each iteration, so the last
    /// external `Arc<ServiceHandler>` being dropped lets the handler (and,
    /// within one poll interval, this task) actually go away instead of
    /// polling the transport forever.
    fn spawn_routing_task(handler: Arc<Self>, response_middleware: ResponseChain) {
        let weak = Arc::downgrade(&handler);
        let service = handler.service.clone();
        drop(handler);

        tokio::spawn(async move {
            tracing::debug!(service = %service, "service handler routing task started");
            loop {
                let Some(handler) = weak.upgrade() else {
                    tracing::debug!(service = %service, "service handler dropped, routing task exiting");
                    break;
                };

                tokio::select! {
                    _ = handler.shutdown.notified() => {
                        tracing::debug!(service = %service, "service handler routing task shutting down");
                        break;
                    }
                    received = handler.transport.receive_response_message(Some(Duration::from_millis(200))) => {
                        match received {
                            Ok(Some((request_id, meta, bytes))) => {
                                handler.route_one(request_id, meta, bytes, &response_middleware).await;
                            }
                            Ok(None) => {}
                            Err(err) => {
                                tracing::warn!(service = %service, error = %err, "transport receive error");
                            }
                        }
                    }
                }
            }
        });
    }

    async fn route_one(
        &self,
        request_id: i64,
        meta: MessageMeta,
        bytes: Vec<u8>,
        response_middleware: &ResponseChain,
    ) {
        if !self.outstanding.lock().remove(&request_id) {
            tracing::warn!(
                service = %self.service,
                request_id,
                "received response for unknown or already-completed request"
            );
            return;
        }

        let serializer = self.serializer.clone();
        let base: pysoa_core::NextFn<RawReceived, PendingResult> = Arc::new(move |raw| {
            let serializer = serializer.clone();
            Box::pin(async move {
                let decoded = serializer.decode(&raw.bytes).map_err(ClientError::from)?;
                decode_job_response(decoded)
            })
        });

        let chain = compose_response(response_middleware, base);
        let result = chain(RawReceived {
            service: self.service.clone(),
            request_id,
            meta,
            bytes,
        })
        .await;

        if let Some(tx) = self.waiters.lock().remove(&request_id) {
            let _ = tx.send(result);
        } else {
            self.buffered.lock().push_back((request_id, result));
        }
        self.arrived.notify_waiters();
    }
}

impl Drop for ServiceHandler {
    fn drop(&mut self) {
        self.shutdown.notify_one();
    }
}

/// Map a transport-level failure into the client-facing error type.
///
/// A receive timeout becomes [`ClientError::Timeout`] (the same variant a
/// caller-side wait timeout produces); every other transport failure mode
/// (send failure, receive failure, oversized message, transient broker
/// error) becomes [`DispatchError::Transport`] via [`ClientError::Dispatch`].
fn client_error_from_transport(service: &str, err: TransportError) -> ClientError {
    match err {
        TransportError::MessageReceiveTimeout { .. } => ClientError::Timeout {
            service: service.to_string(),
        },
        other => ClientError::Dispatch(DispatchError::Transport {
            service: service.to_string(),
            message: other.to_string(),
        }),
    }
}

fn encode_job(job: &JobRequest) -> pysoa_core::JsonObject {
    serde_json::to_value(job)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default()
}

fn decode_job_response(value: pysoa_core::JsonObject) -> Result<JobRequestResponse, ClientError> {
    serde_json::from_value(serde_json::Value::Object(value)).map_err(|e| {
        ClientError::Serializer(pysoa_transport::SerializerError::Decode {
            reason: e.to_string(),
        })
    })
}

/// A minimal context builder matching [`Context`]'s shape, re-exported here
/// for callers that don't want to depend on `serde_json` directly.
#[must_use]
pub fn empty_context() -> Context {
    pysoa_core::empty_object()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pysoa_core::message::{ActionRequest, Control};
    use pysoa_transport::JsonSerializer;

    struct SpyTransport {
        sent: Mutex<Vec<(i64, MessageMeta, Vec<u8>)>>,
    }

    #[async_trait]
    impl Transport for SpyTransport {
        async fn send_request_message(
            &self,
            request_id: i64,
            meta: MessageMeta,
            body: Vec<u8>,
            _expiry: Option<Duration>,
        ) -> Result<(), TransportError> {
            self.sent.lock().push((request_id, meta, body));
            Ok(())
        }

        async fn receive_response_message(
            &self,
            _timeout: Option<Duration>,
        ) -> Result<Option<(i64, MessageMeta, Vec<u8>)>, TransportError> {
            Ok(None)
        }
    }

    fn handler_with_spy() -> (Arc<ServiceHandler>, Arc<SpyTransport>) {
        let transport = Arc::new(SpyTransport {
            sent: Mutex::new(Vec::new()),
        });
        let config = ServiceHandlerConfig {
            transport: transport.clone(),
            serializer: Arc::new(JsonSerializer::new()),
            request_middleware: Vec::new(),
            response_middleware: Vec::new(),
            default_timeout: None,
            message_expiry: None,
        };
        (ServiceHandler::new("echo", config), transport)
    }

    #[tokio::test]
    async fn send_request_stamps_a_correlation_id_when_absent() {
        let (handler, transport) = handler_with_spy();
        let job = JobRequest::single(ActionRequest::new("ping"));
        handler.send_request(job).await.unwrap();

        let sent = transport.sent.lock();
        let (_, _, bytes) = &sent[0];
        let decoded: JobRequest = serde_json::from_slice(bytes).unwrap();
        assert!(decoded.control.correlation_id.is_some());
    }

    #[tokio::test]
    async fn dropping_the_handler_lets_the_routing_task_release_it() {
        let (handler, _transport) = handler_with_spy();
        let weak = Arc::downgrade(&handler);
        drop(handler);

        for _ in 0..100 {
            if weak.upgrade().is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("routing task still holds a strong reference after the handler was dropped");
    }

    #[tokio::test]
    async fn send_request_preserves_a_caller_supplied_correlation_id() {
        let (handler, transport) = handler_with_spy();
        let mut job = JobRequest::single(ActionRequest::new("ping"));
        job.control = Control {
            correlation_id: Some("caller-set".to_string()),
            ..Control::default()
        };
        handler.send_request(job).await.unwrap();

        let sent = transport.sent.lock();
        let (_, _, bytes) = &sent[0];
        let decoded: JobRequest = serde_json::from_slice(bytes).unwrap();
        assert_eq!(decoded.control.correlation_id.as_deref(), Some("caller-set"));
    }
}
