//! # pysoa
//!
//! A Rust implementation of a PySOA-style service-oriented RPC framework:
//! clients dispatch jobs of one or more named actions to services, servers
//! run those actions through a validating middleware pipeline, and an
//! expansion engine transparently follows typed references across service
//! boundaries.
//!
//! This crate is a thin facade over the workspace's sub-crates:
//!
//! - [`pysoa_core`] — the wire envelope (`JobRequest`/`JobResponse`,
//!   `ActionRequest`/`ActionResponse`, `Error`), `SwitchSet`, and the
//!   generic middleware onion.
//! - [`pysoa_transport`] — the `Transport`/`Serializer` contracts a
//!   concrete broker integration implements, plus a JSON serializer.
//! - [`pysoa_client`] — `Client`: per-service handler cache, request-ID
//!   correlation, parallel fan-out, and future handles.
//! - [`pysoa_server`] — `Server::process_job`, the `Action` trait, and
//!   `SwitchedAction`.
//! - [`pysoa_expansion`] — the declarative response-expansion engine.
//! - [`pysoa_test`] (behind the `test-support` feature) — scoped action
//!   stubs for testing code that calls services.
//!
//! ## Quick start
//!
//! ```no_run
//! use pysoa::prelude::*;
//! use std::collections::HashMap;
//! # use std::sync::Arc;
//! # use std::time::Duration;
//! # async fn example(transport: Arc<dyn Transport>, serializer: Arc<dyn Serializer>) -> Result<(), ClientError> {
//! let config = ServiceHandlerConfig {
//!     transport,
//!     serializer,
//!     request_middleware: Vec::new(),
//!     response_middleware: Vec::new(),
//!     default_timeout: Some(Duration::from_secs(5)),
//!     message_expiry: None,
//! };
//! let mut configs = HashMap::new();
//! configs.insert("echo".to_string(), config);
//! let client = Client::new(configs);
//!
//! let response = client
//!     .call_action("echo", "ping", empty_object(), empty_object(), None)
//!     .await?;
//! println!("{:?}", response.actions);
//! # Ok(())
//! # }
//! ```

pub use pysoa_client as client;
pub use pysoa_core as core;
pub use pysoa_expansion as expansion;
pub use pysoa_server as server;
pub use pysoa_transport as transport;

#[cfg(feature = "test-support")]
pub use pysoa_test as test;

pub use pysoa_core::{
    ActionRequest, ActionResponse, Context, Control, DispatchError, EnrichedActionRequest, Error,
    ErrorCode, JobDispatcher, JobRequest, JobResponse, JsonObject, LocalActionDispatcher,
    SwitchSet, empty_object,
};

/// Commonly needed types, re-exported for a single glob import.
pub mod prelude {
    pub use pysoa_client::{Client, ClientError, ClientSettings, ServiceHandler, ServiceHandlerConfig};
    pub use pysoa_core::{
        ActionRequest, ActionResponse, Context, Control, DispatchError, EnrichedActionRequest,
        Error, ErrorCode, JobDispatcher, JobRequest, JobResponse, JsonObject,
        LocalActionDispatcher, SwitchSet, empty_object,
    };
    pub use pysoa_expansion::{ExpansionCompiler, ExpansionEngineError, expand};
    pub use pysoa_server::{Action, Server, ServerError, ServerSettings, SwitchedAction};
    pub use pysoa_transport::{JsonSerializer, Serializer, ServerTransport, Transport};

    #[cfg(feature = "test-support")]
    pub use pysoa_test::{ActionStub, Interceptor};

    pub use async_trait::async_trait;
}
