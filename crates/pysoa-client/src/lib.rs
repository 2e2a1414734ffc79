//! Client dispatch core: per-service handler cache, request-ID correlation,
//! middleware, parallel fan-out, and future handles (spec §4.4, §5).

pub mod client;
pub mod error;
pub mod future;
pub mod handler;
pub mod middleware;
pub mod settings;

pub use client::Client;
pub use error::ClientError;
pub use future::ActionFuture;
pub use handler::{ServiceHandler, ServiceHandlerConfig};
pub use middleware::{
    ClientRequestMiddleware, ClientResponseMiddleware, JobRequestResponse, OutboundRequest,
    RawReceived,
};
pub use settings::{ClientSettings, ServiceSettings};
