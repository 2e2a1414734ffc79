//! Wire message types, the error taxonomy, switch sets, the middleware
//! onion primitive, and the cross-crate dispatch seams shared by every other
//! crate in this workspace.
//!
//! `pysoa-core` depends on nothing else in the workspace. [`message`]
//! defines [`message::LocalActionDispatcher`] and [`dispatch`] defines
//! [`dispatch::JobDispatcher`] specifically so that `pysoa-server` and
//! `pysoa-client` can each hand the rest of the system a callback into their
//! own dispatch logic without those crates needing to depend on each other.

pub mod dispatch;
pub mod error;
pub mod message;
pub mod middleware;
pub mod switches;

pub use dispatch::{DispatchError, JobDispatcher};
pub use error::{Error, ErrorCode};
pub use message::{
    ActionRequest, ActionResponse, Context, Control, EnrichedActionRequest, JobRequest,
    JobResponse, JsonObject, LocalActionDispatcher, empty_object,
};
pub use middleware::{BoxFuture, Middleware, NextFn, compose};
pub use switches::{IntoSwitch, SwitchSet};
