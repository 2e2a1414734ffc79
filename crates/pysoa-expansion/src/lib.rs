//! A declarative, transparent response-expansion engine (spec §4.6).
//!
//! Depends only on `pysoa-core`, not on `pysoa-client`, even though the
//! dispatch loop needs to issue jobs through whatever client the caller is
//! using — see [`pysoa_core::JobDispatcher`] for how that seam is closed
//! without a crate-graph cycle.

pub mod compiler;
pub mod config;
pub mod engine;
pub mod path;
pub mod tree;

pub use compiler::ExpansionCompiler;
pub use config::{
    ConfigError, ExpansionRequest, TypeExpansionEntry, TypeExpansions, TypeRoute, TypeRoutes,
};
pub use engine::{ExpansionEngineError, expand};
pub use path::{Path, PathSegment};
pub use tree::{ExpansionNode, ExpansionParent, TypeNode};
