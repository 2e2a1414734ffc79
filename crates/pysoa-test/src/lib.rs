//! Scoped action stubs for testing code that calls SOA services (spec §4.7).

pub mod interceptor;
pub mod stub;

pub use interceptor::{Interceptor, ScopedStubs};
pub use stub::{ActionStub, StubCallOutcome, StubSideEffect, StubStep};
