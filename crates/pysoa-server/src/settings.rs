//! Declarative server configuration: request handling limits and the
//! middleware construction order, mirroring `turbomcp-server::config`'s
//! nested-sub-config, `DEFAULT_*`-const shape.
//!
//! Action registries and middleware instances themselves stay programmatic
//! (built by the caller and passed to [`crate::server::Server::new`]);
//! what's declared here is the envelope limits that shape that wiring.

use serde::{Deserialize, Serialize};

/// Default cap on the number of actions a single job may carry.
pub const DEFAULT_MAX_ACTIONS_PER_JOB: usize = 100;
/// Default handler idle TTL before a per-service handler is evicted.
pub const DEFAULT_HANDLER_TTL_SECS: u64 = 300;

/// Limits on the shape of an individual job request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLimits {
    /// Jobs carrying more actions than this are rejected before dispatch.
    #[serde(default = "default_max_actions_per_job")]
    pub max_actions_per_job: usize,
}

fn default_max_actions_per_job() -> usize {
    DEFAULT_MAX_ACTIONS_PER_JOB
}

impl Default for JobLimits {
    fn default() -> Self {
        Self {
            max_actions_per_job: default_max_actions_per_job(),
        }
    }
}

/// How long an idle per-client-service handler is kept alive before
/// eviction (spec §5's bounded handler cache).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerLifecycle {
    #[serde(default = "default_handler_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_handler_ttl_secs() -> u64 {
    DEFAULT_HANDLER_TTL_SECS
}

impl Default for HandlerLifecycle {
    fn default() -> Self {
        Self {
            ttl_secs: default_handler_ttl_secs(),
        }
    }
}

/// Declarative, deserializable server configuration.
///
/// Middleware chains are always built in the order recorded here: job
/// middleware wraps outermost-first, then action middleware, matching the
/// onion assembled in [`crate::server::Server::new`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub job_limits: JobLimits,
    #[serde(default)]
    pub handler_lifecycle: HandlerLifecycle,
    /// Names of job middleware to apply, outermost first. Purely
    /// descriptive: resolving a name to a `ServerJobMiddleware` instance is
    /// the caller's job, this only records the intended order.
    #[serde(default)]
    pub job_middleware_order: Vec<String>,
    /// Names of action middleware to apply, outermost first.
    #[serde(default)]
    pub action_middleware_order: Vec<String>,
}

impl ServerSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> ServerSettingsBuilder {
        ServerSettingsBuilder::default()
    }
}

/// Builder for [`ServerSettings`], following the same `::builder()` pattern
/// as the rest of the ambient config layer.
#[derive(Debug, Default)]
pub struct ServerSettingsBuilder {
    settings: ServerSettings,
}

impl ServerSettingsBuilder {
    #[must_use]
    pub fn max_actions_per_job(mut self, max: usize) -> Self {
        self.settings.job_limits.max_actions_per_job = max;
        self
    }

    #[must_use]
    pub fn handler_ttl_secs(mut self, secs: u64) -> Self {
        self.settings.handler_lifecycle.ttl_secs = secs;
        self
    }

    #[must_use]
    pub fn job_middleware_order(mut self, order: Vec<String>) -> Self {
        self.settings.job_middleware_order = order;
        self
    }

    #[must_use]
    pub fn action_middleware_order(mut self, order: Vec<String>) -> Self {
        self.settings.action_middleware_order = order;
        self
    }

    #[must_use]
    pub fn build(self) -> ServerSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_constants() {
        let settings = ServerSettings::default();
        assert_eq!(
            settings.job_limits.max_actions_per_job,
            DEFAULT_MAX_ACTIONS_PER_JOB
        );
        assert_eq!(
            settings.handler_lifecycle.ttl_secs,
            DEFAULT_HANDLER_TTL_SECS
        );
    }

    #[test]
    fn builder_overrides_apply() {
        let settings = ServerSettings::builder()
            .max_actions_per_job(10)
            .handler_ttl_secs(60)
            .job_middleware_order(vec!["logging".to_string()])
            .build();
        assert_eq!(settings.job_limits.max_actions_per_job, 10);
        assert_eq!(settings.handler_lifecycle.ttl_secs, 60);
        assert_eq!(settings.job_middleware_order, vec!["logging".to_string()]);
    }

    #[test]
    fn deserializes_from_minimal_json() {
        let settings: ServerSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(
            settings.job_limits.max_actions_per_job,
            DEFAULT_MAX_ACTIONS_PER_JOB
        );
    }
}
