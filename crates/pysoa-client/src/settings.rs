//! Declarative client configuration, independent of the concrete transport
//! and middleware instances a caller wires up programmatically.
//!
//! Transports, serializers, and middleware chains are trait objects built
//! and injected by the caller (spec §9 explicitly keeps middleware
//! construction programmatic rather than config-driven); what's left to
//! configure declaratively is per-service timeouts, matching
//! `turbomcp-client::client::config::ConnectionConfig`.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-service timeout overrides layered over [`ClientSettings`]'s defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Overrides [`ClientSettings::default_timeout_secs`] for this service.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Overrides [`ClientSettings::default_message_expiry_secs`] for this service.
    #[serde(default)]
    pub message_expiry_secs: Option<u64>,
}

/// Declarative, deserializable client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Default receive timeout applied when a call doesn't specify its own.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// Default message TTL passed to transports that support one.
    #[serde(default)]
    pub default_message_expiry_secs: Option<u64>,
    /// Per-service overrides, keyed by service name.
    #[serde(default)]
    pub services: HashMap<String, ServiceSettings>,
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            default_message_expiry_secs: None,
            services: HashMap::new(),
        }
    }
}

impl ClientSettings {
    /// The receive timeout to use for `service`, layering its override (if
    /// any) over the client-wide default.
    #[must_use]
    pub fn timeout_for(&self, service: &str) -> Duration {
        let secs = self
            .services
            .get(service)
            .and_then(|s| s.timeout_secs)
            .unwrap_or(self.default_timeout_secs);
        Duration::from_secs(secs)
    }

    /// The message expiry to use for `service`, layering its override (if
    /// any) over the client-wide default.
    #[must_use]
    pub fn message_expiry_for(&self, service: &str) -> Option<Duration> {
        self.services
            .get(service)
            .and_then(|s| s.message_expiry_secs)
            .or(self.default_message_expiry_secs)
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_override_wins_over_client_default() {
        let mut services = HashMap::new();
        services.insert(
            "billing".to_string(),
            ServiceSettings {
                timeout_secs: Some(30),
                message_expiry_secs: None,
            },
        );
        let settings = ClientSettings {
            default_timeout_secs: 5,
            default_message_expiry_secs: None,
            services,
        };
        assert_eq!(settings.timeout_for("billing"), Duration::from_secs(30));
        assert_eq!(settings.timeout_for("other"), Duration::from_secs(5));
    }

    #[test]
    fn deserializes_from_minimal_json() {
        let settings: ClientSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.default_timeout_secs, 5);
        assert!(settings.services.is_empty());
    }
}
