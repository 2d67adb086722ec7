use std::time::Duration;

use serde::{Deserialize, Serialize};

use pod_notify::NotificationConfig;
use pod_protocol::TransportConfig;

/// Settings for a [`PodClient`](crate::PodClient).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Minimum spacing between two dispatches of the same request kind on
    /// one resource, in milliseconds.
    pub batch_millis: u64,
    /// Per-request timeout in milliseconds; `0` disables it.
    pub request_timeout_ms: u64,
    pub user_agent: String,
    pub bearer_token: Option<String>,
    pub notifications: NotificationConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            batch_millis: 1_000,
            request_timeout_ms: transport.request_timeout_ms,
            user_agent: transport.user_agent,
            bearer_token: None,
            notifications: NotificationConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_batch_millis(mut self, millis: u64) -> Self {
        self.batch_millis = millis;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_notifications(mut self, notifications: NotificationConfig) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn batch_window(&self) -> Duration {
        Duration::from_millis(self.batch_millis)
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            request_timeout_ms: self.request_timeout_ms,
            user_agent: self.user_agent.clone(),
            bearer_token: self.bearer_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{ "batch_millis": 10, "notifications": { "max_reconnect_attempts": 2 } }"#)
                .unwrap();
        assert_eq!(config.batch_window(), Duration::from_millis(10));
        assert_eq!(config.notifications.max_reconnect_attempts, 2);
        assert_eq!(config.notifications.reconnect_interval(), Duration::from_secs(5));
        assert_eq!(config.request_timeout_ms, TransportConfig::default().request_timeout_ms);
    }

    #[test]
    fn transport_settings_carry_over() {
        let config = ClientConfig::default().with_bearer_token("secret");
        let transport = config.transport();
        assert_eq!(transport.bearer_token.as_deref(), Some("secret"));
        assert_eq!(transport.user_agent, config.user_agent);
    }
}
