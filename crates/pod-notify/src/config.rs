use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reconnect policy for notification channels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Attempts made after an unexpected close before giving up.
    pub max_reconnect_attempts: u32,
    /// Pause before each attempt, in milliseconds.
    pub reconnect_interval_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 6,
            reconnect_interval_ms: 5_000,
        }
    }
}

impl NotificationConfig {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = NotificationConfig::default();
        assert_eq!(config.max_reconnect_attempts, 6);
        assert_eq!(config.reconnect_interval(), Duration::from_secs(5));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: NotificationConfig = serde_json::from_str(r#"{"max_reconnect_attempts": 2}"#).unwrap();
        assert_eq!(config.max_reconnect_attempts, 2);
        assert_eq!(config.reconnect_interval_ms, 5_000);
    }
}
