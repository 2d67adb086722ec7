use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use pod_sdk::ClientConfig;

/// Contents of the optional TOML configuration file.
///
/// ```toml
/// pod = "https://alice.example/"
///
/// [client]
/// batch_millis = 250
/// bearer_token = "..."
///
/// [client.notifications]
/// max_reconnect_attempts = 3
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub pod: Option<String>,
    pub client: ClientConfig,
}

impl CliConfig {
    /// Parse the file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Flags given on the command line win over the file.
    pub fn with_overrides(mut self, pod: Option<String>, token: Option<String>) -> Self {
        if pod.is_some() {
            self.pod = pod;
        }
        if let Some(token) = token {
            self.client.bearer_token = Some(token);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
pod = "https://alice.example/"

[client]
batch_millis = 250

[client.notifications]
max_reconnect_attempts = 3
"#
        )
        .unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.pod.as_deref(), Some("https://alice.example/"));
        assert_eq!(config.client.batch_millis, 250);
        assert_eq!(config.client.notifications.max_reconnect_attempts, 3);
        assert_eq!(config.client.notifications.reconnect_interval_ms, 5_000);
    }

    #[test]
    fn missing_path_gives_defaults() {
        assert_eq!(CliConfig::load(None).unwrap(), CliConfig::default());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }

    #[test]
    fn flags_override_file() {
        let config = CliConfig {
            pod: Some("https://file.example/".into()),
            client: ClientConfig::default().with_bearer_token("from-file"),
        }
        .with_overrides(Some("https://flag.example/".into()), None);
        assert_eq!(config.pod.as_deref(), Some("https://flag.example/"));
        assert_eq!(config.client.bearer_token.as_deref(), Some("from-file"));
    }
}
