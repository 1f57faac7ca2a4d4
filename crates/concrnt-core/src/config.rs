//! Node configuration, loaded from `/etc/concrnt/config/config.yaml`
//! (spec §6 "CLI").

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default path the `concrntd` binary reads unless overridden with
/// `--config`.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/concrnt/config/config.yaml";

/// Registration mode for `POST /api/v1/register` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationMode {
    Open,
    Invite,
    Close,
}

/// Top-level node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Port to listen on (spec §6: 8000).
    #[serde(default = "default_port")]
    pub port: u16,

    /// DSN for the relational store.
    pub dsn: String,

    /// Address of the memory cache (e.g. for well-known/entity TTL caches
    /// that want a shared backend rather than per-process memory).
    pub cache_address: Option<String>,

    /// Address of the pub/sub broker backing the signal bus.
    pub broker_address: Option<String>,

    /// Private key material the node's identity (CSID) is derived from.
    pub private_key: String,

    /// Fully-qualified domain name this node is reachable at.
    pub fqdn: String,

    /// Layer label advertised in the well-known descriptor.
    #[serde(default = "default_layer")]
    pub layer: String,

    /// Registration mode advertised/enforced by `/api/v1/register`.
    #[serde(default = "default_registration_mode")]
    pub registration_mode: RegistrationMode,

    /// Optional OpenTelemetry-style trace endpoint.
    pub trace_endpoint: Option<String>,
}

fn default_port() -> u16 {
    8000
}

fn default_layer() -> String {
    "0".to_string()
}

fn default_registration_mode() -> RegistrationMode {
    RegistrationMode::Invite
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl NodeConfig {
    /// Load and parse a YAML config file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let yaml = r#"
dsn: "postgres://localhost/concrnt"
private_key: "deadbeef"
fqdn: "node.example.com"
"#;
        let cfg: NodeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.registration_mode, RegistrationMode::Invite);
        assert_eq!(cfg.layer, "0");
    }

    #[test]
    fn parses_full_config() {
        let yaml = r#"
port: 9000
dsn: "postgres://localhost/concrnt"
cache_address: "127.0.0.1:11211"
broker_address: "127.0.0.1:6379"
private_key: "deadbeef"
fqdn: "node.example.com"
layer: "1"
registration_mode: open
trace_endpoint: "http://otel:4317"
"#;
        let cfg: NodeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.registration_mode, RegistrationMode::Open);
        assert_eq!(cfg.trace_endpoint.as_deref(), Some("http://otel:4317"));
    }

    #[test]
    fn load_missing_file_errors() {
        let err = NodeConfig::load("/nonexistent/path/config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
