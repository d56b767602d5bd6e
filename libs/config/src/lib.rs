//! # Labwire Configuration
//!
//! Configuration for the analyzer gateway, loaded from TOML. The analyzer
//! listener is disabled by default: a host that doesn't talk to an
//! instrument should never open the port.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Analyzer gateway settings.
///
/// `equipment_ip` is informational only; it identifies the instrument in
/// logs and never restricts which peers may connect.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Master switch for the TCP listener.
    pub enabled: bool,
    /// Interface to bind ("0.0.0.0" for all interfaces).
    pub bind_host: String,
    /// TCP port to listen on.
    pub bind_port: u16,
    /// Instrument address, for logging.
    pub equipment_ip: Option<String>,
    /// Per-connection receive timeout; an idle connection is flushed and
    /// closed after this long without data.
    pub idle_timeout_secs: u64,
    /// Accept timeout so the running flag is rechecked even when no
    /// connection arrives.
    pub accept_poll_secs: u64,
    /// How long `stop()` waits for in-flight handlers before aborting them.
    pub shutdown_grace_secs: u64,
    /// Socket read chunk size.
    pub max_buffer_bytes: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_host: "0.0.0.0".to_string(),
            bind_port: 5150,
            equipment_ip: None,
            idle_timeout_secs: 30,
            accept_poll_secs: 1,
            shutdown_grace_secs: 5,
            max_buffer_bytes: 65536,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_port == 0 {
            return Err(ConfigError::Invalid("bind_port must be > 0".to_string()));
        }
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "idle_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.accept_poll_secs == 0 {
            return Err(ConfigError::Invalid(
                "accept_poll_secs must be > 0".to_string(),
            ));
        }
        if self.max_buffer_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_buffer_bytes must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn accept_poll(&self) -> Duration {
        Duration::from_secs(self.accept_poll_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AnalyzerConfig::default();
        config.validate().unwrap();
        assert!(!config.enabled);
        assert_eq!(config.bind_addr(), "0.0.0.0:5150");
    }

    #[test]
    fn loads_partial_toml_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "enabled = true\nbind_port = 5151\nequipment_ip = \"10.10.16.34\"\n"
        )
        .unwrap();

        let config = AnalyzerConfig::from_file(file.path()).unwrap();
        assert!(config.enabled);
        assert_eq!(config.bind_port, 5151);
        assert_eq!(config.equipment_ip.as_deref(), Some("10.10.16.34"));
        assert_eq!(config.idle_timeout_secs, 30);
    }

    #[test]
    fn zero_port_is_rejected() {
        let config = AnalyzerConfig {
            bind_port: 0,
            ..AnalyzerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "bind_port = \"not a port\"").unwrap();
        assert!(matches!(
            AnalyzerConfig::from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
