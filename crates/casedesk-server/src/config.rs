//! Process configuration loading from file and environment variables.
//!
//! Covers how the server process runs (bind address, log output). The
//! application profile itself comes from [`casedesk_config::Settings`].

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level process configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "casedesk_db=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidOverride { key: &'static str, value: String },
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `CASEDESK_HOST` overrides `server.host`
/// - `CASEDESK_PORT` overrides `server.port`
/// - `CASEDESK_LOG_LEVEL` overrides `logging.level`
/// - `CASEDESK_LOG_JSON` overrides `logging.json` ("true"/"1" or "false"/"0")
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if an override is malformed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("CASEDESK_HOST") {
        config.server.host = host.parse().map_err(|_| ConfigError::InvalidOverride {
            key: "CASEDESK_HOST",
            value: host.clone(),
        })?;
    }
    if let Some(port) = lookup("CASEDESK_PORT") {
        config.server.port = port.parse().map_err(|_| ConfigError::InvalidOverride {
            key: "CASEDESK_PORT",
            value: port.clone(),
        })?;
    }
    if let Some(level) = lookup("CASEDESK_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("CASEDESK_LOG_JSON") {
        config.logging.json = match json.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => {
                return Err(ConfigError::InvalidOverride {
                    key: "CASEDESK_LOG_JSON",
                    value: json,
                })
            }
        };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn file_values_are_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nhost = \"0.0.0.0\"\nport = 8080\n\n[logging]\nlevel = \"debug\"\njson = true"
        )
        .unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.server.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        assert!(matches!(
            load_config(file.path().to_str()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            lookup(&[
                ("CASEDESK_HOST", "10.0.0.5"),
                ("CASEDESK_PORT", "9000"),
                ("CASEDESK_LOG_LEVEL", "casedesk_db=debug,info"),
                ("CASEDESK_LOG_JSON", "1"),
            ]),
        )
        .unwrap();
        assert_eq!(config.server.host, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.level, "casedesk_db=debug,info");
        assert!(config.logging.json);
    }

    #[test]
    fn malformed_override_is_an_error() {
        let mut config = Config::default();
        let err = apply_overrides(&mut config, lookup(&[("CASEDESK_PORT", "http")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride { key: "CASEDESK_PORT", .. }
        ));
    }

    #[test]
    fn log_json_override_is_strict() {
        let mut config = Config::default();
        apply_overrides(&mut config, lookup(&[("CASEDESK_LOG_JSON", "TRUE")])).unwrap();
        assert!(config.logging.json);
        apply_overrides(&mut config, lookup(&[("CASEDESK_LOG_JSON", "0")])).unwrap();
        assert!(!config.logging.json);

        let err = apply_overrides(&mut config, lookup(&[("CASEDESK_LOG_JSON", "yes please")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidOverride { key, value } => {
                assert_eq!(key, "CASEDESK_LOG_JSON");
                assert_eq!(value, "yes please");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
