//! Error types for configuration resolution.

use thiserror::Error;

/// Errors that can occur while resolving the application profile.
///
/// Every variant is fatal at startup: callers are expected to abort rather
/// than continue with a partially resolved profile.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment value is present but cannot be parsed.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Configuration {
        /// The environment variable name.
        key: String,
        /// The raw value that failed to parse.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The requested environment name is not one of the known profiles.
    #[error("unknown environment: {0:?} (expected development, testing or production)")]
    UnknownEnvironment(String),

    /// One or more required production database credentials are absent.
    #[error("missing required production database configuration: {}", .missing.join(", "))]
    MissingCredential {
        /// The environment variable names that were missing, in a fixed order.
        missing: Vec<String>,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
