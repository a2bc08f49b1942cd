//! Deployment environment selection.

use crate::error::ConfigError;
use crate::vars::EnvMap;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Variable naming the active profile.
pub const ENVIRONMENT_VAR: &str = "FLASK_ENV";

/// The fixed set of configuration profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development: debug routes on, schema created at startup.
    #[default]
    Development,
    /// Automated tests.
    Testing,
    /// Production: credentials are mandatory.
    Production,
}

impl Environment {
    /// Returns the canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Production => "production",
        }
    }

    /// Selects the profile named by `FLASK_ENV`, defaulting to development.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEnvironment`] when the variable names
    /// a profile that does not exist.
    pub fn from_vars(vars: &EnvMap) -> Result<Self, ConfigError> {
        match vars.get(ENVIRONMENT_VAR) {
            Some(name) => name.parse(),
            None => Ok(Self::default()),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "default" => Ok(Self::Development),
            "testing" => Ok(Self::Testing),
            "production" => Ok(Self::Production),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}
