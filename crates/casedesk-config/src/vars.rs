//! Typed access to a string-only environment mapping.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

/// A snapshot of environment variables.
///
/// Resolution is a pure function of this mapping, which keeps profile
/// construction testable without touching the process environment.
/// Empty values are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvMap {
    vars: HashMap<String, String>,
}

impl EnvMap {
    /// Captures the current process environment.
    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    /// Returns the value for `key`, or `None` if it is unset or empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Returns the value for `key` or an owned copy of `default`.
    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Returns the value for `key` as an owned string, if set.
    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    /// Parses the value for `key`, falling back to `default` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Configuration`] when the value is present but
    /// does not parse as `T`.
    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::invalid(key, raw, e.to_string())),
            None => Ok(default),
        }
    }

    /// Parses a boolean flag, falling back to `default` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Configuration`] for anything other than
    /// `true/false/1/0/yes/no/on/off` (case-insensitive).
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::invalid(key, raw, "expected a boolean")),
            },
            None => Ok(default),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for EnvMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
