//! Named option groups merged into a [`Settings`](crate::Settings) profile.

use crate::environment::Environment;
use crate::error::ConfigError;
use crate::vars::EnvMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use std::fmt;

/// Characters left untouched in the password component (RFC 3986 unreserved).
const PASSWORD_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes a raw password for interpolation into a connection URI.
pub fn encode_password(raw: &str) -> String {
    utf8_percent_encode(raw, PASSWORD_ENCODE_SET).to_string()
}

const DEFAULT_SECRET_KEY: &str = "default_dev_secret";

/// Secret key and profile flags.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct BaseOptions {
    #[serde(skip)]
    pub secret_key: String,
    pub debug: bool,
    pub testing: bool,
}

impl BaseOptions {
    pub fn from_vars(environment: Environment, vars: &EnvMap) -> Self {
        let secret_key = vars.string_or("SECRET_KEY", DEFAULT_SECRET_KEY);
        if environment == Environment::Production && secret_key == DEFAULT_SECRET_KEY {
            tracing::warn!(
                "SECRET_KEY is not set; production is running with the development default"
            );
        }
        Self {
            secret_key,
            debug: environment == Environment::Development,
            testing: environment == Environment::Testing,
        }
    }
}

impl fmt::Debug for BaseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseOptions")
            .field("secret_key", &"***")
            .field("debug", &self.debug)
            .field("testing", &self.testing)
            .finish()
    }
}

/// Connection pool tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolOptions {
    /// Connections kept in the pool.
    pub pool_size: u32,
    /// Connections allowed beyond `pool_size`.
    pub max_overflow: u32,
    /// Maximum connection age in seconds; 0 disables recycling.
    pub pool_recycle: u64,
    /// Validate connections before handing them out.
    pub pool_pre_ping: bool,
    /// Seconds to wait for a free connection.
    pub pool_timeout: u64,
    /// Log every checkout and checkin.
    pub echo_pool: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            pool_size: 10,
            max_overflow: 20,
            pool_recycle: 3600,
            pool_pre_ping: true,
            pool_timeout: 30,
            echo_pool: false,
        }
    }
}

impl PoolOptions {
    /// # Errors
    ///
    /// Returns [`ConfigError::Configuration`] for unparseable values, a
    /// pool that could never hold a connection, or a zero timeout.
    pub fn from_vars(vars: &EnvMap) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let options = Self {
            pool_size: vars.parse_or("POOL_SIZE", defaults.pool_size)?,
            max_overflow: vars.parse_or("MAX_OVERFLOW", defaults.max_overflow)?,
            pool_recycle: vars.parse_or("POOL_RECYCLE", defaults.pool_recycle)?,
            pool_pre_ping: vars.bool_or("POOL_PRE_PING", defaults.pool_pre_ping)?,
            pool_timeout: vars.parse_or("POOL_TIMEOUT", defaults.pool_timeout)?,
            echo_pool: vars.bool_or("ECHO_POOL", defaults.echo_pool)?,
        };

        if options.pool_size.saturating_add(options.max_overflow) == 0 {
            return Err(ConfigError::invalid(
                "POOL_SIZE",
                &options.pool_size.to_string(),
                "POOL_SIZE + MAX_OVERFLOW must be at least 1",
            ));
        }
        if options.pool_timeout == 0 {
            return Err(ConfigError::invalid("POOL_TIMEOUT", "0", "must be positive"));
        }
        Ok(options)
    }
}

/// Database location, credentials and pool tuning.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseOptions {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip)]
    pub password: String,
    pub name: String,
    pub pool: PoolOptions,
}

const DEFAULT_DB_PORT: u16 = 5432;

impl DatabaseOptions {
    /// Reads the `DB_*` variables used by development and testing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Configuration`] for unparseable values.
    pub fn from_vars(vars: &EnvMap) -> Result<Self, ConfigError> {
        Ok(Self {
            host: vars.string_or("DB_HOST", "127.0.0.1"),
            port: vars.parse_or("DB_PORT", DEFAULT_DB_PORT)?,
            user: vars.string_or("DB_USER", "postgres"),
            password: vars.string_or("DB_PASSWORD", "postgres"),
            name: vars.string_or("DB_NAME", "CaseManagementSystem"),
            pool: PoolOptions::from_vars(vars)?,
        })
    }

    /// Reads the `PROD_DB_*` variables. Host, user, password and database
    /// name have no defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] naming every absent
    /// credential, or [`ConfigError::Configuration`] for unparseable values.
    pub fn production_from_vars(vars: &EnvMap) -> Result<Self, ConfigError> {
        const REQUIRED: [&str; 4] = [
            "PROD_DB_HOST",
            "PROD_DB_USER",
            "PROD_DB_PASSWORD",
            "PROD_DB_NAME",
        ];

        let missing: Vec<String> = REQUIRED
            .iter()
            .filter(|key| vars.get(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingCredential { missing });
        }

        let port = match vars.get("PROD_DB_PORT") {
            Some(_) => vars.parse_or("PROD_DB_PORT", DEFAULT_DB_PORT)?,
            None => vars.parse_or("DB_PORT", DEFAULT_DB_PORT)?,
        };

        Ok(Self {
            host: vars.string_or("PROD_DB_HOST", ""),
            port,
            user: vars.string_or("PROD_DB_USER", ""),
            password: vars.string_or("PROD_DB_PASSWORD", ""),
            name: vars.string_or("PROD_DB_NAME", ""),
            pool: PoolOptions::from_vars(vars)?,
        })
    }

    /// The connection string with the password percent-encoded.
    pub fn uri(&self) -> String {
        self.format_uri(&encode_password(&self.password))
    }

    /// The connection string with the password masked, for logs.
    pub fn redacted_uri(&self) -> String {
        self.format_uri("***")
    }

    fn format_uri(&self, password: &str) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.user, password, self.host, self.port, self.name
        )
    }
}

impl fmt::Debug for DatabaseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("name", &self.name)
            .field("pool", &self.pool)
            .finish()
    }
}

/// Outgoing mail transport settings.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct MailOptions {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub use_ssl: bool,
    pub username: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
    pub default_sender: Option<String>,
}

impl MailOptions {
    /// # Errors
    ///
    /// Returns [`ConfigError::Configuration`] for an unparseable port or flag.
    pub fn from_vars(vars: &EnvMap) -> Result<Self, ConfigError> {
        Ok(Self {
            server: vars.string_or("MAIL_SERVER", "smtp.qq.com"),
            port: vars.parse_or("MAIL_PORT", 465)?,
            use_tls: vars.bool_or("MAIL_USE_TLS", false)?,
            use_ssl: vars.bool_or("MAIL_USE_SSL", true)?,
            username: vars.string("MAIL_USERNAME"),
            password: vars.string("MAIL_PASSWORD"),
            default_sender: vars.string("MAIL_DEFAULT_SENDER"),
        })
    }
}

impl fmt::Debug for MailOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailOptions")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("use_ssl", &self.use_ssl)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("default_sender", &self.default_sender)
            .finish()
    }
}

/// Origins allowed by the default CORS policy.
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://127.0.0.1:5173"];

/// Switches that are not tied to a single subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureOptions {
    /// Expose the pool debug endpoints outside debug mode.
    pub enable_pool_monitor: bool,
    /// Origins allowed to make credentialed cross-origin requests.
    pub cors_origins: Vec<String>,
}

impl FeatureOptions {
    /// # Errors
    ///
    /// Returns [`ConfigError::Configuration`] for an unparseable flag.
    pub fn from_vars(vars: &EnvMap) -> Result<Self, ConfigError> {
        let cors_origins = match vars.get("CORS_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };
        Ok(Self {
            enable_pool_monitor: vars.bool_or("ENABLE_POOL_MONITOR", false)?,
            cors_origins,
        })
    }
}
