//! Configuration resolution for the casedesk backend.
//!
//! A profile is assembled from three named option groups (base, database,
//! mail) plus a handful of feature switches, read from a string-only
//! environment mapping. Resolution is pure: [`Settings::resolve`] never
//! touches the process environment, and every malformed value is reported
//! at startup rather than on first use.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `FLASK_ENV` | `development` |
//! | `SECRET_KEY` | `default_dev_secret` |
//! | `DB_HOST` / `DB_PORT` | `127.0.0.1` / `5432` |
//! | `DB_USER` / `DB_PASSWORD` / `DB_NAME` | `postgres` / `postgres` / `CaseManagementSystem` |
//! | `POOL_SIZE` / `MAX_OVERFLOW` | `10` / `20` |
//! | `POOL_RECYCLE` / `POOL_TIMEOUT` | `3600` / `30` (seconds) |
//! | `POOL_PRE_PING` / `ECHO_POOL` | `true` / `false` |
//! | `PROD_DB_*` | required in production |
//! | `MAIL_*` | `smtp.qq.com:465`, SSL |
//! | `ENABLE_POOL_MONITOR` | `false` |

mod environment;
mod error;
mod options;
mod settings;
mod vars;

pub use environment::{Environment, ENVIRONMENT_VAR};
pub use error::ConfigError;
pub use options::{
    encode_password, BaseOptions, DatabaseOptions, FeatureOptions, MailOptions, PoolOptions,
    DEFAULT_CORS_ORIGINS,
};
pub use settings::{compose, Settings};
pub use vars::EnvMap;
