//! Application-owned extension objects: mail transport and CORS policy,
//! plus the mapping from configured pool knobs onto the engine.

use axum::http::{header, HeaderName, HeaderValue, Method};
use casedesk_config::{MailOptions, PoolOptions};
use casedesk_db::PoolSettings;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Outbound mail settings, constructed once at startup.
///
/// Holds the transport coordinates only. Delivery is performed elsewhere.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Mailer {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub use_ssl: bool,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    password: Option<String>,
    pub default_sender: Option<String>,
}

impl Mailer {
    pub fn from_options(options: &MailOptions) -> Self {
        Self {
            server: options.server.clone(),
            port: options.port,
            use_tls: options.use_tls,
            use_ssl: options.use_ssl,
            username: options.username.clone(),
            password: options.password.clone(),
            default_sender: options.default_sender.clone(),
        }
    }

    /// Transport URL, `smtps://` for implicit TLS and `smtp://` otherwise.
    pub fn transport_url(&self) -> String {
        let scheme = if self.use_ssl { "smtps" } else { "smtp" };
        format!("{}://{}:{}", scheme, self.server, self.port)
    }

    /// Whether both login credentials are configured.
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

impl fmt::Debug for Mailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailer")
            .field("transport", &self.transport_url())
            .field("use_tls", &self.use_tls)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("default_sender", &self.default_sender)
            .finish()
    }
}

/// Builds the CORS layer for the configured front-end origins.
///
/// Origins that are not valid header values are skipped with a warning.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}

/// Maps the configured pool knobs onto engine settings. A recycle interval
/// of zero disables recycling.
pub fn pool_settings(options: &PoolOptions) -> PoolSettings {
    PoolSettings {
        pool_size: options.pool_size,
        max_overflow: options.max_overflow,
        recycle: (options.pool_recycle > 0).then(|| Duration::from_secs(options.pool_recycle)),
        pre_ping: options.pool_pre_ping,
        timeout: Duration::from_secs(options.pool_timeout),
    }
}
