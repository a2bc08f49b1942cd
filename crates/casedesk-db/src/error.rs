//! Error types for the database layer.

use thiserror::Error;

/// A boxed driver error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the engine, the scoped helpers and the pool monitor.
#[derive(Debug, Error)]
pub enum DbError {
    /// The pool could not be built, or no connection could be acquired
    /// before the acquisition timeout elapsed.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A statement failed on an acquired connection.
    #[error("query failed: {0}")]
    Query(#[source] BoxError),

    /// The connection string could not be parsed.
    #[error("invalid database uri: {0}")]
    InvalidUri(#[source] postgres::Error),

    /// A caller-supplied argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A health check query returned something other than its sentinel.
    #[error("unexpected round-trip result: expected {expected}, got {actual}")]
    UnexpectedResult {
        /// The sentinel value.
        expected: i64,
        /// The value actually returned.
        actual: i64,
    },
}

impl DbError {
    /// Wraps a driver error raised by a statement.
    pub fn query<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Query(Box::new(error))
    }
}
