//! The small set of driver operations the monitor needs.

/// Driver operations used by the pool monitor and the scoped helpers.
pub trait DriverConnection: Send + 'static {
    /// The driver's error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Forces UTF-8 as the connection's text encoding.
    fn set_client_encoding(&mut self) -> Result<(), Self::Error>;

    /// Runs `SELECT 1` and returns the scalar result.
    fn round_trip(&mut self) -> Result<i64, Self::Error>;

    /// Executes one or more statements that return no rows.
    fn run_batch(&mut self, sql: &str) -> Result<(), Self::Error>;

    /// Rolls back any transaction left open on the connection.
    fn reset(&mut self) -> Result<(), Self::Error>;
}

impl DriverConnection for rusqlite::Connection {
    type Error = rusqlite::Error;

    fn set_client_encoding(&mut self) -> Result<(), Self::Error> {
        // Ignored by SQLite once the database file has content.
        rusqlite::Connection::execute_batch(self, "PRAGMA encoding = 'UTF-8';")
    }

    fn round_trip(&mut self) -> Result<i64, Self::Error> {
        self.query_row("SELECT 1", [], |row| row.get(0))
    }

    fn run_batch(&mut self, sql: &str) -> Result<(), Self::Error> {
        rusqlite::Connection::execute_batch(self, sql)
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        if self.is_autocommit() {
            return Ok(());
        }
        rusqlite::Connection::execute_batch(self, "ROLLBACK")
    }
}

impl DriverConnection for postgres::Client {
    type Error = postgres::Error;

    fn set_client_encoding(&mut self) -> Result<(), Self::Error> {
        self.batch_execute("SET client_encoding TO 'UTF8'")
    }

    fn round_trip(&mut self) -> Result<i64, Self::Error> {
        let row = self.query_one("SELECT 1", &[])?;
        let value: i32 = row.try_get(0)?;
        Ok(i64::from(value))
    }

    fn run_batch(&mut self, sql: &str) -> Result<(), Self::Error> {
        self.batch_execute(sql)
    }

    // Outside a transaction the server only raises a warning.
    fn reset(&mut self) -> Result<(), Self::Error> {
        self.batch_execute("ROLLBACK")
    }
}
