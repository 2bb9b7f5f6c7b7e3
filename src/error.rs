use thiserror::Error;

use crate::transaction::TxState;

/// Failure reported by the underlying database driver.
///
/// Kept opaque on purpose: callers match on [`FragSqlError::QueryError`] and
/// only dig into the backend error when they need the driver's own detail.
#[derive(Debug, Error)]
pub enum DriverError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    /// The blocking worker that drives a synchronous driver failed.
    #[error("driver worker error: {0}")]
    Worker(String),
}

#[derive(Debug, Error)]
pub enum FragSqlError {
    /// Segment/parameter counts do not line up (`segments == params + 1`).
    #[error("malformed fragment: {segments} text segments for {params} parameters")]
    MalformedFragment { segments: usize, params: usize },

    /// The driver rejected a statement (syntax, constraint, connectivity).
    #[error("query failed: {0}")]
    QueryError(#[source] DriverError),

    /// No connection could be leased from the pool.
    #[error("connection pool unavailable: {0}")]
    PoolUnavailable(String),

    #[error("connection pool is closed")]
    PoolClosed,

    /// A statement or finalize request arrived after commit/rollback.
    #[error("transaction already finalized ({0})")]
    TransactionAlreadyFinalized(TxState),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl FragSqlError {
    /// True when the error came from the driver rather than from this crate.
    #[must_use]
    pub fn is_query_error(&self) -> bool {
        matches!(self, FragSqlError::QueryError(_))
    }
}

impl From<DriverError> for FragSqlError {
    fn from(err: DriverError) -> Self {
        FragSqlError::QueryError(err)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for FragSqlError {
    fn from(err: rusqlite::Error) -> Self {
        FragSqlError::QueryError(DriverError::Sqlite(err))
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for FragSqlError {
    fn from(err: tokio_postgres::Error) -> Self {
        FragSqlError::QueryError(DriverError::Postgres(err))
    }
}

impl<E> From<bb8::RunError<E>> for FragSqlError
where
    E: Into<FragSqlError>,
{
    fn from(err: bb8::RunError<E>) -> Self {
        match err {
            bb8::RunError::User(inner) => match inner.into() {
                FragSqlError::QueryError(driver) => {
                    FragSqlError::PoolUnavailable(format!("connect failed: {driver}"))
                }
                other => other,
            },
            bb8::RunError::TimedOut => {
                FragSqlError::PoolUnavailable("timed out waiting for a connection".into())
            }
        }
    }
}
