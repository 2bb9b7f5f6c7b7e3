use std::time::Duration;

use async_trait::async_trait;
use tokio::task::spawn_blocking;

use crate::error::{DriverError, FragSqlError};
use crate::executor::DriverConnection;
use crate::fragment::PlaceholderStyle;
use crate::results::ResultSet;
use crate::types::RowValues;

use super::config::{SharedSqliteConnection, SqliteManagedConnection};
use super::params::Params;
use super::query::build_result_set;

/// Pauses between rollback attempts while another writer holds the lock.
const ROLLBACK_BUSY_BACKOFF: [Duration; 3] = [
    Duration::from_millis(10),
    Duration::from_millis(25),
    Duration::from_millis(50),
];

/// Run synchronous `rusqlite` logic on the blocking pool.
///
/// # Errors
/// Returns whatever `func` returns, or `DriverError::Worker` if the blocking
/// task panicked or was cancelled.
pub(crate) async fn run_blocking<F, R>(conn: SharedSqliteConnection, func: F) -> Result<R, FragSqlError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, FragSqlError> + Send + 'static,
    R: Send + 'static,
{
    spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| {
        FragSqlError::from(DriverError::Worker(format!(
            "sqlite spawn_blocking join error: {e}"
        )))
    })?
}

fn is_busy(err: &FragSqlError) -> bool {
    matches!(
        err,
        FragSqlError::QueryError(DriverError::Sqlite(rusqlite::Error::SqliteFailure(e, _)))
            if e.code == rusqlite::ErrorCode::DatabaseBusy
    )
}

#[async_trait]
impl DriverConnection for SqliteManagedConnection {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Positional
    }

    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, FragSqlError> {
        let sql_owned = sql.to_owned();
        let params_owned = Params::convert(params);
        run_blocking(self.handle(), move |guard| {
            let mut stmt = guard.prepare(&sql_owned)?;
            build_result_set(&mut stmt, &params_owned)
        })
        .await
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), FragSqlError> {
        let sql_owned = sql.to_owned();
        run_blocking(self.handle(), move |guard| {
            guard.execute_batch(&sql_owned)?;
            Ok(())
        })
        .await
    }

    async fn begin_transaction(&mut self) -> Result<(), FragSqlError> {
        run_blocking(self.handle(), |guard| {
            guard.execute_batch("BEGIN")?;
            Ok(())
        })
        .await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), FragSqlError> {
        run_blocking(self.handle(), |guard| {
            guard.execute_batch("COMMIT")?;
            Ok(())
        })
        .await?;
        self.in_transaction = false;
        Ok(())
    }

    /// Roll back the open transaction, if `SQLite` still considers one open.
    ///
    /// Some failures (constraint violations with `ON CONFLICT ROLLBACK`, a
    /// failed `COMMIT` under contention) end the transaction on the engine side
    /// already; rolling back then is a no-op rather than an error.
    async fn rollback(&mut self) -> Result<(), FragSqlError> {
        #[cfg(test)]
        if self.force_rollback_busy {
            return Err(FragSqlError::from(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                None,
            )));
        }

        let mut backoff = ROLLBACK_BUSY_BACKOFF.iter();
        loop {
            let outcome = run_blocking(self.handle(), |guard| {
                if guard.is_autocommit() {
                    return Ok(());
                }
                guard.execute_batch("ROLLBACK")?;
                Ok(())
            })
            .await;

            match outcome {
                Ok(()) => {
                    self.in_transaction = false;
                    return Ok(());
                }
                Err(err) if is_busy(&err) => match backoff.next() {
                    Some(delay) => {
                        tracing::debug!(?delay, "sqlite busy during rollback, retrying");
                        tokio::time::sleep(*delay).await;
                    }
                    None => return Err(err),
                },
                Err(err) => return Err(err),
            }
        }
    }
}
