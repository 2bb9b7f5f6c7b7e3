use crate::error::FragSqlError;
use crate::fragment::Fragment;
use crate::pool::{LeasedConnection, MiddlewarePool, PoolSession, PoolState};
use crate::results::{CustomDbRow, ResultSet};
use crate::transaction::{BoxedFuture, TransactionHandle};
use crate::types::DatabaseType;

/// Entry point: a pooled database that runs fragments and transactions.
///
/// Every operation leases one connection and hands it back when done, on
/// success or failure. Clones share the pool.
///
/// ```rust,no_run
/// use fragsql::prelude::*;
///
/// # async fn demo() -> Result<(), FragSqlError> {
/// let db = Database::sqlite_builder("app.db").max_connections(4).build().await?;
/// db.execute_batch("CREATE TABLE IF NOT EXISTS t (n INTEGER)").await?;
///
/// db.transaction(|tx| {
///     Box::pin(async move {
///         tx.query(sql!("INSERT INTO t (n) VALUES (" {1_i64} ")")).await?;
///         Ok::<_, FragSqlError>(())
///     })
/// })
/// .await?;
///
/// let row = db.query_single("SELECT COUNT(*) AS c FROM t").await?;
/// # let _ = row;
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct Database {
    session: PoolSession,
    db_type: DatabaseType,
}

impl Database {
    pub(crate) fn from_pool(pool: MiddlewarePool, db_type: DatabaseType) -> Self {
        Self {
            session: PoolSession::new(pool),
            db_type,
        }
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    #[must_use]
    pub fn pool_state(&self) -> PoolState {
        self.session.state()
    }

    #[must_use]
    pub fn session(&self) -> &PoolSession {
        &self.session
    }

    /// Run a fragment on a leased connection and return every row.
    ///
    /// # Errors
    /// Returns `FragSqlError::PoolClosed`, `FragSqlError::PoolUnavailable` or
    /// `FragSqlError::QueryError`.
    pub async fn query(&self, fragment: impl Into<Fragment> + Send) -> Result<ResultSet, FragSqlError> {
        let fragment = fragment.into();
        let mut conn = self.session.acquire().await?;
        conn.query(fragment).await
    }

    /// Run a fragment and return its first row, or `None` when there is none.
    ///
    /// # Errors
    /// Same as [`query`](Self::query).
    pub async fn query_single(
        &self,
        fragment: impl Into<Fragment> + Send,
    ) -> Result<Option<CustomDbRow>, FragSqlError> {
        let fragment = fragment.into();
        let mut conn = self.session.acquire().await?;
        conn.query_single(fragment).await
    }

    /// Run a parameterless script (schema setup and the like).
    ///
    /// # Errors
    /// Same as [`query`](Self::query).
    pub async fn execute_batch(&self, sql: &str) -> Result<(), FragSqlError> {
        let mut conn = self.session.acquire().await?;
        conn.execute_batch(sql).await
    }

    /// Run `f` inside a transaction on one leased connection.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back when it
    /// returns `Err`, unless `f` already called `commit` or `rollback` itself.
    /// The callback's own error is returned unchanged; a failed automatic
    /// rollback is only logged.
    ///
    /// # Errors
    /// Returns `f`'s error, or a `FragSqlError` (converted into `E`) if the
    /// lease, begin or automatic commit fails.
    pub async fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: for<'t> FnOnce(&'t mut TransactionHandle) -> BoxedFuture<'t, Result<T, E>> + Send,
        T: Send,
        E: From<FragSqlError> + Send,
    {
        let conn = self.session.acquire().await.map_err(E::from)?;
        let mut tx = TransactionHandle::begin(conn).await.map_err(E::from)?;
        let outcome = f(&mut tx).await;
        tx.finish(outcome).await
    }

    /// Lease a connection, run `f` with it, and hand it back whatever `f` returns.
    ///
    /// # Errors
    /// Returns `f`'s error, or a `FragSqlError` (converted into `E`) if no
    /// connection could be leased.
    pub async fn with_connection<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut LeasedConnection) -> BoxedFuture<'c, Result<T, E>> + Send,
        T: Send,
        E: From<FragSqlError> + Send,
    {
        let mut conn = self.session.acquire().await.map_err(E::from)?;
        f(&mut conn).await
    }

    /// Close the database for this handle and every clone of it.
    ///
    /// Later operations on any clone fail with `FragSqlError::PoolClosed`.
    /// Leases already out finish normally; pooled connections are closed once
    /// the last handle is dropped.
    pub fn close(self) {
        self.session.close();
        tracing::debug!(db_type = ?self.db_type, "database closed");
    }
}
