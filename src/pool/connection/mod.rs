#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

use async_trait::async_trait;
use bb8::PooledConnection;

use super::types::MiddlewarePool;
use crate::error::FragSqlError;
use crate::executor::{self, DriverConnection};
use crate::fragment::{Fragment, FragmentBuilder, FragmentExecutor, PlaceholderStyle};
#[cfg(feature = "postgres")]
use crate::postgres::PgManager;
use crate::results::{CustomDbRow, ResultSet};
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteManager;
use crate::types::{DatabaseType, RowValues};

/// A connection leased from a [`MiddlewarePool`].
///
/// Not `Clone`, and every statement method takes `&mut self`, so one lease runs
/// one statement at a time. Dropping the lease hands the connection back to its
/// pool; a connection still inside a transaction is discarded instead.
pub enum LeasedConnection {
    #[cfg(feature = "postgres")]
    Postgres(PooledConnection<'static, PgManager>),
    #[cfg(feature = "sqlite")]
    Sqlite(PooledConnection<'static, SqliteManager>),
}

impl std::fmt::Debug for LeasedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(conn) => f.debug_tuple("Postgres").field(&**conn).finish(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(conn) => f.debug_tuple("Sqlite").field(&**conn).finish(),
        }
    }
}

impl MiddlewarePool {
    /// Check a connection out of the pool.
    ///
    /// # Errors
    /// Returns `FragSqlError::PoolUnavailable` if the pool times out or cannot
    /// open a new connection.
    pub(crate) async fn get_connection(&self) -> Result<LeasedConnection, FragSqlError> {
        match self {
            #[cfg(feature = "postgres")]
            MiddlewarePool::Postgres(pool) => postgres::get_connection(pool).await,
            #[cfg(feature = "sqlite")]
            MiddlewarePool::Sqlite(pool) => sqlite::get_connection(pool).await,
        }
    }
}

impl LeasedConnection {
    fn driver(&mut self) -> &mut dyn DriverConnection {
        match self {
            #[cfg(feature = "postgres")]
            LeasedConnection::Postgres(conn) => &mut **conn,
            #[cfg(feature = "sqlite")]
            LeasedConnection::Sqlite(conn) => &mut **conn,
        }
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            LeasedConnection::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            LeasedConnection::Sqlite(_) => DatabaseType::Sqlite,
        }
    }

    /// Start composing a statement that will run on this connection.
    pub fn builder(&mut self) -> FragmentBuilder<'_> {
        FragmentBuilder::new(self)
    }

    /// Run a fragment and return every row.
    ///
    /// # Errors
    /// Returns `FragSqlError::QueryError` if the driver rejects the statement.
    pub async fn query(&mut self, fragment: impl Into<Fragment> + Send) -> Result<ResultSet, FragSqlError> {
        let fragment = fragment.into();
        executor::execute(self.driver(), &fragment).await
    }

    /// Run a fragment and return its first row, or `None` when it yields none.
    ///
    /// # Errors
    /// Returns `FragSqlError::QueryError` if the driver rejects the statement.
    pub async fn query_single(
        &mut self,
        fragment: impl Into<Fragment> + Send,
    ) -> Result<Option<CustomDbRow>, FragSqlError> {
        let fragment = fragment.into();
        executor::execute_single(self.driver(), &fragment).await
    }

    /// Run a parameterless script of one or more statements.
    ///
    /// # Errors
    /// Returns `FragSqlError::QueryError` if any statement fails.
    pub async fn execute_batch(&mut self, sql: &str) -> Result<(), FragSqlError> {
        tracing::trace!(sql = %sql, "executing batch");
        self.driver().execute_batch(sql).await
    }
}

#[async_trait]
impl DriverConnection for LeasedConnection {
    fn placeholder_style(&self) -> PlaceholderStyle {
        match self {
            #[cfg(feature = "postgres")]
            LeasedConnection::Postgres(conn) => conn.placeholder_style(),
            #[cfg(feature = "sqlite")]
            LeasedConnection::Sqlite(conn) => conn.placeholder_style(),
        }
    }

    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, FragSqlError> {
        self.driver().query(sql, params).await
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), FragSqlError> {
        self.driver().execute_batch(sql).await
    }

    async fn begin_transaction(&mut self) -> Result<(), FragSqlError> {
        self.driver().begin_transaction().await
    }

    async fn commit(&mut self) -> Result<(), FragSqlError> {
        self.driver().commit().await
    }

    async fn rollback(&mut self) -> Result<(), FragSqlError> {
        self.driver().rollback().await
    }
}

#[async_trait]
impl FragmentExecutor for LeasedConnection {
    async fn run_fragment(&mut self, fragment: &Fragment) -> Result<ResultSet, FragSqlError> {
        executor::execute(self.driver(), fragment).await
    }
}
