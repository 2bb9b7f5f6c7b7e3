use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bb8::{ManageConnection, Pool};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::database::Database;
use crate::error::FragSqlError;
use crate::pool::{DEFAULT_CONNECTION_TIMEOUT, DEFAULT_MAX_CONNECTIONS, MiddlewarePool};
use crate::types::DatabaseType;

use super::executor::run_blocking;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A rusqlite connection shared with the blocking task that drives it.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// Options for configuring a `SQLite` pool.
///
/// Deserializable so it can sit in an application's config file; only
/// `db_path` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteOptions {
    pub db_path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: Duration,
    /// Put the database in WAL mode on connect.
    #[serde(default = "default_wal")]
    pub wal: bool,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_connection_timeout() -> Duration {
    DEFAULT_CONNECTION_TIMEOUT
}

fn default_wal() -> bool {
    true
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            wal: true,
        }
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.opts.max_connections = max_connections;
        self
    }

    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.opts.connection_timeout = timeout;
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Open a [`Database`] with these options.
    ///
    /// # Errors
    /// Returns `FragSqlError` if pool creation or the initial connection fails.
    pub async fn build(self) -> Result<Database, FragSqlError> {
        Database::open_sqlite(self.finish()).await
    }
}

/// Pooled `SQLite` connection plus the transaction flag the pool checks on return.
pub struct SqliteManagedConnection {
    conn: SharedSqliteConnection,
    pub(crate) in_transaction: bool,
    /// Make every rollback fail with `SQLITE_BUSY`.
    #[cfg(test)]
    pub(crate) force_rollback_busy: bool,
}

impl SqliteManagedConnection {
    pub(crate) fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            in_transaction: false,
            #[cfg(test)]
            force_rollback_busy: false,
        }
    }

    pub(crate) fn handle(&self) -> SharedSqliteConnection {
        Arc::clone(&self.conn)
    }
}

impl fmt::Debug for SqliteManagedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteManagedConnection")
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}

/// bb8 manager for `SQLite` connections.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    db_path: String,
    wal: bool,
}

impl SqliteManager {
    #[must_use]
    pub fn new(db_path: impl Into<String>, wal: bool) -> Self {
        Self {
            db_path: db_path.into(),
            wal,
        }
    }

    /// Build a pool from this manager.
    ///
    /// # Errors
    /// Returns `FragSqlError::ConnectionError` if pool creation fails.
    pub async fn build_pool(
        self,
        max_connections: u32,
        connection_timeout: Duration,
    ) -> Result<Pool<SqliteManager>, FragSqlError> {
        Pool::builder()
            .max_size(max_connections)
            .connection_timeout(connection_timeout)
            .build(self)
            .await
            .map_err(|e| FragSqlError::ConnectionError(format!("sqlite pool error: {e}")))
    }
}

fn open_connection(db_path: &str, wal: bool) -> Result<rusqlite::Connection, FragSqlError> {
    let conn = rusqlite::Connection::open(db_path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if wal {
        apply_wal_pragma(&conn)?;
    }
    Ok(conn)
}

/// `journal_mode` answers with a row, so it is read rather than executed.
fn apply_wal_pragma(conn: &rusqlite::Connection) -> Result<(), FragSqlError> {
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    Ok(())
}

impl ManageConnection for SqliteManager {
    type Connection = SqliteManagedConnection;
    type Error = FragSqlError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let db_path = self.db_path.clone();
        let wal = self.wal;
        async move {
            tracing::debug!(db_path = %db_path, "opening sqlite connection");
            let conn = tokio::task::spawn_blocking(move || open_connection(&db_path, wal))
                .await
                .map_err(|e| {
                    FragSqlError::ConnectionError(format!("sqlite open join error: {e}"))
                })??;
            Ok(SqliteManagedConnection::new(conn))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let handle = conn.handle();
        async move {
            run_blocking(handle, |guard| {
                guard.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await
        }
    }

    /// A connection handed back mid-transaction is never reused.
    ///
    /// Besides the flag set by our own `begin`, this catches a `BEGIN` issued
    /// through `execute_batch`, and a blocking task still holding the handle.
    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        if conn.in_transaction {
            return true;
        }
        match conn.conn.try_lock() {
            Ok(guard) => !guard.is_autocommit(),
            Err(_) => true,
        }
    }
}

impl Database {
    #[must_use]
    pub fn sqlite_builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Open a `SQLite`-backed database.
    ///
    /// One connection is leased and returned straight away so a bad path or
    /// unreadable file fails here rather than on the first query.
    ///
    /// # Errors
    /// Returns `FragSqlError::ConnectionError` or `FragSqlError::PoolUnavailable`
    /// if the pool cannot be created or the first connection cannot be opened.
    pub async fn open_sqlite(opts: SqliteOptions) -> Result<Self, FragSqlError> {
        if opts.max_connections == 0 {
            return Err(FragSqlError::ConfigError(
                "max_connections must be at least 1".into(),
            ));
        }

        let pool = SqliteManager::new(opts.db_path.clone(), opts.wal)
            .build_pool(opts.max_connections, opts.connection_timeout)
            .await?;

        {
            let _smoke = pool.get().await?;
        }

        tracing::debug!(
            db_path = %opts.db_path,
            max_connections = opts.max_connections,
            "sqlite pool opened"
        );
        Ok(Database::from_pool(
            MiddlewarePool::Sqlite(pool),
            DatabaseType::Sqlite,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: SqliteOptions =
            serde_json::from_str(r#"{"db_path": "app.db", "wal": false}"#).expect("valid options");
        assert_eq!(opts.db_path, "app.db");
        assert!(!opts.wal);
        assert_eq!(opts.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(opts.connection_timeout, DEFAULT_CONNECTION_TIMEOUT);
    }

    #[test]
    fn builder_overrides() {
        let opts = SqliteOptionsBuilder::new("x.db")
            .max_connections(2)
            .connection_timeout(Duration::from_millis(250))
            .wal(false)
            .finish();
        assert_eq!(opts.max_connections, 2);
        assert_eq!(opts.connection_timeout, Duration::from_millis(250));
        assert!(!opts.wal);
    }

    #[tokio::test]
    async fn open_transaction_marks_connection_broken() -> Result<(), FragSqlError> {
        let manager = SqliteManager::new(":memory:", false);
        let mut conn = manager.connect().await?;
        assert!(!manager.has_broken(&mut conn));

        run_blocking(conn.handle(), |guard| {
            guard.execute_batch("BEGIN")?;
            Ok(())
        })
        .await?;
        assert!(!conn.in_transaction);
        assert!(manager.has_broken(&mut conn));

        run_blocking(conn.handle(), |guard| {
            guard.execute_batch("ROLLBACK")?;
            Ok(())
        })
        .await?;
        assert!(!manager.has_broken(&mut conn));

        let handle = conn.handle();
        let _held = handle.lock().await;
        assert!(manager.has_broken(&mut conn));
        Ok(())
    }

    #[tokio::test]
    async fn zero_connections_is_a_config_error() {
        let err = Database::open_sqlite(SqliteOptions {
            max_connections: 0,
            ..SqliteOptions::new(":memory:")
        })
        .await
        .unwrap_err();
        assert!(matches!(err, FragSqlError::ConfigError(_)));
    }
}
