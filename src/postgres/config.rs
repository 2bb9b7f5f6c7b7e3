use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use bb8::{ManageConnection, Pool};
use tokio_postgres::{Client, NoTls};

use crate::database::Database;
use crate::error::FragSqlError;
use crate::pool::{DEFAULT_CONNECTION_TIMEOUT, DEFAULT_MAX_CONNECTIONS, MiddlewarePool};
use crate::types::DatabaseType;

/// Options for configuring a Postgres pool.
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    pub config: tokio_postgres::Config,
    pub max_connections: u32,
    pub connection_timeout: Duration,
}

impl PostgresOptions {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self {
            config,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }

    /// Parse a `postgres://` URL or `key=value` connection string.
    ///
    /// # Errors
    /// Returns `FragSqlError::ConfigError` if the string does not parse.
    pub fn from_url(url: &str) -> Result<Self, FragSqlError> {
        tokio_postgres::Config::from_str(url)
            .map(Self::new)
            .map_err(|e| FragSqlError::ConfigError(format!("invalid postgres url: {e}")))
    }

    /// Check that the fields a pool cannot do without are present.
    ///
    /// # Errors
    /// Returns `FragSqlError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), FragSqlError> {
        if self.config.get_dbname().is_none() {
            return Err(FragSqlError::ConfigError("dbname is required".to_string()));
        }
        if self.config.get_hosts().is_empty() {
            return Err(FragSqlError::ConfigError("host is required".to_string()));
        }
        if self.config.get_user().is_none() {
            return Err(FragSqlError::ConfigError("user is required".to_string()));
        }
        if self.max_connections == 0 {
            return Err(FragSqlError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for Postgres options.
#[derive(Debug, Clone)]
pub struct PostgresOptionsBuilder {
    opts: PostgresOptions,
}

impl PostgresOptionsBuilder {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self {
            opts: PostgresOptions::new(config),
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
    pub fn finish(self) -> PostgresOptions {
        self.opts
    }

    /// Open a [`Database`] with these options.
    ///
    /// # Errors
    /// Returns `FragSqlError` if validation, pool creation or the first
    /// connection fails.
    pub async fn build(self) -> Result<Database, FragSqlError> {
        Database::open_postgres(self.finish()).await
    }
}

/// Pooled Postgres client plus the transaction flag the pool checks on return.
pub struct PgManagedConnection {
    pub(crate) client: Client,
    pub(crate) in_transaction: bool,
}

impl fmt::Debug for PgManagedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgManagedConnection")
            .field("in_transaction", &self.in_transaction)
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

/// bb8 manager for Postgres clients.
#[derive(Debug, Clone)]
pub struct PgManager {
    config: tokio_postgres::Config,
}

impl PgManager {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self { config }
    }

    /// Build a pool from this manager.
    ///
    /// # Errors
    /// Returns `FragSqlError::ConnectionError` if pool creation fails.
    pub async fn build_pool(
        self,
        max_connections: u32,
        connection_timeout: Duration,
    ) -> Result<Pool<PgManager>, FragSqlError> {
        Pool::builder()
            .max_size(max_connections)
            .connection_timeout(connection_timeout)
            .build(self)
            .await
            .map_err(|e| FragSqlError::ConnectionError(format!("postgres pool error: {e}")))
    }
}

impl ManageConnection for PgManager {
    type Connection = PgManagedConnection;
    type Error = tokio_postgres::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let cfg = self.config.clone();
        async move {
            tracing::debug!(
                hosts = ?cfg.get_hosts(),
                db = ?cfg.get_dbname(),
                user = ?cfg.get_user(),
                "postgres connect start"
            );
            let (client, connection) = cfg.connect(NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!(error = %e, "postgres connection task ended with error");
                }
            });
            Ok(PgManagedConnection {
                client,
                in_transaction: false,
            })
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move { conn.client.simple_query("SELECT 1").await.map(|_| ()) }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.in_transaction || conn.client.is_closed()
    }
}

impl Database {
    #[must_use]
    pub fn postgres_builder(config: tokio_postgres::Config) -> PostgresOptionsBuilder {
        PostgresOptionsBuilder::new(config)
    }

    /// Open a Postgres-backed database.
    ///
    /// # Errors
    /// Returns `FragSqlError::ConfigError` if required fields are missing, or
    /// `FragSqlError::ConnectionError` / `FragSqlError::PoolUnavailable` if the
    /// server cannot be reached.
    pub async fn open_postgres(opts: PostgresOptions) -> Result<Self, FragSqlError> {
        opts.validate()?;

        let pool = PgManager::new(opts.config.clone())
            .build_pool(opts.max_connections, opts.connection_timeout)
            .await?;

        {
            let _smoke = pool.get().await?;
        }

        tracing::debug!(
            db = ?opts.config.get_dbname(),
            max_connections = opts.max_connections,
            "postgres pool opened"
        );
        Ok(Database::from_pool(
            MiddlewarePool::Postgres(pool),
            DatabaseType::Postgres,
        ))
    }
}
