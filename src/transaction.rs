//! Transactions with exactly-once finalization.
//!
//! A [`TransactionHandle`] starts `Active` and moves to `Committed` or
//! `RolledBack` exactly once. Later `commit`/`rollback` calls are no-ops, and
//! statements issued after finalization fail with
//! [`FragSqlError::TransactionAlreadyFinalized`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::error::FragSqlError;
use crate::executor::{self, DriverConnection};
use crate::fragment::{Fragment, FragmentBuilder, FragmentExecutor};
use crate::pool::LeasedConnection;
use crate::results::{CustomDbRow, ResultSet};

/// Boxed, sendable future borrowing from its caller for `'a`.
///
/// Callbacks passed to [`Database::transaction`](crate::Database::transaction)
/// and [`Database::with_connection`](crate::Database::with_connection) return
/// one of these, typically via `Box::pin(async move { .. })`.
pub type BoxedFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxState {
    Active,
    Committed,
    RolledBack,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TxState::Active => "active",
            TxState::Committed => "committed",
            TxState::RolledBack => "rolled back",
        })
    }
}

/// An open transaction on one leased connection.
pub struct TransactionHandle {
    conn: Option<LeasedConnection>,
    state: TxState,
}

impl TransactionHandle {
    /// Issue the driver's begin on `conn` and wrap it.
    ///
    /// # Errors
    /// Returns `FragSqlError::QueryError` if the driver refuses to begin.
    pub(crate) async fn begin(mut conn: LeasedConnection) -> Result<Self, FragSqlError> {
        conn.begin_transaction().await?;
        tracing::debug!(db_type = ?conn.database_type(), "transaction begun");
        Ok(Self {
            conn: Some(conn),
            state: TxState::Active,
        })
    }

    #[must_use]
    pub fn state(&self) -> TxState {
        self.state
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.state != TxState::Active
    }

    fn active_conn(&mut self) -> Result<&mut LeasedConnection, FragSqlError> {
        match (self.state, self.conn.as_mut()) {
            (TxState::Active, Some(conn)) => Ok(conn),
            (state, _) => Err(FragSqlError::TransactionAlreadyFinalized(state)),
        }
    }

    /// Start composing a statement that will run inside this transaction.
    pub fn builder(&mut self) -> FragmentBuilder<'_> {
        FragmentBuilder::new(self)
    }

    /// Run a fragment inside the transaction and return every row.
    ///
    /// # Errors
    /// Returns `FragSqlError::TransactionAlreadyFinalized` once committed or
    /// rolled back, or `FragSqlError::QueryError` from the driver.
    pub async fn query(&mut self, fragment: impl Into<Fragment> + Send) -> Result<ResultSet, FragSqlError> {
        let fragment = fragment.into();
        let conn = self.active_conn()?;
        executor::execute(conn, &fragment).await
    }

    /// Run a fragment inside the transaction and return its first row.
    ///
    /// # Errors
    /// Same as [`query`](Self::query).
    pub async fn query_single(
        &mut self,
        fragment: impl Into<Fragment> + Send,
    ) -> Result<Option<CustomDbRow>, FragSqlError> {
        let fragment = fragment.into();
        let conn = self.active_conn()?;
        executor::execute_single(conn, &fragment).await
    }

    /// Run a parameterless script inside the transaction.
    ///
    /// # Errors
    /// Same as [`query`](Self::query).
    pub async fn execute_batch(&mut self, sql: &str) -> Result<(), FragSqlError> {
        let conn = self.active_conn()?;
        conn.execute_batch(sql).await
    }

    /// Commit the transaction. A no-op once finalized.
    ///
    /// If the driver's commit fails, a rollback is attempted, the transaction
    /// ends up `RolledBack` and the commit error is returned.
    ///
    /// # Errors
    /// Returns `FragSqlError::QueryError` if the commit fails.
    pub async fn commit(&mut self) -> Result<(), FragSqlError> {
        if self.is_finalized() {
            return Ok(());
        }
        let Some(conn) = self.conn.as_mut() else {
            return Ok(());
        };
        match conn.commit().await {
            Ok(()) => {
                self.state = TxState::Committed;
                tracing::debug!("transaction committed");
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = conn.rollback().await {
                    tracing::warn!(
                        error = %rollback_err,
                        "rollback after failed commit also failed"
                    );
                }
                self.state = TxState::RolledBack;
                Err(err)
            }
        }
    }

    /// Roll the transaction back. A no-op once finalized.
    ///
    /// The transaction counts as rolled back even if the driver call fails; the
    /// connection is then discarded by the pool instead of being reused.
    ///
    /// # Errors
    /// Returns `FragSqlError::QueryError` if the driver's rollback fails.
    pub async fn rollback(&mut self) -> Result<(), FragSqlError> {
        if self.is_finalized() {
            return Ok(());
        }
        self.state = TxState::RolledBack;
        let Some(conn) = self.conn.as_mut() else {
            return Ok(());
        };
        conn.rollback().await?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }

    /// Apply the automatic outcome for a finished callback.
    ///
    /// `Ok` commits, `Err` rolls back, unless the callback already finalized.
    /// A failed automatic rollback is logged and the callback's error wins.
    pub(crate) async fn finish<T, E>(mut self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<FragSqlError>,
    {
        match outcome {
            Ok(value) => {
                self.commit().await.map_err(E::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::warn!(error = %rollback_err, "automatic rollback failed");
                }
                Err(err)
            }
        }
    }
}

impl fmt::Debug for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("state", &self.state)
            .field("conn", &self.conn)
            .finish()
    }
}

#[async_trait]
impl FragmentExecutor for TransactionHandle {
    async fn run_fragment(&mut self, fragment: &Fragment) -> Result<ResultSet, FragSqlError> {
        let conn = self.active_conn()?;
        executor::execute(conn, fragment).await
    }
}

impl Drop for TransactionHandle {
    /// Dropped while still active (panic or cancellation): roll back on the
    /// runtime if there is one. Without a runtime the connection goes back
    /// still flagged as in a transaction and the pool discards it.
    fn drop(&mut self) {
        if self.is_finalized() {
            return;
        }
        self.state = TxState::RolledBack;
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = conn.rollback().await {
                        tracing::warn!(error = %e, "rollback of abandoned transaction failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!("transaction dropped outside a runtime; discarding connection");
            }
        }
    }
}
