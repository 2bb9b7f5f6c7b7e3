use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::connection::LeasedConnection;
use super::types::{MiddlewarePool, PoolState};
use crate::error::FragSqlError;

/// Hands out leases from a pool, refusing once the owning database is closed.
///
/// Clones share the closed flag, so closing through one handle closes them all.
#[derive(Clone, Debug)]
pub struct PoolSession {
    pool: MiddlewarePool,
    closed: Arc<AtomicBool>,
}

impl PoolSession {
    pub(crate) fn new(pool: MiddlewarePool) -> Self {
        Self {
            pool,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Lease a connection. It returns to the pool when the lease is dropped.
    ///
    /// # Errors
    /// Returns `FragSqlError::PoolClosed` after [`close`](Self::close), or
    /// `FragSqlError::PoolUnavailable` if no connection could be had in time.
    pub async fn acquire(&self) -> Result<LeasedConnection, FragSqlError> {
        if self.is_closed() {
            return Err(FragSqlError::PoolClosed);
        }
        let conn = self.pool.get_connection().await?;
        tracing::debug!(db_type = ?conn.database_type(), "connection leased");
        Ok(conn)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn state(&self) -> PoolState {
        self.pool.state()
    }

    #[must_use]
    pub fn pool(&self) -> &MiddlewarePool {
        &self.pool
    }
}
