#[cfg(feature = "postgres")]
use crate::postgres::PgManager;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteManager;

use crate::types::DatabaseType;

/// Connection pool for database access
///
/// Cloning is cheap: clones share the same underlying bb8 pool.
#[derive(Clone)]
pub enum MiddlewarePool {
    /// `PostgreSQL` connection pool
    #[cfg(feature = "postgres")]
    Postgres(bb8::Pool<PgManager>),
    /// `SQLite` connection pool
    #[cfg(feature = "sqlite")]
    Sqlite(bb8::Pool<SqliteManager>),
}

impl std::fmt::Debug for MiddlewarePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(pool) => f.debug_tuple("Postgres").field(&pool.state()).finish(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => f.debug_tuple("Sqlite").field(&pool.state()).finish(),
        }
    }
}

/// Snapshot of how many connections a pool holds and how many are idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    pub connections: u32,
    pub idle_connections: u32,
}

impl From<bb8::State> for PoolState {
    fn from(state: bb8::State) -> Self {
        Self {
            connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }
}

impl MiddlewarePool {
    #[must_use]
    pub fn state(&self) -> PoolState {
        match self {
            #[cfg(feature = "postgres")]
            MiddlewarePool::Postgres(pool) => pool.state().into(),
            #[cfg(feature = "sqlite")]
            MiddlewarePool::Sqlite(pool) => pool.state().into(),
        }
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            MiddlewarePool::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            MiddlewarePool::Sqlite(_) => DatabaseType::Sqlite,
        }
    }
}
