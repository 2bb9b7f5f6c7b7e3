//! Composable SQL fragments over pooled async connections.
//!
//! Statements are built as [`Fragment`]s (literal text with bound values kept
//! apart), run through a [`Database`] that leases a connection per operation,
//! and grouped into transactions that commit or roll back exactly once.
//!
//! ```rust,no_run
//! use fragsql::prelude::*;
//!
//! # async fn demo() -> Result<(), FragSqlError> {
//! let db = Database::sqlite_builder("app.db").build().await?;
//! db.execute_batch("CREATE TABLE IF NOT EXISTS people (name TEXT)").await?;
//!
//! let name = "Bill";
//! db.query(sql!("INSERT INTO people (name) VALUES (" {name} ")")).await?;
//!
//! let rows = db.query(sql!("SELECT name FROM people WHERE name = " {name})).await?;
//! assert_eq!(rows.len(), 1);
//! # Ok(()) }
//! ```

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("enable at least one backend feature: `sqlite` or `postgres`");

pub mod database;
pub mod error;
pub mod executor;
pub mod fragment;
pub mod pool;
pub mod prelude;
pub mod query;
pub mod results;
pub mod transaction;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use database::Database;
pub use error::{DriverError, FragSqlError};
pub use executor::{DriverConnection, execute, execute_single};
pub use fragment::{Fragment, FragmentBuilder, FragmentExecutor, PlaceholderStyle};
pub use pool::{LeasedConnection, MiddlewarePool, PoolSession, PoolState};
pub use query::QueryAndParams;
pub use results::{CustomDbRow, ResultSet};
pub use transaction::{BoxedFuture, TransactionHandle, TxState};
pub use types::{DatabaseType, RowValues};
