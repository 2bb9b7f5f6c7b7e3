//! Convenient imports for common functionality.
//!
//! `use fragsql::prelude::*;` brings in the database handle, fragments and the
//! `sql!` macro, result types and the error type.

pub use crate::sql;
pub use crate::{
    BoxedFuture, CustomDbRow, Database, DatabaseType, FragSqlError, Fragment, FragmentBuilder,
    LeasedConnection, PlaceholderStyle, PoolState, QueryAndParams, ResultSet, RowValues,
    TransactionHandle, TxState,
};

#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresOptions, PostgresOptionsBuilder};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteOptions, SqliteOptionsBuilder};
