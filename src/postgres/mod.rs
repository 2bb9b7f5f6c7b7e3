// PostgreSQL backend
//
// - config: options, the bb8 manager and `Database::open_postgres`
// - params: `ToSql` for `RowValues`
// - query: result set extraction
// - executor: statement execution and transaction statements

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{
    PgManagedConnection, PgManager, PostgresOptions, PostgresOptionsBuilder,
};
pub use params::Params;
pub use query::build_result_set;
