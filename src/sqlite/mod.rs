// SQLite backend
//
// - config: options, the bb8 manager and `Database::open_sqlite`
// - params: conversion from `RowValues` to rusqlite values
// - query: result set extraction
// - executor: blocking-task execution and transaction statements

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{
    SharedSqliteConnection, SqliteManagedConnection, SqliteManager, SqliteOptions,
    SqliteOptionsBuilder,
};
pub use query::build_result_set;
