//! Connection pools and the leases taken from them.
//!
//! `PoolSession` is the only code that asks a pool for a connection; a lease
//! goes back to its pool when the [`LeasedConnection`] is dropped.

use std::time::Duration;

pub mod connection;
pub mod session;
pub mod types;

pub use connection::LeasedConnection;
pub use session::PoolSession;
pub use types::{MiddlewarePool, PoolState};

/// Pool size used when options do not say otherwise.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// How long an acquire waits for a free connection before giving up.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);
