//! SQLite persistence for execution snapshots.

pub mod execution;
pub mod pool;

pub use execution::SqliteExecutionCache;
pub use pool::{DatabasePool, default_database_url};
