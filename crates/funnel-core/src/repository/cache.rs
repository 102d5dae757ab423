//! Execution snapshot cache port.
//!
//! The engine writes the latest `ExecutionContext` under
//! `execution:{id}` after each meaningful transition. The infrastructure
//! layer provides in-memory and SQLite implementations.

use funnel_types::execution::ExecutionContext;

/// Errors raised by cache backends. The engine logs and swallows them.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Key/value store for execution snapshots.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ExecutionCache: Send + Sync {
    /// Latest snapshot under `key`, or `None` when absent or expired.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<ExecutionContext>, CacheError>> + Send;

    /// Store `context` under `key` for `ttl_secs` seconds.
    fn set(
        &self,
        key: &str,
        context: &ExecutionContext,
        ttl_secs: u64,
    ) -> impl std::future::Future<Output = Result<(), CacheError>> + Send;
}
