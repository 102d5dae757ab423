//! Funnel interpretation: the engine, its run registry, and retry policy.

pub mod error;
pub mod manager;
pub mod retry;
pub mod runner;

pub use error::EngineError;
pub use manager::{ActiveExecutionInfo, ExecutionManager};
pub use retry::RetryPolicy;
pub use runner::ExecutionEngine;
