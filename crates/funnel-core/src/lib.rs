//! Funnel execution engine and the port traits it runs against.
//!
//! This crate holds the interpreter, the node executors, and the traits
//! (`ExecutionCache`, `MetricsSink`, the delivery ports) that the
//! infrastructure layer implements. It depends only on `funnel-types`,
//! never on `funnel-infra` or any network or database crate.

pub mod condition;
pub mod delivery;
pub mod engine;
pub mod executor;
pub mod funnel;
pub mod interpolate;
pub mod metrics;
pub mod repository;
pub mod variables;
