//! Shared domain types for the funnel execution engine.
//!
//! This crate contains the types every other layer speaks: funnel
//! definitions, typed node configs, execution records, action results and
//! engine configuration, plus their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod action;
pub mod config;
pub mod error;
pub mod execution;
pub mod funnel;
pub mod node_config;
