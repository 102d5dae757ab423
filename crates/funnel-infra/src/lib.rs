//! Infrastructure layer for the funnel engine.
//!
//! Implements the ports defined in `funnel-core`: HTTP delivery backends
//! (reqwest), in-memory and SQLite execution snapshot caches, metrics sinks,
//! and the TOML/environment configuration loader.

pub mod cache;
pub mod config;
pub mod delivery;
pub mod metrics;
pub mod sqlite;
