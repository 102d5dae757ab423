use thiserror::Error;

use crate::execution::ExecutionStatus;
use crate::funnel::NodeType;

/// A node's configuration could not be read as the shape its type expects.
#[derive(Debug, Clone, Error)]
#[error("invalid config for node '{node_id}' ({node_type}): {message}")]
pub struct NodeConfigError {
    pub node_id: String,
    pub node_type: NodeType,
    pub message: String,
}

/// An execution status change that would break the lifecycle ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal execution status transition: {from} -> {to}")]
pub struct StatusTransitionError {
    pub from: ExecutionStatus,
    pub to: ExecutionStatus,
}

/// Errors loading or interpreting engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: String, message: String },
}
