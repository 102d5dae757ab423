use funnel_types::funnel::NodeType;
use uuid::Uuid;

/// Errors raised while interpreting a funnel.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The funnel has no trigger node and every node has an incoming edge.
    #[error("funnel '{funnel_id}' has no entry node")]
    NoEntryNode { funnel_id: String },

    /// No executor is registered for the node's type.
    #[error("no executor registered for node type '{node_type}' (node '{node_id}')")]
    NoExecutor { node_id: String, node_type: NodeType },

    /// The node's executor reported failure.
    #[error("node '{node_id}' failed: {message}")]
    NodeFailed { node_id: String, message: String },

    /// The whole run exceeded its time budget.
    #[error("execution timed out after {0} ms")]
    Timeout(u64),

    #[error("execution {0} is already active")]
    AlreadyActive(Uuid),
}

impl EngineError {
    /// Only executor-reported failures can succeed on a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::NodeFailed { .. })
    }
}
