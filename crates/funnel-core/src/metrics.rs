//! Execution metrics port.

use funnel_types::execution::ExecutionContext;

/// Fire-and-forget run outcome reporting.
///
/// Called once per run as it ends: `record_execution` for completed and
/// cancelled runs, `record_execution_error` for failed ones. Implementations
/// must not block.
pub trait MetricsSink: Send + Sync {
    fn record_execution(&self, context: &ExecutionContext);

    fn record_execution_error(&self, context: &ExecutionContext, error: &str);
}

