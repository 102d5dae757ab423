//! `MetricsSink` implementations.

use std::sync::atomic::{AtomicU64, Ordering};

use funnel_core::metrics::MetricsSink;
use funnel_types::execution::{ExecutionContext, ExecutionStatus};

/// Emits one structured `tracing` event per finished run.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record_execution(&self, context: &ExecutionContext) {
        tracing::info!(
            target: "funnel::metrics",
            execution_id = %context.id,
            funnel_id = context.funnel_id.as_str(),
            status = %context.status,
            duration_ms = context.duration_ms(),
            errors = context.errors.len(),
            "execution recorded"
        );
    }

    fn record_execution_error(&self, context: &ExecutionContext, error: &str) {
        tracing::warn!(
            target: "funnel::metrics",
            execution_id = %context.id,
            funnel_id = context.funnel_id.as_str(),
            duration_ms = context.duration_ms(),
            error,
            "execution failure recorded"
        );
    }
}

/// Process-local counters.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    completed: AtomicU64,
    cancelled: AtomicU64,
    failed: AtomicU64,
    total_duration_ms: AtomicU64,
}

/// Point-in-time copy of [`InMemoryMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub completed: u64,
    pub cancelled: u64,
    pub failed: u64,
    pub total_duration_ms: u64,
}

impl MetricsSnapshot {
    pub fn total(&self) -> u64 {
        self.completed + self.cancelled + self.failed
    }

    pub fn average_duration_ms(&self) -> Option<u64> {
        self.total_duration_ms.checked_div(self.total())
    }
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            total_duration_ms: self.total_duration_ms.load(Ordering::Relaxed),
        }
    }

    fn add_duration(&self, context: &ExecutionContext) {
        let ms = u64::try_from(context.duration_ms()).unwrap_or(0);
        self.total_duration_ms.fetch_add(ms, Ordering::Relaxed);
    }
}

impl MetricsSink for InMemoryMetrics {
    fn record_execution(&self, context: &ExecutionContext) {
        let counter = match context.status {
            ExecutionStatus::Cancelled => &self.cancelled,
            ExecutionStatus::Failed => &self.failed,
            _ => &self.completed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.add_duration(context);
    }

    fn record_execution_error(&self, context: &ExecutionContext, _error: &str) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.add_duration(context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn finished(status: ExecutionStatus) -> ExecutionContext {
        let mut ctx = ExecutionContext::new("welcome", None, HashMap::new());
        ctx.transition(ExecutionStatus::Running).unwrap();
        ctx.transition(status).unwrap();
        ctx
    }

    #[test]
    fn test_counts_by_outcome() {
        let metrics = InMemoryMetrics::new();
        metrics.record_execution(&finished(ExecutionStatus::Completed));
        metrics.record_execution(&finished(ExecutionStatus::Completed));
        metrics.record_execution(&finished(ExecutionStatus::Cancelled));
        metrics.record_execution_error(&finished(ExecutionStatus::Failed), "boom");

        let snap = metrics.snapshot();
        assert_eq!(snap.completed, 2);
        assert_eq!(snap.cancelled, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.total(), 4);
        assert!(snap.average_duration_ms().is_some());
    }

    #[test]
    fn test_empty_snapshot_has_no_average() {
        assert_eq!(InMemoryMetrics::new().snapshot().average_duration_ms(), None);
    }

    #[test]
    fn test_tracing_sink_accepts_events() {
        let sink = TracingMetricsSink;
        sink.record_execution(&finished(ExecutionStatus::Completed));
        sink.record_execution_error(&finished(ExecutionStatus::Failed), "boom");
    }
}
