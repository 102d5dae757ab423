//! Execution records.
//!
//! An `ExecutionContext` is the full state of one funnel run: lifecycle
//! status, the variable bag nodes read and write, and append-only audit
//! trails of log entries and errors. The engine is its only writer.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::StatusTransitionError;

/// Cache key prefix for persisted execution snapshots.
pub const EXECUTION_KEY_PREFIX: &str = "execution:";

/// Build the cache key for an execution ID (`execution:{id}`).
pub fn execution_cache_key(id: &Uuid) -> String {
    format!("{EXECUTION_KEY_PREFIX}{id}")
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a run.
///
/// Moves strictly forward: `Pending -> Running -> {Completed | Failed |
/// Cancelled}`. Every terminal state is reached through `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    /// Whether moving from `self` to `next` respects the lifecycle ordering.
    pub fn can_transition_to(self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Log & error entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// One audit entry in an execution's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// One recorded failure. `node_id` is `None` for context-level errors
/// (no entry node, timeout).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionError {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub is_retryable: bool,
}

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

/// The state of one funnel run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub id: Uuid,
    pub funnel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<String>,
    pub status: ExecutionStatus,
    /// Variable bag. Merge-only within a run: keys are added or overwritten,
    /// never removed.
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node_id: Option<String>,
    #[serde(default)]
    pub logs: Vec<ExecutionLog>,
    #[serde(default)]
    pub errors: Vec<ExecutionError>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl ExecutionContext {
    /// A fresh `Pending` context with a time-ordered ID.
    pub fn new(
        funnel_id: impl Into<String>,
        trigger_id: Option<String>,
        variables: HashMap<String, Value>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            funnel_id: funnel_id.into(),
            trigger_id,
            status: ExecutionStatus::Pending,
            variables,
            current_node_id: None,
            logs: Vec::new(),
            errors: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
            metadata: HashMap::new(),
        }
    }

    pub fn cache_key(&self) -> String {
        execution_cache_key(&self.id)
    }

    pub fn is_running(&self) -> bool {
        self.status == ExecutionStatus::Running
    }

    /// Move to `next`, refusing transitions out of a terminal state or
    /// backwards. Terminal transitions stamp `ended_at`.
    pub fn transition(&mut self, next: ExecutionStatus) -> Result<(), StatusTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(StatusTransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Shallow-merge `vars` on top of the variable bag.
    pub fn merge_variables(&mut self, vars: HashMap<String, Value>) {
        self.variables.extend(vars);
    }

    pub fn log(
        &mut self,
        level: LogLevel,
        node_id: Option<&str>,
        message: impl Into<String>,
        data: Option<Value>,
    ) {
        self.logs.push(ExecutionLog {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            level,
            node_id: node_id.map(str::to_string),
            message: message.into(),
            data,
        });
    }

    pub fn record_error(
        &mut self,
        node_id: Option<&str>,
        message: impl Into<String>,
        stack: Option<String>,
        is_retryable: bool,
    ) {
        self.errors.push(ExecutionError {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            node_id: node_id.map(str::to_string),
            message: message.into(),
            stack,
            is_retryable,
        });
    }

    /// Number of errors recorded against `node_id` so far in this run.
    pub fn errors_for_node(&self, node_id: &str) -> usize {
        self.errors
            .iter()
            .filter(|e| e.node_id.as_deref() == Some(node_id))
            .count()
    }

    /// Wall-clock duration in milliseconds, up to `ended_at` or now.
    pub fn duration_ms(&self) -> i64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("funnel-1", None, HashMap::new())
    }

    #[test]
    fn test_status_moves_forward_only() {
        let mut c = ctx();
        c.transition(ExecutionStatus::Running).unwrap();
        c.transition(ExecutionStatus::Completed).unwrap();
        assert!(c.ended_at.is_some());

        let err = c.transition(ExecutionStatus::Running).unwrap_err();
        assert_eq!(err.from, ExecutionStatus::Completed);
        assert!(c.transition(ExecutionStatus::Failed).is_err());
        assert_eq!(c.status, ExecutionStatus::Completed);
    }

    #[test]
    fn test_pending_cannot_skip_running() {
        for terminal in [ExecutionStatus::Completed, ExecutionStatus::Failed, ExecutionStatus::Cancelled] {
            let mut c = ctx();
            let err = c.transition(terminal).unwrap_err();
            assert_eq!(err.from, ExecutionStatus::Pending);
            assert_eq!(c.status, ExecutionStatus::Pending);
            assert!(c.ended_at.is_none());
        }
    }

    #[test]
    fn test_running_to_running_is_refused() {
        let mut c = ctx();
        c.transition(ExecutionStatus::Running).unwrap();
        assert!(c.transition(ExecutionStatus::Running).is_err());
    }

    #[test]
    fn test_merge_overwrites_but_never_deletes() {
        let mut c = ExecutionContext::new(
            "f",
            None,
            HashMap::from([("a".to_string(), json!(1)), ("b".to_string(), json!(2))]),
        );
        c.merge_variables(HashMap::from([("b".to_string(), json!(3))]));
        assert_eq!(c.variables["a"], json!(1));
        assert_eq!(c.variables["b"], json!(3));
    }

    #[test]
    fn test_counts_errors_per_node() {
        let mut c = ctx();
        c.record_error(Some("n1"), "boom", None, true);
        c.record_error(Some("n1"), "boom", None, true);
        c.record_error(Some("n2"), "bang", None, true);
        c.record_error(None, "context", None, false);
        assert_eq!(c.errors_for_node("n1"), 2);
        assert_eq!(c.errors_for_node("n2"), 1);
        assert_eq!(c.errors_for_node("n3"), 0);
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut c = ExecutionContext::new("f", Some("signup".into()), HashMap::new());
        c.log(LogLevel::Info, Some("n1"), "started", None);
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["funnelId"], json!("f"));
        assert_eq!(value["triggerId"], json!("signup"));
        assert_eq!(value["status"], json!("pending"));
        assert_eq!(value["logs"][0]["nodeId"], json!("n1"));
        assert_eq!(value["logs"][0]["level"], json!("info"));

        let back: ExecutionContext = serde_json::from_value(value).unwrap();
        assert_eq!(back.id, c.id);
    }

    #[test]
    fn test_cache_key_format() {
        let c = ctx();
        assert_eq!(c.cache_key(), format!("execution:{}", c.id));
    }
}
