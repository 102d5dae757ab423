//! Entry pass-through for `trigger` nodes.

use chrono::Utc;
use funnel_types::action::{ActionResult, ValidationResult};
use funnel_types::execution::ExecutionContext;
use funnel_types::funnel::FunnelNode;
use serde_json::{Value, json};

use super::NodeExecutor;
use crate::delivery::BoxFuture;

/// Marks the run as triggered and hands off to the next node.
pub struct TriggerExecutor;

impl NodeExecutor for TriggerExecutor {
    fn execute<'a>(&'a self, _node: &'a FunnelNode, context: &'a ExecutionContext) -> BoxFuture<'a, ActionResult> {
        Box::pin(async move {
            ActionResult::proceed()
                .with_variable("triggered_at", json!(Utc::now().to_rfc3339()))
                .with_data(json!({ "triggerId": context.trigger_id }))
        })
    }

    fn validate(&self, config: &Value) -> ValidationResult {
        let mut result = ValidationResult::valid();
        if !(config.is_object() || config.is_null()) {
            result.error("trigger config must be an object");
        }
        result
    }
}
