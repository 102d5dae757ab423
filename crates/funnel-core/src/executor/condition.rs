//! `condition` nodes.

use funnel_types::action::{ActionResult, ValidationResult};
use funnel_types::execution::ExecutionContext;
use funnel_types::funnel::FunnelNode;
use funnel_types::node_config::ConditionNodeConfig;
use serde_json::{Value, json};

use super::{NodeExecutor, parse_config, typed_config};
use crate::condition::evaluate;
use crate::delivery::BoxFuture;

/// Evaluates a condition and records the outcome in `condition_result`.
///
/// With `trueNodeId`/`falseNodeId` configured the matching ID becomes the
/// result's `next_node_id`; otherwise branching is left to guarded
/// connections.
pub struct ConditionExecutor;

impl NodeExecutor for ConditionExecutor {
    fn execute<'a>(&'a self, node: &'a FunnelNode, context: &'a ExecutionContext) -> BoxFuture<'a, ActionResult> {
        Box::pin(async move {
            let config: ConditionNodeConfig = match typed_config(node) {
                Ok(c) => c,
                Err(failed) => return failed,
            };

            let mut result = ActionResult::proceed();
            let outcome = match evaluate(&config.condition, &context.variables) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(
                        execution_id = %context.id,
                        node_id = node.id.as_str(),
                        error = %e,
                        "condition node evaluated to false"
                    );
                    result = result.with_metadata("conditionError", json!(e.to_string()));
                    false
                }
            };

            result = result.with_variable("condition_result", json!(outcome));
            let branch = if outcome { config.true_node_id } else { config.false_node_id };
            match branch {
                Some(next) => result.with_next_node(next),
                None => result,
            }
        })
    }

    fn validate(&self, config: &Value) -> ValidationResult {
        let mut result = ValidationResult::valid();
        match parse_config::<ConditionNodeConfig>(config) {
            Ok(c) => {
                if c.condition.field.trim().is_empty() {
                    result.error("condition field is required");
                }
                if !c.condition.operator.is_known() {
                    result.error(format!("unknown condition operator '{}'", c.condition.operator));
                }
            }
            Err(e) => result.error(e),
        }
        result
    }
}
