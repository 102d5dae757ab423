//! Terminal `end` nodes.

use funnel_types::action::{ActionResult, ValidationResult};
use funnel_types::execution::ExecutionContext;
use funnel_types::funnel::FunnelNode;
use funnel_types::node_config::EndConfig;
use serde_json::Value;

use super::{NodeExecutor, parse_config, typed_config};
use crate::delivery::BoxFuture;
use crate::interpolate::interpolate_value;

/// Ends the run as completed, optionally saving final variables.
pub struct EndExecutor;

impl NodeExecutor for EndExecutor {
    fn execute<'a>(&'a self, node: &'a FunnelNode, context: &'a ExecutionContext) -> BoxFuture<'a, ActionResult> {
        Box::pin(async move {
            let config: EndConfig = match typed_config(node) {
                Ok(c) => c,
                Err(failed) => return failed,
            };
            let saved = config
                .save_data
                .iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, &context.variables)))
                .collect();
            ActionResult::finish().with_variables(saved)
        })
    }

    fn validate(&self, config: &Value) -> ValidationResult {
        let mut result = ValidationResult::valid();
        if let Err(e) = parse_config::<EndConfig>(config) {
            result.error(e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{context, node};
    use serde_json::json;

    #[tokio::test]
    async fn test_end_stops_and_saves_data() {
        let n = node(json!({
            "id": "done",
            "type": "end",
            "config": { "saveData": { "outcome": "converted", "who": "{{contact.name}}" } }
        }));
        let result = EndExecutor.execute(&n, &context(json!({ "contact": { "name": "Ada" } }))).await;
        assert!(result.success);
        assert!(!result.should_continue);
        let vars = result.variables.unwrap();
        assert_eq!(vars["outcome"], json!("converted"));
        assert_eq!(vars["who"], json!("Ada"));
    }

    #[tokio::test]
    async fn test_end_without_config() {
        let n = node(json!({ "id": "done", "type": "end" }));
        let result = EndExecutor.execute(&n, &context(json!({}))).await;
        assert!(result.success);
        assert!(!result.should_continue);
    }
}
