//! `delay` nodes: a non-blocking timed pause.

use funnel_types::action::{ActionResult, ValidationResult};
use funnel_types::execution::ExecutionContext;
use funnel_types::funnel::FunnelNode;
use funnel_types::node_config::DelayConfig;
use serde_json::{Value, json};

use super::{NodeExecutor, parse_config, typed_config};
use crate::delivery::BoxFuture;

pub struct DelayExecutor;

impl NodeExecutor for DelayExecutor {
    fn execute<'a>(&'a self, node: &'a FunnelNode, context: &'a ExecutionContext) -> BoxFuture<'a, ActionResult> {
        Box::pin(async move {
            let config: DelayConfig = match typed_config(node) {
                Ok(c) => c,
                Err(failed) => return failed,
            };
            let wait = config.as_duration();
            tracing::debug!(
                execution_id = %context.id,
                node_id = node.id.as_str(),
                wait_ms = wait.as_millis() as u64,
                "delaying"
            );
            tokio::time::sleep(wait).await;
            ActionResult::proceed().with_data(json!({ "waitedMs": wait.as_millis() as u64 }))
        })
    }

    fn validate(&self, config: &Value) -> ValidationResult {
        let mut result = ValidationResult::valid();
        match parse_config::<DelayConfig>(config) {
            Ok(c) if c.duration == 0 => result.warning("duration is 0; the node will not wait"),
            Ok(_) => {}
            Err(e) => result.error(e),
        }
        result
    }

    fn exempt_from_timeout(&self) -> bool {
        true
    }
}
