//! `webhook` and `api_call` nodes: outbound HTTP.

use std::sync::Arc;
use std::time::Duration;

use funnel_types::action::{ActionResult, ValidationResult};
use funnel_types::execution::ExecutionContext;
use funnel_types::funnel::FunnelNode;
use funnel_types::node_config::WebhookConfig;
use serde_json::{Value, json};

use super::{NodeExecutor, parse_config, typed_config};
use crate::delivery::{BoxFuture, HttpCall, HttpDispatcher};
use crate::interpolate::{interpolate, interpolate_value};

const METHODS: [&str; 6] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"];

/// Issues an HTTP request built from the node config. A 2xx reply is
/// success; anything else fails the attempt.
pub struct WebhookExecutor {
    http: Arc<dyn HttpDispatcher>,
}

impl WebhookExecutor {
    pub fn new(http: Arc<dyn HttpDispatcher>) -> Self {
        Self { http }
    }
}

impl NodeExecutor for WebhookExecutor {
    fn execute<'a>(&'a self, node: &'a FunnelNode, context: &'a ExecutionContext) -> BoxFuture<'a, ActionResult> {
        Box::pin(async move {
            let config: WebhookConfig = match typed_config(node) {
                Ok(c) => c,
                Err(failed) => return failed,
            };
            let vars = &context.variables;
            let call = HttpCall {
                method: config.method.to_ascii_uppercase(),
                url: interpolate(&config.url, vars),
                headers: config
                    .headers
                    .iter()
                    .map(|(k, v)| (k.clone(), interpolate(v, vars)))
                    .collect(),
                body: config.payload.as_ref().map(|p| interpolate_value(p, vars)),
                timeout: config.timeout_ms.map(Duration::from_millis),
            };

            let reply = match self.http.dispatch(&call).await {
                Ok(reply) => reply,
                Err(e) => return ActionResult::failure(format!("{} {} failed: {e}", call.method, call.url)),
            };

            tracing::debug!(
                execution_id = %context.id,
                node_id = node.id.as_str(),
                status = reply.status,
                "webhook replied"
            );

            if !reply.is_success() {
                return ActionResult::failure(format!("{} {} returned HTTP {}", call.method, call.url, reply.status))
                    .with_data(json!({ "status": reply.status, "body": reply.body }));
            }

            let mut result = ActionResult::proceed().with_data(json!({ "status": reply.status, "body": reply.body }));
            if let Some(var) = config.response_variable.filter(|v| !v.is_empty()) {
                result = result.with_variable(var, reply.body);
            }
            result
        })
    }

    fn validate(&self, config: &Value) -> ValidationResult {
        let mut result = ValidationResult::valid();
        let parsed = match parse_config::<WebhookConfig>(config) {
            Ok(c) => c,
            Err(e) => {
                result.error(e);
                return result;
            }
        };
        let url = parsed.url.trim();
        if url.is_empty() {
            result.error("url is required");
        } else if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with("{{")) {
            result.error(format!("url '{url}' must start with http:// or https://"));
        }
        if !METHODS.contains(&parsed.method.to_ascii_uppercase().as_str()) {
            result.error(format!("unsupported HTTP method '{}'", parsed.method));
        }
        result
    }
}
