//! `ai_response` nodes: prompt an AI provider and store the reply.

use std::sync::Arc;

use funnel_types::action::{ActionResult, ValidationResult};
use funnel_types::execution::ExecutionContext;
use funnel_types::funnel::FunnelNode;
use funnel_types::node_config::AiResponseConfig;
use serde_json::{Value, json};

use super::{NodeExecutor, parse_config, typed_config};
use crate::delivery::{AiProvider, AiRequest, BoxFuture};
use crate::interpolate::interpolate;

pub struct AiResponseExecutor {
    provider: Arc<dyn AiProvider>,
}

impl AiResponseExecutor {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }
}

impl NodeExecutor for AiResponseExecutor {
    fn execute<'a>(&'a self, node: &'a FunnelNode, context: &'a ExecutionContext) -> BoxFuture<'a, ActionResult> {
        Box::pin(async move {
            let config: AiResponseConfig = match typed_config(node) {
                Ok(c) => c,
                Err(failed) => return failed,
            };
            let request = AiRequest {
                prompt: interpolate(&config.prompt, &context.variables),
                system_prompt: config.system_prompt.as_deref().map(|s| interpolate(s, &context.variables)),
                model: config.model.clone(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            };

            match self.provider.generate(&request).await {
                Ok(reply) => ActionResult::proceed()
                    .with_variable(config.output_variable(), json!(reply.content))
                    .with_data(json!({ "model": reply.model, "usage": reply.usage })),
                Err(e) => ActionResult::failure(format!("AI generation failed: {e}")),
            }
        })
    }

    fn validate(&self, config: &Value) -> ValidationResult {
        let mut result = ValidationResult::valid();
        match parse_config::<AiResponseConfig>(config) {
            Ok(c) => {
                if c.prompt.trim().is_empty() {
                    result.error("prompt is required");
                }
                if let Some(t) = c.temperature {
                    if !(0.0..=2.0).contains(&t) {
                        result.warning(format!("temperature {t} is outside 0.0..=2.0"));
                    }
                }
            }
            Err(e) => result.error(e),
        }
        result
    }
}
