//! `track_event` nodes.

use std::sync::Arc;

use chrono::Utc;
use funnel_types::action::{ActionResult, ValidationResult};
use funnel_types::execution::ExecutionContext;
use funnel_types::funnel::FunnelNode;
use funnel_types::node_config::TrackEventConfig;
use serde_json::{Value, json};

use super::{NodeExecutor, parse_config, typed_config};
use crate::delivery::{AnalyticsEvent, AnalyticsSink, BoxFuture};
use crate::interpolate::{interpolate, interpolate_value};

pub struct TrackEventExecutor {
    analytics: Arc<dyn AnalyticsSink>,
}

impl TrackEventExecutor {
    pub fn new(analytics: Arc<dyn AnalyticsSink>) -> Self {
        Self { analytics }
    }
}

impl NodeExecutor for TrackEventExecutor {
    fn execute<'a>(&'a self, node: &'a FunnelNode, context: &'a ExecutionContext) -> BoxFuture<'a, ActionResult> {
        Box::pin(async move {
            let config: TrackEventConfig = match typed_config(node) {
                Ok(c) => c,
                Err(failed) => return failed,
            };
            let vars = &context.variables;
            let event = AnalyticsEvent {
                event: interpolate(&config.event, vars),
                properties: config
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), interpolate_value(v, vars)))
                    .collect(),
                execution_id: context.id,
                funnel_id: context.funnel_id.clone(),
                timestamp: Utc::now(),
            };

            if let Err(e) = self.analytics.track(&event).await {
                return ActionResult::failure(format!("event tracking failed: {e}"));
            }
            ActionResult::proceed().with_variable(
                "last_event",
                json!({ "event": event.event, "trackedAt": event.timestamp.to_rfc3339() }),
            )
        })
    }

    fn validate(&self, config: &Value) -> ValidationResult {
        let mut result = ValidationResult::valid();
        match parse_config::<TrackEventConfig>(config) {
            Ok(c) if c.event.trim().is_empty() => result.error("event is required"),
            Ok(_) => {}
            Err(e) => result.error(e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{FakeAnalytics, context, node};

    #[tokio::test]
    async fn test_emits_event_with_properties() {
        let sink = Arc::new(FakeAnalytics::default());
        let exec = TrackEventExecutor::new(sink.clone());
        let n = node(json!({
            "id": "track",
            "type": "track_event",
            "config": { "event": "lead_qualified", "properties": { "score": "{{score}}" } }
        }));
        let ctx = context(json!({ "score": 91 }));

        let result = exec.execute(&n, &ctx).await;

        assert!(result.success);
        assert_eq!(result.variables.unwrap()["last_event"]["event"], json!("lead_qualified"));
        let events = sink.events.lock().unwrap();
        assert_eq!(events[0].properties["score"], json!("91"));
        assert_eq!(events[0].execution_id, ctx.id);
    }

    #[test]
    fn test_validate_requires_event() {
        let exec = TrackEventExecutor::new(Arc::new(FakeAnalytics::default()));
        assert!(!exec.validate(&json!({ "event": "" })).is_valid);
        assert!(exec.validate(&json!({ "event": "signup" })).is_valid);
    }
}
