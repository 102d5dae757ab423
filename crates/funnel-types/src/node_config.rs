//! Typed configuration for the built-in node types.
//!
//! Node configs travel as free-form JSON on [`FunnelNode::config`]; executors
//! read them through [`FunnelNode::config_as`] into these structs. Field
//! names follow the dashboard's camelCase.
//!
//! [`FunnelNode::config`]: crate::funnel::FunnelNode::config
//! [`FunnelNode::config_as`]: crate::funnel::FunnelNode::config_as

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::funnel::Condition;

/// Variable an `ai_response` node writes when `outputVariable` is unset.
pub const DEFAULT_AI_OUTPUT_VARIABLE: &str = "ai_response";

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

/// Delivery channel of a messaging node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Whatsapp,
    Email,
    Sms,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Whatsapp, Channel::Email, Channel::Sms];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Whatsapp => "whatsapp",
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Config for `send_message` and its channel-specific aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageConfig {
    /// Missing channel means WhatsApp.
    #[serde(default)]
    pub channel: Option<Channel>,
    /// Phone number or address; usually a placeholder like `{{contact.phone}}`.
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Used when `message` is absent.
    #[serde(default)]
    pub template: Option<String>,
    /// Email subject line.
    #[serde(default)]
    pub subject: Option<String>,
}

// ---------------------------------------------------------------------------
// AI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiResponseConfig {
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Overrides the provider's default model.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub output_variable: Option<String>,
}

impl AiResponseConfig {
    pub fn output_variable(&self) -> &str {
        self.output_variable
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_AI_OUTPUT_VARIABLE)
    }
}

// ---------------------------------------------------------------------------
// Control flow
// ---------------------------------------------------------------------------

/// Config for a `condition` node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionNodeConfig {
    pub condition: Condition,
    /// Node to jump to when the condition holds. Unset: follow connections.
    #[serde(default)]
    pub true_node_id: Option<String>,
    #[serde(default)]
    pub false_node_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayUnit {
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayConfig {
    pub duration: u64,
    #[serde(default)]
    pub unit: DelayUnit,
}

impl DelayConfig {
    /// The wait as a `Duration`, saturating on overflow.
    pub fn as_duration(&self) -> Duration {
        let millis_per_unit: u64 = match self.unit {
            DelayUnit::Milliseconds => 1,
            DelayUnit::Seconds => 1_000,
            DelayUnit::Minutes => 60_000,
            DelayUnit::Hours => 3_600_000,
            DelayUnit::Days => 86_400_000,
        };
        Duration::from_millis(self.duration.saturating_mul(millis_per_unit))
    }
}

/// Config for an `end` node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndConfig {
    /// Variables written into the run as it finishes.
    #[serde(default)]
    pub save_data: HashMap<String, Value>,
}

// ---------------------------------------------------------------------------
// Integrations
// ---------------------------------------------------------------------------

/// Config for `webhook` and `api_call` nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Request body; every string inside is interpolated.
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Variable that receives the response body.
    #[serde(default)]
    pub response_variable: Option<String>,
}

fn default_method() -> String {
    "POST".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactConfig {
    /// Contact to update. Unset: `{{contact.id}}`.
    #[serde(default)]
    pub contact_id: Option<String>,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventConfig {
    pub event: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delay_units() {
        let d: DelayConfig = serde_json::from_value(json!({ "duration": 2, "unit": "minutes" })).unwrap();
        assert_eq!(d.as_duration(), Duration::from_secs(120));

        let d: DelayConfig = serde_json::from_value(json!({ "duration": 5 })).unwrap();
        assert_eq!(d.unit, DelayUnit::Seconds);
        assert_eq!(d.as_duration(), Duration::from_secs(5));

        let d = DelayConfig { duration: u64::MAX, unit: DelayUnit::Days };
        assert_eq!(d.as_duration(), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_ai_output_variable_default() {
        let c: AiResponseConfig = serde_json::from_value(json!({ "prompt": "hi" })).unwrap();
        assert_eq!(c.output_variable(), DEFAULT_AI_OUTPUT_VARIABLE);

        let c: AiResponseConfig =
            serde_json::from_value(json!({ "prompt": "hi", "outputVariable": "reply" })).unwrap();
        assert_eq!(c.output_variable(), "reply");
    }

    #[test]
    fn test_webhook_method_defaults_to_post() {
        let c: WebhookConfig =
            serde_json::from_value(json!({ "url": "https://hooks.example.com/x" })).unwrap();
        assert_eq!(c.method, "POST");
        assert!(c.headers.is_empty());
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let r = serde_json::from_value::<SendMessageConfig>(json!({ "channel": "fax" }));
        assert!(r.is_err());
    }

    #[test]
    fn test_condition_node_config() {
        let c: ConditionNodeConfig = serde_json::from_value(json!({
            "condition": { "field": "score", "operator": "greater_than", "value": 50 },
            "trueNodeId": "high"
        }))
        .unwrap();
        assert_eq!(c.true_node_id.as_deref(), Some("high"));
        assert!(c.false_node_id.is_none());
    }
}
