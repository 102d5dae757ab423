//! Engine configuration types.
//!
//! `FunnelConfig` is the top-level `funnel.toml`: an `[engine]` table of
//! execution limits and a `[delivery]` table pointing at the external
//! messaging, AI, contact and analytics services. Every field has a default;
//! environment variables override the file (see `funnel-infra::config`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunnelConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

// ---------------------------------------------------------------------------
// Engine limits
// ---------------------------------------------------------------------------

/// Execution limits and retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Runs allowed in flight at once; further runs wait for a slot.
    #[serde(default = "default_max_concurrent_executions")]
    pub max_concurrent_executions: usize,

    /// Upper bound on a whole run, in milliseconds.
    #[serde(default = "default_execution_timeout_ms")]
    pub execution_timeout_ms: u64,

    /// Retries per node after its first failed attempt.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Pause before each retry, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Largest funnel (node count) that passes validation.
    #[serde(default = "default_max_flow_nodes")]
    pub max_flow_nodes: usize,

    /// Longest entry-to-leaf path that passes validation.
    #[serde(default = "default_max_flow_depth")]
    pub max_flow_depth: usize,

    /// TTL of persisted execution snapshots, in seconds.
    #[serde(default = "default_flow_cache_ttl")]
    pub flow_cache_ttl: u64,
}

fn default_max_concurrent_executions() -> usize {
    100
}

fn default_execution_timeout_ms() -> u64 {
    300_000
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    5_000
}

fn default_max_flow_nodes() -> usize {
    100
}

fn default_max_flow_depth() -> usize {
    50
}

fn default_flow_cache_ttl() -> u64 {
    3_600
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_executions: default_max_concurrent_executions(),
            execution_timeout_ms: default_execution_timeout_ms(),
            max_retry_attempts: default_max_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            max_flow_nodes: default_max_flow_nodes(),
            max_flow_depth: default_max_flow_depth(),
            flow_cache_ttl: default_flow_cache_ttl(),
        }
    }
}

impl EngineConfig {
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Delivery endpoints
// ---------------------------------------------------------------------------

/// Where the side-effecting node executors send their work.
///
/// Unset URLs fall back to log-only backends so funnels can be dry-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp_service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp_api_token: Option<String>,
    /// Per-request timeout for outbound delivery calls, in milliseconds.
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,
    /// OpenAI-compatible chat completions base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_api_key: Option<String>,
    #[serde(default = "default_ai_model")]
    pub ai_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_service_url: Option<String>,
}

fn default_delivery_timeout_ms() -> u64 {
    30_000
}

fn default_ai_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            whatsapp_service_url: None,
            whatsapp_api_token: None,
            delivery_timeout_ms: default_delivery_timeout_ms(),
            ai_api_url: None,
            ai_api_key: None,
            ai_model: default_ai_model(),
            contact_service_url: None,
            analytics_service_url: None,
        }
    }
}

impl DeliveryConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrent_executions, 100);
        assert_eq!(config.execution_timeout_ms, 300_000);
        assert_eq!(config.max_retry_attempts, 3);
        assert_eq!(config.retry_delay_ms, 5_000);
        assert_eq!(config.max_flow_nodes, 100);
        assert_eq!(config.max_flow_depth, 50);
        assert_eq!(config.flow_cache_ttl, 3_600);
    }

    #[test]
    fn test_funnel_config_deserialize_empty() {
        let config: FunnelConfig = toml::from_str("").unwrap();
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config.delivery.whatsapp_service_url.is_none());
        assert_eq!(config.delivery.delivery_timeout_ms, 30_000);
    }

    #[test]
    fn test_funnel_config_deserialize_partial() {
        let toml_str = r#"
[engine]
max_retry_attempts = 1
retry_delay_ms = 0

[delivery]
whatsapp_service_url = "http://whatsapp.internal:3001"
ai_model = "llama3"
"#;
        let config: FunnelConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.max_retry_attempts, 1);
        assert_eq!(config.engine.retry_delay(), Duration::ZERO);
        assert_eq!(config.engine.max_flow_nodes, 100);
        assert_eq!(
            config.delivery.whatsapp_service_url.as_deref(),
            Some("http://whatsapp.internal:3001")
        );
        assert_eq!(config.delivery.ai_model, "llama3");
    }
}
