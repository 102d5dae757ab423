//! Configuration loader for the funnel engine.
//!
//! Reads an optional `funnel.toml` and then lets environment variables
//! override individual settings. Environment values that fail to parse are
//! ignored with a warning, leaving the file (or default) value in place.

use std::path::Path;
use std::str::FromStr;

use funnel_types::config::FunnelConfig;
use funnel_types::error::ConfigError;

/// Load configuration from `path` (if given) and the process environment.
///
/// - No path: start from [`FunnelConfig::default()`].
/// - Path given but unreadable or malformed: error. An explicitly named file
///   is never silently skipped.
pub async fn load_funnel_config(path: Option<&Path>) -> Result<FunnelConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path).await?,
        None => {
            tracing::debug!("no config file given, using defaults");
            FunnelConfig::default()
        }
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

async fn read_config_file(path: &Path) -> Result<FunnelConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Overlay environment settings onto `config`.
///
/// `lookup` resolves a variable name to its value; the loader passes the
/// process environment.
pub fn apply_env_overrides(config: &mut FunnelConfig, lookup: impl Fn(&str) -> Option<String>) {
    let engine = &mut config.engine;
    override_parsed(&lookup, "MAX_CONCURRENT_EXECUTIONS", &mut engine.max_concurrent_executions);
    override_parsed(&lookup, "EXECUTION_TIMEOUT", &mut engine.execution_timeout_ms);
    override_parsed(&lookup, "MAX_RETRY_ATTEMPTS", &mut engine.max_retry_attempts);
    override_parsed(&lookup, "RETRY_DELAY", &mut engine.retry_delay_ms);
    override_parsed(&lookup, "MAX_FLOW_NODES", &mut engine.max_flow_nodes);
    override_parsed(&lookup, "MAX_FLOW_DEPTH", &mut engine.max_flow_depth);
    override_parsed(&lookup, "FLOW_CACHE_TTL", &mut engine.flow_cache_ttl);

    let delivery = &mut config.delivery;
    override_parsed(&lookup, "DELIVERY_TIMEOUT", &mut delivery.delivery_timeout_ms);
    override_string(&lookup, "WHATSAPP_SERVICE_URL", &mut delivery.whatsapp_service_url);
    override_string(&lookup, "WHATSAPP_API_TOKEN", &mut delivery.whatsapp_api_token);
    override_string(&lookup, "AI_API_URL", &mut delivery.ai_api_url);
    override_string(&lookup, "AI_API_KEY", &mut delivery.ai_api_key);
    override_string(&lookup, "CONTACT_SERVICE_URL", &mut delivery.contact_service_url);
    override_string(&lookup, "ANALYTICS_SERVICE_URL", &mut delivery.analytics_service_url);
    if let Some(model) = lookup("AI_MODEL").filter(|m| !m.trim().is_empty()) {
        delivery.ai_model = model;
    }
}

fn override_parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    let Some(raw) = lookup(key) else { return };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, value = raw.as_str(), "ignoring unparseable environment setting"),
    }
}

fn override_string(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut Option<String>) {
    if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
        *slot = Some(value);
    }
}
