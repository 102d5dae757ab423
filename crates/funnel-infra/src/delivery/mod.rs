//! Delivery backends for the node executors.
//!
//! HTTP-backed implementations of the `funnel-core` delivery ports, plus
//! log-only stand-ins used when a service URL is not configured so funnels
//! can be dry-run end to end.

pub mod ai;
pub mod analytics;
pub mod contacts;
pub mod http;
pub mod log_only;
pub mod whatsapp;

#[cfg(test)]
pub(crate) mod test_server;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use funnel_core::delivery::{AiProvider, AnalyticsSink, ContactStore, DeliveryError, MessageSender};
use funnel_core::executor::ExecutorServices;
use funnel_types::config::DeliveryConfig;
use funnel_types::node_config::Channel;
use secrecy::SecretString;
use serde_json::Value;

use self::ai::OpenAiCompatProvider;
use self::analytics::RestAnalyticsSink;
use self::contacts::RestContactStore;
use self::http::ReqwestDispatcher;
use self::log_only::{LogOnlyAnalytics, LogOnlyContacts, LogOnlySender, UnconfiguredAi};
use self::whatsapp::WhatsAppSender;

const USER_AGENT: &str = concat!("funnel-engine/", env!("CARGO_PKG_VERSION"));

/// Wire up every executor dependency from configuration.
///
/// Configured services get HTTP clients; the rest fall back to log-only
/// backends (or, for AI, a backend that reports itself unconfigured).
pub fn build_services(config: &DeliveryConfig) -> Result<ExecutorServices, DeliveryError> {
    let timeout = config.delivery_timeout();
    let client = http_client(timeout)?;

    let mut senders: HashMap<Channel, Arc<dyn MessageSender>> = HashMap::new();
    let whatsapp: Arc<dyn MessageSender> = match &config.whatsapp_service_url {
        Some(url) => Arc::new(WhatsAppSender::new(
            client.clone(),
            url,
            config.whatsapp_api_token.clone().map(SecretString::from),
        )),
        None => {
            tracing::info!("WHATSAPP_SERVICE_URL not set, whatsapp messages will only be logged");
            Arc::new(LogOnlySender::new(Channel::Whatsapp))
        }
    };
    senders.insert(Channel::Whatsapp, whatsapp);
    senders.insert(Channel::Email, Arc::new(LogOnlySender::new(Channel::Email)));
    senders.insert(Channel::Sms, Arc::new(LogOnlySender::new(Channel::Sms)));

    let ai: Arc<dyn AiProvider> = match &config.ai_api_url {
        Some(url) => Arc::new(OpenAiCompatProvider::new(
            client.clone(),
            url,
            config.ai_api_key.clone().map(SecretString::from),
            config.ai_model.clone(),
        )),
        None => Arc::new(UnconfiguredAi),
    };

    let contacts: Arc<dyn ContactStore> = match &config.contact_service_url {
        Some(url) => Arc::new(RestContactStore::new(client.clone(), url)),
        None => Arc::new(LogOnlyContacts),
    };

    let analytics: Arc<dyn AnalyticsSink> = match &config.analytics_service_url {
        Some(url) => Arc::new(RestAnalyticsSink::new(client.clone(), url)),
        None => Arc::new(LogOnlyAnalytics),
    };

    Ok(ExecutorServices {
        senders,
        http: Arc::new(ReqwestDispatcher::new(client)),
        ai,
        contacts,
        analytics,
    })
}

/// Shared reqwest client with the delivery timeout applied to every request.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, DeliveryError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| DeliveryError::Transport(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn transport_error(e: reqwest::Error) -> DeliveryError {
    if e.is_timeout() {
        DeliveryError::Timeout
    } else {
        DeliveryError::Transport(e.to_string())
    }
}

/// Read a response body as JSON, falling back to a JSON string of the raw
/// text. An empty body reads as `null`.
pub(crate) async fn read_body(response: reqwest::Response) -> Result<Value, DeliveryError> {
    let text = response.text().await.map_err(transport_error)?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// Turn a non-2xx response into `DeliveryError::Status`.
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, DeliveryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = %status, body = %body, "delivery service error response");
    Err(DeliveryError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Join a base URL and a path without doubling or dropping the slash.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        assert_eq!(endpoint("http://svc:3001/", "/send"), "http://svc:3001/send");
        assert_eq!(endpoint("http://svc:3001/api", "contacts/c-1"), "http://svc:3001/api/contacts/c-1");
    }

    #[test]
    fn test_unconfigured_services_fall_back() {
        let services = build_services(&DeliveryConfig::default()).unwrap();
        for channel in Channel::ALL {
            assert_eq!(services.senders[&channel].channel(), channel);
        }
    }

    #[tokio::test]
    async fn test_unconfigured_ai_reports_not_configured() {
        let services = build_services(&DeliveryConfig::default()).unwrap();
        let request = funnel_core::delivery::AiRequest {
            prompt: "hi".into(),
            system_prompt: None,
            model: None,
            temperature: None,
            max_tokens: None,
        };
        let err = services.ai.generate(&request).await.unwrap_err();
        assert!(matches!(err, DeliveryError::NotConfigured(_)));
    }
}
