//! WhatsApp delivery through the external messaging service.
//!
//! Posts `{to, message}` to `{WHATSAPP_SERVICE_URL}/send` with a bearer
//! token. The token is held as a [`SecretString`] and only exposed when the
//! `Authorization` header is built.

use funnel_core::delivery::{BoxFuture, DeliveryError, DeliveryReceipt, MessageSender, OutboundMessage};
use funnel_types::node_config::Channel;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;

use super::{endpoint, ensure_success, read_body, transport_error};

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    message: &'a str,
}

pub struct WhatsAppSender {
    client: reqwest::Client,
    url: String,
    token: Option<SecretString>,
}

impl WhatsAppSender {
    pub fn new(client: reqwest::Client, base_url: &str, token: Option<SecretString>) -> Self {
        Self {
            client,
            url: endpoint(base_url, "send"),
            token,
        }
    }

    async fn post(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError> {
        let mut request = self.client.post(&self.url).json(&SendRequest {
            to: &message.to,
            message: &message.message,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(transport_error)?;
        let body = read_body(ensure_success(response).await?).await?;

        tracing::debug!(to = message.to.as_str(), "whatsapp message accepted");
        Ok(DeliveryReceipt {
            message_id: message_id(&body),
            response: (!body.is_null()).then_some(body),
        })
    }
}

/// The service has answered with `messageId`, `message_id` and `id` over time.
fn message_id(body: &Value) -> Option<String> {
    ["messageId", "message_id", "id"]
        .iter()
        .find_map(|key| body.get(key))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

impl MessageSender for WhatsAppSender {
    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    fn send<'a>(&'a self, message: &'a OutboundMessage) -> BoxFuture<'a, Result<DeliveryReceipt, DeliveryError>> {
        Box::pin(self.post(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::http_client;
    use crate::delivery::test_server::serve_once;
    use serde_json::json;
    use std::time::Duration;

    fn outbound() -> OutboundMessage {
        OutboundMessage {
            channel: Channel::Whatsapp,
            to: "+15550100".into(),
            message: "Hi Ada!".into(),
            subject: None,
        }
    }

    #[tokio::test]
    async fn test_posts_to_and_message_with_bearer() {
        let (url, server) = serve_once(200, r#"{"messageId":"wamid.1"}"#).await;
        let sender = WhatsAppSender::new(
            http_client(Duration::from_secs(5)).unwrap(),
            &url,
            Some(SecretString::from("tok-123".to_string())),
        );

        let receipt = sender.send(&outbound()).await.unwrap();
        let received = server.await.unwrap();

        assert_eq!(receipt.message_id.as_deref(), Some("wamid.1"));
        assert!(received.request_line.starts_with("POST /send "));
        assert_eq!(received.header("authorization"), Some("Bearer tok-123"));
        assert_eq!(received.json(), json!({ "to": "+15550100", "message": "Hi Ada!" }));
    }

    #[tokio::test]
    async fn test_non_2xx_is_status_error() {
        let (url, server) = serve_once(503, r#"{"error":"down"}"#).await;
        let sender = WhatsAppSender::new(http_client(Duration::from_secs(5)).unwrap(), &url, None);

        let err = sender.send(&outbound()).await.unwrap_err();
        let received = server.await.unwrap();

        assert!(matches!(err, DeliveryError::Status { status: 503, .. }));
        assert!(received.header("authorization").is_none());
    }

    #[test]
    fn test_message_id_variants() {
        assert_eq!(message_id(&json!({ "id": 7 })).as_deref(), Some("7"));
        assert_eq!(message_id(&json!({ "message_id": "m" })).as_deref(), Some("m"));
        assert!(message_id(&json!({ "ok": true })).is_none());
        assert!(message_id(&Value::Null).is_none());
    }
}
