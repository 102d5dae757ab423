//! Contact updates against the contact service REST API.

use funnel_core::delivery::{BoxFuture, ContactStore, DeliveryError};
use serde_json::{Map, Value};

use super::{endpoint, ensure_success, read_body, transport_error};

/// `PATCH {CONTACT_SERVICE_URL}/contacts/{id}` with the changed fields.
pub struct RestContactStore {
    client: reqwest::Client,
    base_url: String,
}

impl RestContactStore {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    async fn patch(&self, contact_id: &str, fields: &Map<String, Value>) -> Result<Value, DeliveryError> {
        let url = endpoint(&self.base_url, &format!("contacts/{contact_id}"));
        let response = self
            .client
            .patch(&url)
            .json(fields)
            .send()
            .await
            .map_err(transport_error)?;
        let body = read_body(ensure_success(response).await?).await?;

        tracing::debug!(contact_id, fields = fields.len(), "contact updated");
        // Some deployments answer 204; echo what was written instead.
        if body.is_null() {
            let mut echoed = fields.clone();
            echoed.insert("id".into(), Value::String(contact_id.to_string()));
            return Ok(Value::Object(echoed));
        }
        Ok(body)
    }
}

impl ContactStore for RestContactStore {
    fn update_contact<'a>(
        &'a self,
        contact_id: &'a str,
        fields: &'a Map<String, Value>,
    ) -> BoxFuture<'a, Result<Value, DeliveryError>> {
        Box::pin(self.patch(contact_id, fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::http_client;
    use crate::delivery::test_server::serve_once;
    use serde_json::json;
    use std::time::Duration;

    fn fields() -> Map<String, Value> {
        json!({ "stage": "qualified" }).as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_patches_contact() {
        let (url, server) = serve_once(200, r#"{"id":"c-1","stage":"qualified","name":"Ada"}"#).await;
        let store = RestContactStore::new(http_client(Duration::from_secs(5)).unwrap(), &url);

        let updated = store.update_contact("c-1", &fields()).await.unwrap();
        let received = server.await.unwrap();

        assert_eq!(updated["name"], json!("Ada"));
        assert!(received.request_line.starts_with("PATCH /contacts/c-1 "));
        assert_eq!(received.json(), json!({ "stage": "qualified" }));
    }

    #[tokio::test]
    async fn test_empty_reply_echoes_fields() {
        let (url, _server) = serve_once(200, "").await;
        let store = RestContactStore::new(http_client(Duration::from_secs(5)).unwrap(), &url);
        let updated = store.update_contact("c-9", &fields()).await.unwrap();
        assert_eq!(updated, json!({ "id": "c-9", "stage": "qualified" }));
    }

    #[tokio::test]
    async fn test_not_found_is_error() {
        let (url, _server) = serve_once(404, r#"{"error":"no such contact"}"#).await;
        let store = RestContactStore::new(http_client(Duration::from_secs(5)).unwrap(), &url);
        let err = store.update_contact("c-0", &fields()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Status { status: 404, .. }));
    }
}
