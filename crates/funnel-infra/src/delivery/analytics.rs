//! Event tracking against the analytics service.

use funnel_core::delivery::{AnalyticsEvent, AnalyticsSink, BoxFuture, DeliveryError};

use super::{endpoint, ensure_success, transport_error};

/// `POST {ANALYTICS_SERVICE_URL}/events` with the event as JSON.
pub struct RestAnalyticsSink {
    client: reqwest::Client,
    url: String,
}

impl RestAnalyticsSink {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: endpoint(base_url, "events"),
        }
    }

    async fn post(&self, event: &AnalyticsEvent) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response).await?;
        tracing::debug!(event = event.event.as_str(), execution_id = %event.execution_id, "event tracked");
        Ok(())
    }
}

impl AnalyticsSink for RestAnalyticsSink {
    fn track<'a>(&'a self, event: &'a AnalyticsEvent) -> BoxFuture<'a, Result<(), DeliveryError>> {
        Box::pin(self.post(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::http_client;
    use crate::delivery::test_server::serve_once;
    use chrono::Utc;
    use serde_json::{Map, json};
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_posts_camel_case_event() {
        let (url, server) = serve_once(202, "").await;
        let sink = RestAnalyticsSink::new(http_client(Duration::from_secs(5)).unwrap(), &url);
        let event = AnalyticsEvent {
            event: "signup_completed".into(),
            properties: Map::new(),
            execution_id: Uuid::now_v7(),
            funnel_id: "welcome".into(),
            timestamp: Utc::now(),
        };

        sink.track(&event).await.unwrap();
        let received = server.await.unwrap().json();

        assert_eq!(received["event"], json!("signup_completed"));
        assert_eq!(received["funnelId"], json!("welcome"));
        assert_eq!(received["executionId"], json!(event.execution_id.to_string()));
    }
}
