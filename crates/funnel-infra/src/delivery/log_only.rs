//! Stand-in backends for services that are not configured.
//!
//! They accept the work, log it through `tracing`, and report success, so
//! a funnel can be dry-run without any external service. The AI stand-in
//! is the exception: there is no sensible fake reply, so it fails.

use funnel_core::delivery::{
    AiProvider, AiReply, AiRequest, AnalyticsEvent, AnalyticsSink, BoxFuture, ContactStore, DeliveryError,
    DeliveryReceipt, MessageSender, OutboundMessage,
};
use funnel_types::node_config::Channel;
use serde_json::{Map, Value};
use uuid::Uuid;

pub struct LogOnlySender {
    channel: Channel,
}

impl LogOnlySender {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

impl MessageSender for LogOnlySender {
    fn channel(&self) -> Channel {
        self.channel
    }

    fn send<'a>(&'a self, message: &'a OutboundMessage) -> BoxFuture<'a, Result<DeliveryReceipt, DeliveryError>> {
        Box::pin(async move {
            tracing::info!(
                channel = %self.channel,
                to = message.to.as_str(),
                subject = message.subject.as_deref(),
                chars = message.message.chars().count(),
                "message logged (no delivery backend configured)"
            );
            Ok(DeliveryReceipt {
                message_id: Some(format!("log-{}", Uuid::now_v7())),
                response: None,
            })
        })
    }
}

pub struct LogOnlyContacts;

impl ContactStore for LogOnlyContacts {
    fn update_contact<'a>(
        &'a self,
        contact_id: &'a str,
        fields: &'a Map<String, Value>,
    ) -> BoxFuture<'a, Result<Value, DeliveryError>> {
        Box::pin(async move {
            tracing::info!(contact_id, fields = ?fields.keys().collect::<Vec<_>>(), "contact update logged");
            let mut updated = fields.clone();
            updated.insert("id".into(), Value::String(contact_id.to_string()));
            Ok(Value::Object(updated))
        })
    }
}

pub struct LogOnlyAnalytics;

impl AnalyticsSink for LogOnlyAnalytics {
    fn track<'a>(&'a self, event: &'a AnalyticsEvent) -> BoxFuture<'a, Result<(), DeliveryError>> {
        Box::pin(async move {
            tracing::info!(
                event = event.event.as_str(),
                execution_id = %event.execution_id,
                funnel_id = event.funnel_id.as_str(),
                "analytics event logged"
            );
            Ok(())
        })
    }
}

pub struct UnconfiguredAi;

impl AiProvider for UnconfiguredAi {
    fn generate<'a>(&'a self, _request: &'a AiRequest) -> BoxFuture<'a, Result<AiReply, DeliveryError>> {
        Box::pin(async { Err(DeliveryError::NotConfigured("AI provider (set AI_API_URL)".into())) })
    }
}
