//! Delivery ports: the external services node executors call into.
//!
//! Each trait is object-safe with boxed futures so executors can hold them
//! as `Arc<dyn ...>` and the infrastructure layer can pick implementations
//! at startup (HTTP-backed, log-only, or test fakes).

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use funnel_types::node_config::Channel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Boxed, sendable future used by the object-safe port traits.
pub use futures_util::future::BoxFuture;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors reported by delivery backends.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

/// A rendered message ready to hand to a channel backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel: Channel,
    pub to: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// What a channel backend reports back after accepting a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Raw response body from the backend, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

/// Sends messages over one channel.
pub trait MessageSender: Send + Sync {
    fn channel(&self) -> Channel;

    fn send<'a>(&'a self, message: &'a OutboundMessage) -> BoxFuture<'a, Result<DeliveryReceipt, DeliveryError>>;
}

// ---------------------------------------------------------------------------
// Outbound HTTP
// ---------------------------------------------------------------------------

/// An HTTP call issued by a webhook or API-call node.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpCall {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    /// Parsed JSON body, or the raw text as a JSON string when not JSON.
    pub body: Value,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs outbound HTTP calls. Non-2xx replies are returned, not errors;
/// `Err` means the call produced no reply at all.
pub trait HttpDispatcher: Send + Sync {
    fn dispatch<'a>(&'a self, call: &'a HttpCall) -> BoxFuture<'a, Result<HttpReply, DeliveryError>>;
}

// ---------------------------------------------------------------------------
// AI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AiRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiReply {
    pub content: String,
    pub model: String,
    pub usage: Option<Value>,
}

/// Generates a text reply for a prompt.
pub trait AiProvider: Send + Sync {
    fn generate<'a>(&'a self, request: &'a AiRequest) -> BoxFuture<'a, Result<AiReply, DeliveryError>>;
}

// ---------------------------------------------------------------------------
// Contacts & analytics
// ---------------------------------------------------------------------------

/// Persists contact field updates.
pub trait ContactStore: Send + Sync {
    /// Apply `fields` to the contact and return the stored result.
    fn update_contact<'a>(
        &'a self,
        contact_id: &'a str,
        fields: &'a Map<String, Value>,
    ) -> BoxFuture<'a, Result<Value, DeliveryError>>;
}

/// An analytics event emitted by a `track_event` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub event: String,
    pub properties: Map<String, Value>,
    pub execution_id: Uuid,
    pub funnel_id: String,
    pub timestamp: DateTime<Utc>,
}

pub trait AnalyticsSink: Send + Sync {
    fn track<'a>(&'a self, event: &'a AnalyticsEvent) -> BoxFuture<'a, Result<(), DeliveryError>>;
}
