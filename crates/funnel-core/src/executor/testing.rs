//! In-crate fakes for executor and engine tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use funnel_types::execution::ExecutionContext;
use funnel_types::funnel::FunnelNode;
use funnel_types::node_config::Channel;
use serde_json::{Map, Value, json};

use super::ExecutorServices;
use crate::delivery::{
    AiProvider, AiReply, AiRequest, AnalyticsEvent, AnalyticsSink, BoxFuture, ContactStore,
    DeliveryError, DeliveryReceipt, HttpCall, HttpDispatcher, HttpReply, MessageSender,
    OutboundMessage,
};

pub fn node(value: Value) -> FunnelNode {
    serde_json::from_value(value).unwrap()
}

pub fn context(vars: Value) -> ExecutionContext {
    ExecutionContext::new("test-funnel", None, serde_json::from_value(vars).unwrap())
}

pub struct RecordingSender {
    pub channel: Channel,
    pub fail: bool,
    pub sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingSender {
    pub fn new(channel: Channel) -> Self {
        Self { channel, fail: false, sent: Mutex::new(Vec::new()) }
    }

    pub fn failing(channel: Channel) -> Self {
        Self { channel, fail: true, sent: Mutex::new(Vec::new()) }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl MessageSender for RecordingSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    fn send<'a>(&'a self, message: &'a OutboundMessage) -> BoxFuture<'a, Result<DeliveryReceipt, DeliveryError>> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(message.clone());
            if self.fail {
                return Err(DeliveryError::Status { status: 503, body: "unavailable".into() });
            }
            Ok(DeliveryReceipt { message_id: Some("msg-1".into()), response: None })
        })
    }
}

pub struct FakeHttp {
    pub status: u16,
    pub body: Value,
    pub calls: Mutex<Vec<HttpCall>>,
}

impl FakeHttp {
    pub fn replying(status: u16, body: Value) -> Self {
        Self { status, body, calls: Mutex::new(Vec::new()) }
    }
}

impl HttpDispatcher for FakeHttp {
    fn dispatch<'a>(&'a self, call: &'a HttpCall) -> BoxFuture<'a, Result<HttpReply, DeliveryError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(call.clone());
            Ok(HttpReply { status: self.status, body: self.body.clone() })
        })
    }
}

pub struct FakeAi {
    pub requests: Mutex<Vec<AiRequest>>,
}

impl AiProvider for FakeAi {
    fn generate<'a>(&'a self, request: &'a AiRequest) -> BoxFuture<'a, Result<AiReply, DeliveryError>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            Ok(AiReply {
                content: format!("echo: {}", request.prompt),
                model: "fake-model".into(),
                usage: None,
            })
        })
    }
}

#[derive(Default)]
pub struct FakeContacts {
    pub updates: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl ContactStore for FakeContacts {
    fn update_contact<'a>(
        &'a self,
        contact_id: &'a str,
        fields: &'a Map<String, Value>,
    ) -> BoxFuture<'a, Result<Value, DeliveryError>> {
        Box::pin(async move {
            self.updates.lock().unwrap().push((contact_id.to_string(), fields.clone()));
            let mut stored = fields.clone();
            stored.insert("id".into(), json!(contact_id));
            Ok(Value::Object(stored))
        })
    }
}

#[derive(Default)]
pub struct FakeAnalytics {
    pub events: Mutex<Vec<AnalyticsEvent>>,
}

impl AnalyticsSink for FakeAnalytics {
    fn track<'a>(&'a self, event: &'a AnalyticsEvent) -> BoxFuture<'a, Result<(), DeliveryError>> {
        Box::pin(async move {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        })
    }
}

/// Handles on every fake so tests can inspect what was called.
pub struct Fakes {
    pub whatsapp: Arc<RecordingSender>,
    pub email: Arc<RecordingSender>,
    pub sms: Arc<RecordingSender>,
    pub http: Arc<FakeHttp>,
    pub ai: Arc<FakeAi>,
    pub contacts: Arc<FakeContacts>,
    pub analytics: Arc<FakeAnalytics>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            whatsapp: Arc::new(RecordingSender::new(Channel::Whatsapp)),
            email: Arc::new(RecordingSender::new(Channel::Email)),
            sms: Arc::new(RecordingSender::new(Channel::Sms)),
            http: Arc::new(FakeHttp::replying(200, json!({ "ok": true }))),
            ai: Arc::new(FakeAi { requests: Mutex::new(Vec::new()) }),
            contacts: Arc::new(FakeContacts::default()),
            analytics: Arc::new(FakeAnalytics::default()),
        }
    }

    pub fn services(&self) -> ExecutorServices {
        let mut senders: HashMap<Channel, Arc<dyn MessageSender>> = HashMap::new();
        senders.insert(Channel::Whatsapp, self.whatsapp.clone());
        senders.insert(Channel::Email, self.email.clone());
        senders.insert(Channel::Sms, self.sms.clone());
        ExecutorServices {
            senders,
            http: self.http.clone(),
            ai: self.ai.clone(),
            contacts: self.contacts.clone(),
            analytics: self.analytics.clone(),
        }
    }
}
