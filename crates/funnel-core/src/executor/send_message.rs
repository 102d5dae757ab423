//! Messaging nodes: `send_message`, `send_whatsapp`, `send_email`, `send_sms`.
//!
//! One executor serves every messaging label. The channel comes from the
//! node config; without one, the channel-specific labels imply their own
//! channel and plain `send_message` falls back to WhatsApp.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use funnel_types::action::{ActionResult, ValidationResult};
use funnel_types::execution::ExecutionContext;
use funnel_types::funnel::{FunnelNode, NodeType};
use funnel_types::node_config::{Channel, SendMessageConfig};
use serde_json::{Value, json};

use super::{NodeExecutor, parse_config, typed_config};
use crate::delivery::{BoxFuture, MessageSender, OutboundMessage};
use crate::interpolate::interpolate;

pub struct SendMessageExecutor {
    senders: HashMap<Channel, Arc<dyn MessageSender>>,
}

impl SendMessageExecutor {
    pub fn new(senders: HashMap<Channel, Arc<dyn MessageSender>>) -> Self {
        Self { senders }
    }

    fn resolve_channel(node: &FunnelNode, config: &SendMessageConfig) -> Channel {
        if let Some(channel) = config.channel {
            return channel;
        }
        match node.node_type {
            NodeType::SendWhatsapp => Channel::Whatsapp,
            NodeType::SendEmail => Channel::Email,
            NodeType::SendSms => Channel::Sms,
            _ => {
                tracing::warn!(node_id = node.id.as_str(), "no channel configured, defaulting to whatsapp");
                Channel::Whatsapp
            }
        }
    }
}

impl NodeExecutor for SendMessageExecutor {
    fn execute<'a>(&'a self, node: &'a FunnelNode, context: &'a ExecutionContext) -> BoxFuture<'a, ActionResult> {
        Box::pin(async move {
            let config: SendMessageConfig = match typed_config(node) {
                Ok(c) => c,
                Err(failed) => return failed,
            };
            let channel = Self::resolve_channel(node, &config);

            let Some(body) = config.message.as_deref().or(config.template.as_deref()) else {
                return ActionResult::failure("message or template is required");
            };
            let to = interpolate(config.recipient.as_deref().unwrap_or_default(), &context.variables);
            if to.trim().is_empty() {
                return ActionResult::failure("recipient is required");
            }

            let Some(sender) = self.senders.get(&channel) else {
                return ActionResult::failure(format!("no sender configured for channel '{channel}'"));
            };

            let outbound = OutboundMessage {
                channel,
                to,
                message: interpolate(body, &context.variables),
                subject: config.subject.as_deref().map(|s| interpolate(s, &context.variables)),
            };

            match sender.send(&outbound).await {
                Ok(receipt) => {
                    tracing::debug!(
                        execution_id = %context.id,
                        node_id = node.id.as_str(),
                        channel = %channel,
                        "message sent"
                    );
                    ActionResult::proceed()
                        .with_variable(
                            "last_message",
                            json!({
                                "channel": channel,
                                "to": outbound.to,
                                "message": outbound.message,
                                "messageId": receipt.message_id,
                                "sentAt": Utc::now().to_rfc3339(),
                            }),
                        )
                        .with_data(json!(receipt))
                }
                Err(e) => ActionResult::failure(format!("{channel} delivery failed: {e}")),
            }
        })
    }

    fn validate(&self, config: &Value) -> ValidationResult {
        let mut result = ValidationResult::valid();
        let parsed = match parse_config::<SendMessageConfig>(config) {
            Ok(c) => c,
            Err(e) => {
                result.error(e);
                return result;
            }
        };

        match parsed.channel {
            None => result.warning("no channel set; whatsapp will be used"),
            Some(channel) if !self.senders.contains_key(&channel) => {
                result.warning(format!("no sender is configured for channel '{channel}'"));
            }
            Some(_) => {}
        }
        if parsed.recipient.as_deref().is_none_or(|r| r.trim().is_empty()) {
            result.error("recipient is required");
        }
        let has_body = [&parsed.message, &parsed.template]
            .iter()
            .any(|field| field.as_deref().is_some_and(|s| !s.is_empty()));
        if !has_body {
            result.error("message or template is required");
        }
        result
    }
}
