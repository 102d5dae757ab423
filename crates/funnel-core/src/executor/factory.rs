//! Registry mapping node types to their executors.

use std::collections::HashMap;
use std::sync::Arc;

use funnel_types::funnel::NodeType;

use super::ai_response::AiResponseExecutor;
use super::condition::ConditionExecutor;
use super::delay::DelayExecutor;
use super::end::EndExecutor;
use super::send_message::SendMessageExecutor;
use super::track_event::TrackEventExecutor;
use super::trigger::TriggerExecutor;
use super::update_contact::UpdateContactExecutor;
use super::webhook::WebhookExecutor;
use super::{ExecutorServices, NodeExecutor};

/// Node type to executor lookup.
///
/// Built once at startup and shared read-only behind an `Arc`. Several type
/// labels can point at the same executor instance.
#[derive(Default, Clone)]
pub struct NodeExecutorFactory {
    executors: HashMap<NodeType, Arc<dyn NodeExecutor>>,
}

impl NodeExecutorFactory {
    /// An empty factory. Use [`NodeExecutorFactory::with_defaults`] for the
    /// built-in node types.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory with every built-in node type registered.
    pub fn with_defaults(services: ExecutorServices) -> Self {
        let mut factory = Self::new();

        let messaging: Arc<dyn NodeExecutor> = Arc::new(SendMessageExecutor::new(services.senders));
        for label in [
            NodeType::SendMessage,
            NodeType::SendWhatsapp,
            NodeType::SendEmail,
            NodeType::SendSms,
        ] {
            factory.register(label, Arc::clone(&messaging));
        }

        let http: Arc<dyn NodeExecutor> = Arc::new(WebhookExecutor::new(services.http));
        factory.register(NodeType::Webhook, Arc::clone(&http));
        factory.register(NodeType::ApiCall, http);

        factory.register(NodeType::Trigger, Arc::new(TriggerExecutor));
        factory.register(NodeType::End, Arc::new(EndExecutor));
        factory.register(NodeType::Condition, Arc::new(ConditionExecutor));
        factory.register(NodeType::Delay, Arc::new(DelayExecutor));
        factory.register(NodeType::AiResponse, Arc::new(AiResponseExecutor::new(services.ai)));
        factory.register(
            NodeType::UpdateContact,
            Arc::new(UpdateContactExecutor::new(services.contacts)),
        );
        factory.register(
            NodeType::TrackEvent,
            Arc::new(TrackEventExecutor::new(services.analytics)),
        );

        factory
    }

    /// Register (or replace) the executor for `node_type`.
    pub fn register(&mut self, node_type: NodeType, executor: Arc<dyn NodeExecutor>) {
        self.executors.insert(node_type, executor);
    }

    pub fn get(&self, node_type: &NodeType) -> Option<Arc<dyn NodeExecutor>> {
        self.executors.get(node_type).cloned()
    }

    pub fn has(&self, node_type: &NodeType) -> bool {
        self.executors.contains_key(node_type)
    }

    /// Registered node types, sorted by label.
    pub fn supported_types(&self) -> Vec<NodeType> {
        let mut types: Vec<NodeType> = self.executors.keys().cloned().collect();
        types.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::Fakes;

    #[test]
    fn test_defaults_cover_every_built_in() {
        let factory = NodeExecutorFactory::with_defaults(Fakes::new().services());
        for node_type in NodeType::BUILT_IN.iter() {
            assert!(factory.has(node_type), "missing {node_type}");
        }
        assert_eq!(factory.supported_types().len(), NodeType::BUILT_IN.len());
        assert!(!factory.has(&NodeType::Custom("carrier_pigeon".into())));
    }

    #[test]
    fn test_messaging_labels_share_one_executor() {
        let factory = NodeExecutorFactory::with_defaults(Fakes::new().services());
        let base = factory.get(&NodeType::SendMessage).unwrap();
        for label in [NodeType::SendWhatsapp, NodeType::SendEmail, NodeType::SendSms] {
            assert!(Arc::ptr_eq(&base, &factory.get(&label).unwrap()));
        }
        let webhook = factory.get(&NodeType::Webhook).unwrap();
        assert!(Arc::ptr_eq(&webhook, &factory.get(&NodeType::ApiCall).unwrap()));
        assert!(!Arc::ptr_eq(&base, &webhook));
    }

    #[test]
    fn test_register_custom_type() {
        let mut factory = NodeExecutorFactory::new();
        assert!(factory.supported_types().is_empty());
        factory.register(NodeType::Custom("noop".into()), Arc::new(TriggerExecutor));
        assert!(factory.has(&NodeType::parse("noop")));
        assert_eq!(factory.supported_types(), vec![NodeType::Custom("noop".into())]);
    }
}
