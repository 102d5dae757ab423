//! Node executors: the side-effecting handler behind each node type.
//!
//! An executor never fails across its boundary. Internal problems (bad
//! config, delivery errors) come back as `ActionResult { success: false }`
//! and the engine decides whether to retry.

pub mod ai_response;
pub mod condition;
pub mod delay;
pub mod end;
pub mod factory;
pub mod send_message;
pub mod track_event;
pub mod trigger;
pub mod update_contact;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;
use std::sync::Arc;

use funnel_types::action::{ActionResult, ValidationResult};
use funnel_types::execution::ExecutionContext;
use funnel_types::funnel::FunnelNode;
use funnel_types::node_config::Channel;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::delivery::{AiProvider, AnalyticsSink, BoxFuture, ContactStore, HttpDispatcher, MessageSender};

pub use factory::NodeExecutorFactory;

/// Handler for one or more node types.
///
/// Object-safe so the factory can map several type labels onto a single
/// shared `Arc<dyn NodeExecutor>`.
pub trait NodeExecutor: Send + Sync {
    /// Run the node against a read-only view of the execution.
    fn execute<'a>(&'a self, node: &'a FunnelNode, context: &'a ExecutionContext) -> BoxFuture<'a, ActionResult>;

    /// Check a node config at authoring time.
    fn validate(&self, config: &Value) -> ValidationResult;

    /// Time spent in `execute` is not charged to the execution timeout.
    /// Only executors whose job is to wait opt out.
    fn exempt_from_timeout(&self) -> bool {
        false
    }
}

/// External services handed to the built-in executors.
#[derive(Clone)]
pub struct ExecutorServices {
    pub senders: HashMap<Channel, Arc<dyn MessageSender>>,
    pub http: Arc<dyn HttpDispatcher>,
    pub ai: Arc<dyn AiProvider>,
    pub contacts: Arc<dyn ContactStore>,
    pub analytics: Arc<dyn AnalyticsSink>,
}

/// Parse a raw node config for validation; `null` reads as `{}`.
pub(crate) fn parse_config<T: DeserializeOwned>(config: &Value) -> Result<T, String> {
    let config = if config.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        config.clone()
    };
    serde_json::from_value(config).map_err(|e| format!("invalid config: {e}"))
}

/// Read a node's typed config inside `execute`, turning failure into a
/// failed result.
pub(crate) fn typed_config<T: DeserializeOwned>(node: &FunnelNode) -> Result<T, ActionResult> {
    node.config_as::<T>().map_err(|e| ActionResult::failure(e.to_string()))
}
