//! Funnel definition types.
//!
//! A `Funnel` is the author-facing workflow graph: typed nodes with
//! node-specific configuration and outgoing connections, optionally guarded
//! by conditions. Funnels arrive from the authoring dashboard as camelCase
//! JSON (or YAML) and are read-only to the engine.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::NodeConfigError;

// ---------------------------------------------------------------------------
// Funnel
// ---------------------------------------------------------------------------

/// A versioned funnel definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Funnel {
    /// Funnel ID assigned by the authoring layer.
    pub id: String,
    /// Human-readable funnel name.
    #[serde(default)]
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Definition version, bumped on every published edit.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Nodes in declaration order. Declaration order matters for entry-node
    /// discovery.
    pub nodes: Vec<FunnelNode>,
    /// Free-form tags from the authoring layer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Extensible metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

fn default_version() -> u32 {
    1
}

impl Funnel {
    /// Look up a node by ID.
    pub fn node(&self, id: &str) -> Option<&FunnelNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Iterate over every connection in the funnel, in node declaration order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.nodes.iter().flat_map(|n| n.connections.iter())
    }

    /// Whether any connection in the funnel points at `node_id`.
    pub fn has_incoming(&self, node_id: &str) -> bool {
        self.connections().any(|c| c.target_node_id == node_id)
    }

    /// Find the node a run starts from.
    ///
    /// The first node typed `trigger` wins. Without one, the first node (in
    /// declaration order) that no connection points at is the entry.
    pub fn entry_node(&self) -> Option<&FunnelNode> {
        self.nodes
            .iter()
            .find(|n| n.node_type == NodeType::Trigger)
            .or_else(|| self.nodes.iter().find(|n| !self.has_incoming(&n.id)))
    }
}

// ---------------------------------------------------------------------------
// FunnelNode
// ---------------------------------------------------------------------------

/// A single step in the funnel graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelNode {
    /// Node ID, unique within a funnel.
    pub id: String,
    /// Type label used to pick the node executor.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Node-type-specific configuration. Read through [`FunnelNode::config_as`].
    #[serde(default = "empty_config")]
    pub config: Value,
    /// Outgoing edges in declaration order.
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Canvas position from the visual builder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<NodePosition>,
}

fn empty_config() -> Value {
    Value::Object(serde_json::Map::new())
}

impl FunnelNode {
    /// Deserialize this node's configuration into a typed config struct.
    pub fn config_as<T: DeserializeOwned>(&self) -> Result<T, NodeConfigError> {
        let config = if self.config.is_null() {
            empty_config()
        } else {
            self.config.clone()
        };
        serde_json::from_value(config).map_err(|e| NodeConfigError {
            node_id: self.id.clone(),
            node_type: self.node_type.clone(),
            message: e.to_string(),
        })
    }

    /// Label used in logs: the display name when set, the ID otherwise.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Canvas coordinates from the visual builder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

// ---------------------------------------------------------------------------
// NodeType
// ---------------------------------------------------------------------------

/// The type label of a funnel node.
///
/// Built-in labels are a closed set; any other label deserializes into
/// `Custom` so that handlers registered at runtime can claim it. Several
/// labels intentionally share one handler (every `send_*` label resolves to
/// the messaging executor, which reads the channel from the node config).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Trigger,
    SendMessage,
    SendWhatsapp,
    SendEmail,
    SendSms,
    AiResponse,
    Condition,
    Delay,
    Webhook,
    ApiCall,
    UpdateContact,
    TrackEvent,
    End,
    /// A label with no built-in meaning.
    Custom(String),
}

impl NodeType {
    /// Every built-in node type, in a stable order.
    pub const BUILT_IN: [NodeType; 13] = [
        NodeType::Trigger,
        NodeType::SendMessage,
        NodeType::SendWhatsapp,
        NodeType::SendEmail,
        NodeType::SendSms,
        NodeType::AiResponse,
        NodeType::Condition,
        NodeType::Delay,
        NodeType::Webhook,
        NodeType::ApiCall,
        NodeType::UpdateContact,
        NodeType::TrackEvent,
        NodeType::End,
    ];

    /// The wire label for this type.
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Trigger => "trigger",
            NodeType::SendMessage => "send_message",
            NodeType::SendWhatsapp => "send_whatsapp",
            NodeType::SendEmail => "send_email",
            NodeType::SendSms => "send_sms",
            NodeType::AiResponse => "ai_response",
            NodeType::Condition => "condition",
            NodeType::Delay => "delay",
            NodeType::Webhook => "webhook",
            NodeType::ApiCall => "api_call",
            NodeType::UpdateContact => "update_contact",
            NodeType::TrackEvent => "track_event",
            NodeType::End => "end",
            NodeType::Custom(label) => label,
        }
    }

    /// Parse a wire label. Never fails: unknown labels become `Custom`.
    pub fn parse(label: &str) -> Self {
        match label {
            "trigger" => NodeType::Trigger,
            "send_message" => NodeType::SendMessage,
            "send_whatsapp" => NodeType::SendWhatsapp,
            "send_email" => NodeType::SendEmail,
            "send_sms" => NodeType::SendSms,
            "ai_response" => NodeType::AiResponse,
            "condition" => NodeType::Condition,
            "delay" => NodeType::Delay,
            "webhook" => NodeType::Webhook,
            "api_call" => NodeType::ApiCall,
            "update_contact" => NodeType::UpdateContact,
            "track_event" => NodeType::TrackEvent,
            "end" | "exit" => NodeType::End,
            other => NodeType::Custom(other.to_string()),
        }
    }
}

impl From<String> for NodeType {
    fn from(label: String) -> Self {
        NodeType::parse(&label)
    }
}

impl From<NodeType> for String {
    fn from(node_type: NodeType) -> Self {
        node_type.as_str().to_string()
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Connection & Condition
// ---------------------------------------------------------------------------

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    /// Guard evaluated each time the edge is considered. `None` = always eligible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

/// A guard on an edge (or the predicate of a condition node).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dot-separated path into the execution variables (e.g. `contact.score`).
    pub field: String,
    pub operator: ConditionOperator,
    /// Right-hand operand. `None` when absent from the definition, which is
    /// distinct from an explicit `null`.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value),
        }
    }
}

/// Keeps an explicit `null` as `Some(Value::Null)`; a missing key stays `None`
/// through `#[serde(default)]`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Comparison operator of a [`Condition`].
///
/// Unrecognized labels are preserved in `Unknown` so funnel validation can
/// report them; at run time they evaluate to false.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    Exists,
    Unknown(String),
}

impl ConditionOperator {
    pub fn as_str(&self) -> &str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "not_equals",
            ConditionOperator::GreaterThan => "greater_than",
            ConditionOperator::LessThan => "less_than",
            ConditionOperator::Contains => "contains",
            ConditionOperator::Exists => "exists",
            ConditionOperator::Unknown(label) => label,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ConditionOperator::Unknown(_))
    }
}

impl From<String> for ConditionOperator {
    fn from(label: String) -> Self {
        match label.as_str() {
            "equals" => ConditionOperator::Equals,
            "not_equals" => ConditionOperator::NotEquals,
            "greater_than" => ConditionOperator::GreaterThan,
            "less_than" => ConditionOperator::LessThan,
            "contains" => ConditionOperator::Contains,
            "exists" => ConditionOperator::Exists,
            _ => ConditionOperator::Unknown(label),
        }
    }
}

impl From<ConditionOperator> for String {
    fn from(op: ConditionOperator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
