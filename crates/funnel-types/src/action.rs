//! Node execution outcomes and validation verdicts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The outcome of one node execution attempt.
///
/// Produced by a node executor and consumed immediately by the engine:
/// `variables` are merged into the run, `next_node_id` overrides the graph's
/// connections, and `should_continue = false` ends the run as completed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub success: bool,
    pub should_continue: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl ActionResult {
    /// Succeeded; traversal continues.
    pub fn proceed() -> Self {
        Self {
            success: true,
            should_continue: true,
            ..Default::default()
        }
    }

    /// Succeeded; the run ends here as completed.
    pub fn finish() -> Self {
        Self {
            success: true,
            should_continue: false,
            ..Default::default()
        }
    }

    /// Failed with `error`; the engine routes this into the retry path.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            should_continue: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: Value) -> Self {
        self.variables
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_variables(mut self, vars: HashMap<String, Value>) -> Self {
        self.variables.get_or_insert_with(HashMap::new).extend(vars);
        self
    }

    pub fn with_next_node(mut self, node_id: impl Into<String>) -> Self {
        self.next_node_id = Some(node_id.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Authoring-time verdict on a node config or a whole funnel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            ..Default::default()
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Fold `other` into `self`, prefixing each message with `scope`.
    pub fn absorb(&mut self, scope: &str, other: ValidationResult) {
        for e in other.errors {
            self.error(format!("{scope}: {e}"));
        }
        for w in other.warnings {
            self.warning(format!("{scope}: {w}"));
        }
        if !other.is_valid {
            self.is_valid = false;
        }
    }
}
