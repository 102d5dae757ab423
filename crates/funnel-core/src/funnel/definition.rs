//! Funnel definition loading.
//!
//! Funnels arrive as JSON from the authoring layer or as YAML files written
//! by hand. Both deserialize into the same `Funnel` type; loading does not
//! validate (see [`super::validation::validate_funnel`]).

use std::path::Path;

use funnel_types::funnel::Funnel;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FunnelError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported funnel file extension '{0}' (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn parse_funnel_json(json: &str) -> Result<Funnel, FunnelError> {
    serde_json::from_str(json).map_err(|e| FunnelError::Parse(e.to_string()))
}

pub fn parse_funnel_yaml(yaml: &str) -> Result<Funnel, FunnelError> {
    serde_yaml_ng::from_str(yaml).map_err(|e| FunnelError::Parse(e.to_string()))
}

/// Read and parse a funnel file, choosing the format by extension.
pub fn load_funnel_file(path: &Path) -> Result<Funnel, FunnelError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "json" => parse_funnel_json(&std::fs::read_to_string(path)?),
        "yaml" | "yml" => parse_funnel_yaml(&std::fs::read_to_string(path)?),
        other => Err(FunnelError::UnsupportedFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funnel_types::funnel::{ConditionOperator, NodeType};

    const YAML: &str = r#"
id: welcome
name: Welcome flow
nodes:
  - id: start
    type: trigger
    connections:
      - id: c1
        sourceNodeId: start
        targetNodeId: greet
  - id: greet
    type: send_whatsapp
    config:
      recipient: "{{contact.phone}}"
      message: "Hi {{contact.name}}"
    connections:
      - id: c2
        sourceNodeId: greet
        targetNodeId: done
        condition:
          field: contact.optedIn
          operator: equals
          value: true
  - id: done
    type: end
"#;

    #[test]
    fn test_parse_yaml() {
        let funnel = parse_funnel_yaml(YAML).unwrap();
        assert_eq!(funnel.id, "welcome");
        assert_eq!(funnel.version, 1);
        assert_eq!(funnel.nodes.len(), 3);
        assert_eq!(funnel.nodes[1].node_type, NodeType::SendWhatsapp);
        let condition = funnel.nodes[1].connections[0].condition.as_ref().unwrap();
        assert_eq!(condition.operator, ConditionOperator::Equals);
    }

    #[test]
    fn test_parse_json_rejects_missing_nodes() {
        let err = parse_funnel_json(r#"{ "id": "x" }"#).unwrap_err();
        assert!(matches!(err, FunnelError::Parse(_)));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("welcome.YML");
        std::fs::write(&yaml_path, YAML).unwrap();
        assert_eq!(load_funnel_file(&yaml_path).unwrap().id, "welcome");

        let json_path = dir.path().join("tiny.json");
        std::fs::write(&json_path, r#"{ "id": "tiny", "nodes": [ { "id": "t", "type": "trigger" } ] }"#).unwrap();
        assert_eq!(load_funnel_file(&json_path).unwrap().nodes.len(), 1);

        let txt_path = dir.path().join("funnel.txt");
        std::fs::write(&txt_path, "").unwrap();
        assert!(matches!(load_funnel_file(&txt_path), Err(FunnelError::UnsupportedFormat(_))));

        assert!(matches!(load_funnel_file(&dir.path().join("missing.json")), Err(FunnelError::Io(_))));
    }
}
