//! Structural validation of funnel definitions.
//!
//! The engine itself runs whatever it is given; validation is the gate the
//! authoring layer and the CLI put in front of it. Problems are collected
//! into a `ValidationResult` rather than stopping at the first one.

use std::collections::{HashMap, HashSet};

use funnel_types::action::ValidationResult;
use funnel_types::config::EngineConfig;
use funnel_types::funnel::Funnel;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::executor::NodeExecutorFactory;

/// Check `funnel` against the registered executors and the size limits in
/// `config`.
pub fn validate_funnel(funnel: &Funnel, factory: &NodeExecutorFactory, config: &EngineConfig) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if funnel.nodes.is_empty() {
        result.error("funnel has no nodes");
        return result;
    }
    if funnel.nodes.len() > config.max_flow_nodes {
        result.error(format!(
            "funnel has {} nodes, more than the limit of {}",
            funnel.nodes.len(),
            config.max_flow_nodes
        ));
    }

    let mut ids = HashSet::new();
    for node in &funnel.nodes {
        if !ids.insert(node.id.as_str()) {
            result.error(format!("duplicate node ID '{}'", node.id));
        }
    }

    let entry = funnel.entry_node();
    if entry.is_none() {
        result.error("funnel has no entry node (no trigger and every node has an incoming connection)");
    }

    for node in &funnel.nodes {
        let scope = format!("node '{}'", node.id);

        match factory.get(&node.node_type) {
            Some(executor) => result.absorb(&scope, executor.validate(&node.config)),
            None => result.error(format!("{scope}: no executor registered for type '{}'", node.node_type)),
        }

        for connection in &node.connections {
            if connection.source_node_id != node.id {
                result.warning(format!(
                    "{scope}: connection '{}' declares source '{}'",
                    connection.id, connection.source_node_id
                ));
            }
            if !ids.contains(connection.target_node_id.as_str()) {
                result.error(format!(
                    "{scope}: connection '{}' targets unknown node '{}'",
                    connection.id, connection.target_node_id
                ));
            }
            if let Some(condition) = &connection.condition {
                if !condition.operator.is_known() {
                    result.error(format!(
                        "{scope}: connection '{}' uses unknown operator '{}'",
                        connection.id,
                        condition.operator.as_str()
                    ));
                }
                if condition.field.trim().is_empty() {
                    result.error(format!("{scope}: connection '{}' has an empty condition field", connection.id));
                }
            }
        }
    }

    check_graph(funnel, entry.map(|n| n.id.as_str()), config, &mut result);
    result
}

/// Cycle and depth checks over the connection graph.
///
/// Depth is the number of nodes on the longest path from the entry node.
fn check_graph(funnel: &Funnel, entry: Option<&str>, config: &EngineConfig, result: &mut ValidationResult) {
    let mut graph = DiGraph::<&str, ()>::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for node in &funnel.nodes {
        index.entry(node.id.as_str()).or_insert_with(|| graph.add_node(node.id.as_str()));
    }
    for connection in funnel.connections() {
        if let (Some(&from), Some(&to)) = (
            index.get(connection.source_node_id.as_str()),
            index.get(connection.target_node_id.as_str()),
        ) {
            graph.add_edge(from, to, ());
        }
    }

    let order = match toposort(&graph, None) {
        Ok(order) => order,
        Err(cycle) => {
            result.error(format!("funnel contains a cycle through node '{}'", graph[cycle.node_id()]));
            return;
        }
    };

    let Some(&start) = entry.and_then(|id| index.get(id)) else {
        return;
    };

    let mut depth: HashMap<NodeIndex, usize> = HashMap::from([(start, 1)]);
    for ix in order {
        let Some(&d) = depth.get(&ix) else { continue };
        for next in graph.neighbors(ix) {
            let entry = depth.entry(next).or_insert(0);
            *entry = (*entry).max(d + 1);
        }
    }

    let longest = depth.values().copied().max().unwrap_or(0);
    if longest > config.max_flow_depth {
        result.error(format!(
            "funnel is {longest} nodes deep, more than the limit of {}",
            config.max_flow_depth
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::Fakes;
    use serde_json::{Value, json};

    fn funnel(value: Value) -> Funnel {
        serde_json::from_value(value).unwrap()
    }

    fn factory() -> NodeExecutorFactory {
        NodeExecutorFactory::with_defaults(Fakes::new().services())
    }

    fn check(f: &Funnel) -> ValidationResult {
        validate_funnel(f, &factory(), &EngineConfig::default())
    }

    fn edge(id: &str, from: &str, to: &str) -> Value {
        json!({ "id": id, "sourceNodeId": from, "targetNodeId": to })
    }

    /// A trigger followed by `len - 1` delay nodes in a line.
    fn chain(len: usize) -> Funnel {
        let nodes: Vec<Value> = (0..len)
            .map(|i| {
                let id = format!("n{i}");
                let node_type = if i == 0 { "trigger" } else { "delay" };
                let connections = if i + 1 < len {
                    vec![edge(&format!("c{i}"), &id, &format!("n{}", i + 1))]
                } else {
                    Vec::new()
                };
                json!({ "id": id, "type": node_type, "config": { "duration": 1 }, "connections": connections })
            })
            .collect();
        funnel(json!({ "id": "chain", "nodes": nodes }))
    }

    #[test]
    fn test_valid_funnel() {
        let f = funnel(json!({
            "id": "ok",
            "nodes": [
                { "id": "start", "type": "trigger", "connections": [ edge("c1", "start", "check") ] },
                { "id": "check", "type": "condition",
                  "config": { "condition": { "field": "score", "operator": "greater_than", "value": 50 } },
                  "connections": [
                    { "id": "c2", "sourceNodeId": "check", "targetNodeId": "done",
                      "condition": { "field": "condition_result", "operator": "equals", "value": true } } ] },
                { "id": "done", "type": "end" }
            ]
        }));
        let result = check(&f);
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_empty_funnel_rejected() {
        let result = check(&funnel(json!({ "id": "empty", "nodes": [] })));
        assert!(!result.is_valid);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let f = funnel(json!({
            "id": "dup",
            "nodes": [
                { "id": "start", "type": "trigger" },
                { "id": "start", "type": "end" }
            ]
        }));
        let result = check(&f);
        assert!(result.errors.iter().any(|e| e.contains("duplicate")));
    }

    #[test]
    fn test_cycle_rejected() {
        let f = funnel(json!({
            "id": "loop",
            "nodes": [
                { "id": "start", "type": "trigger", "connections": [ edge("c1", "start", "a") ] },
                { "id": "a", "type": "delay", "config": { "duration": 1 }, "connections": [ edge("c2", "a", "b") ] },
                { "id": "b", "type": "delay", "config": { "duration": 1 }, "connections": [ edge("c3", "b", "a") ] }
            ]
        }));
        let result = check(&f);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("cycle")));
    }

    #[test]
    fn test_unknown_operator_and_target_rejected() {
        let f = funnel(json!({
            "id": "bad",
            "nodes": [
                { "id": "start", "type": "trigger", "connections": [
                    { "id": "c1", "sourceNodeId": "start", "targetNodeId": "ghost",
                      "condition": { "field": "x", "operator": "matches", "value": "y" } } ] }
            ]
        }));
        let result = check(&f);
        assert!(result.errors.iter().any(|e| e.contains("unknown operator 'matches'")));
        assert!(result.errors.iter().any(|e| e.contains("unknown node 'ghost'")));
    }

    #[test]
    fn test_unregistered_type_and_bad_config_rejected() {
        let f = funnel(json!({
            "id": "types",
            "nodes": [
                { "id": "start", "type": "trigger", "connections": [
                    edge("c1", "start", "fax"), edge("c2", "start", "hook") ] },
                { "id": "fax", "type": "send_fax" },
                { "id": "hook", "type": "webhook", "config": { "url": "ftp://example.com" } }
            ]
        }));
        let result = check(&f);
        assert!(result.errors.iter().any(|e| e.contains("send_fax")));
        assert!(result.errors.iter().any(|e| e.starts_with("node 'hook'")));
    }

    #[test]
    fn test_source_mismatch_is_warning() {
        let f = funnel(json!({
            "id": "mismatch",
            "nodes": [
                { "id": "start", "type": "trigger", "connections": [ edge("c1", "elsewhere", "done") ] },
                { "id": "done", "type": "end" }
            ]
        }));
        let result = check(&f);
        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_size_limits() {
        let config = EngineConfig { max_flow_nodes: 5, max_flow_depth: 3, ..EngineConfig::default() };

        let short = validate_funnel(&chain(3), &factory(), &config);
        assert!(short.is_valid, "{:?}", short.errors);

        let deep = validate_funnel(&chain(4), &factory(), &config);
        assert!(deep.errors.iter().any(|e| e.contains("deep")));
        assert!(!deep.errors.iter().any(|e| e.contains("nodes, more than")));

        let big = validate_funnel(&chain(6), &factory(), &config);
        assert!(big.errors.iter().any(|e| e.contains("nodes, more than")));
    }

    #[test]
    fn test_no_entry_node_rejected() {
        let f = funnel(json!({
            "id": "ring",
            "nodes": [
                { "id": "a", "type": "end", "connections": [ edge("c1", "a", "b") ] },
                { "id": "b", "type": "end", "connections": [ edge("c2", "b", "a") ] }
            ]
        }));
        let result = check(&f);
        assert!(result.errors.iter().any(|e| e.contains("entry node")));
        assert!(result.errors.iter().any(|e| e.contains("cycle")));
    }
}
