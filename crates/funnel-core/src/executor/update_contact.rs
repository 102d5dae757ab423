//! `update_contact` nodes.

use std::sync::Arc;

use funnel_types::action::{ActionResult, ValidationResult};
use funnel_types::execution::ExecutionContext;
use funnel_types::funnel::FunnelNode;
use funnel_types::node_config::UpdateContactConfig;
use serde_json::{Map, Value};

use super::{NodeExecutor, parse_config, typed_config};
use crate::delivery::{BoxFuture, ContactStore};
use crate::interpolate::{interpolate, interpolate_value};

const DEFAULT_CONTACT_ID: &str = "{{contact.id}}";

/// Writes interpolated fields to the contact store and mirrors them into
/// the `contact` variable.
pub struct UpdateContactExecutor {
    contacts: Arc<dyn ContactStore>,
}

impl UpdateContactExecutor {
    pub fn new(contacts: Arc<dyn ContactStore>) -> Self {
        Self { contacts }
    }
}

impl NodeExecutor for UpdateContactExecutor {
    fn execute<'a>(&'a self, node: &'a FunnelNode, context: &'a ExecutionContext) -> BoxFuture<'a, ActionResult> {
        Box::pin(async move {
            let config: UpdateContactConfig = match typed_config(node) {
                Ok(c) => c,
                Err(failed) => return failed,
            };
            let vars = &context.variables;
            let contact_id = interpolate(config.contact_id.as_deref().unwrap_or(DEFAULT_CONTACT_ID), vars);
            if contact_id.trim().is_empty() || contact_id.contains("{{") {
                return ActionResult::failure("contact id could not be resolved");
            }

            let fields: Map<String, Value> = config
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, vars)))
                .collect();

            let stored = match self.contacts.update_contact(&contact_id, &fields).await {
                Ok(stored) => stored,
                Err(e) => return ActionResult::failure(format!("contact update failed: {e}")),
            };

            let mut contact = match vars.get("contact") {
                Some(Value::Object(existing)) => existing.clone(),
                _ => Map::new(),
            };
            contact.extend(fields);
            ActionResult::proceed()
                .with_variable("contact", Value::Object(contact))
                .with_data(stored)
        })
    }

    fn validate(&self, config: &Value) -> ValidationResult {
        let mut result = ValidationResult::valid();
        match parse_config::<UpdateContactConfig>(config) {
            Ok(c) => {
                if c.fields.is_empty() {
                    result.error("fields must not be empty");
                }
                if c.contact_id.is_none() {
                    result.warning("no contactId set; {{contact.id}} will be used");
                }
            }
            Err(e) => result.error(e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{FakeContacts, context, node};
    use serde_json::json;

    #[tokio::test]
    async fn test_updates_store_and_merges_contact() {
        let store = Arc::new(FakeContacts::default());
        let exec = UpdateContactExecutor::new(store.clone());
        let n = node(json!({
            "id": "tag",
            "type": "update_contact",
            "config": { "fields": { "stage": "lead", "lastReply": "{{ai_response}}" } }
        }));
        let ctx = context(json!({
            "contact": { "id": "c-7", "name": "Ada" },
            "ai_response": "sounds good"
        }));

        let result = exec.execute(&n, &ctx).await;

        assert!(result.success);
        let contact = &result.variables.unwrap()["contact"];
        assert_eq!(contact["name"], json!("Ada"));
        assert_eq!(contact["stage"], json!("lead"));
        assert_eq!(contact["lastReply"], json!("sounds good"));
        let updates = store.updates.lock().unwrap();
        assert_eq!(updates[0].0, "c-7");
    }

    #[tokio::test]
    async fn test_unresolved_contact_id_fails() {
        let exec = UpdateContactExecutor::new(Arc::new(FakeContacts::default()));
        let n = node(json!({
            "id": "tag",
            "type": "update_contact",
            "config": { "fields": { "stage": "lead" } }
        }));
        let result = exec.execute(&n, &context(json!({}))).await;
        assert!(!result.success);
    }

    #[test]
    fn test_validate() {
        let exec = UpdateContactExecutor::new(Arc::new(FakeContacts::default()));
        assert!(!exec.validate(&json!({ "fields": {} })).is_valid);
        assert!(!exec.validate(&json!({})).is_valid);
        let v = exec.validate(&json!({ "fields": { "a": 1 } }));
        assert!(v.is_valid);
        assert_eq!(v.warnings.len(), 1);
    }
}
