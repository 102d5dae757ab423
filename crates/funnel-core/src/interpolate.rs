//! `{{path}}` placeholder substitution from the variable bag.
//!
//! Placeholders resolve with the same dot-path lookup as conditions.
//! Unresolved placeholders stay in the output verbatim.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::variables::{render_value, resolve_path};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(\w+(?:\.\w+)*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Replace every `{{path}}` in `template` with the value at `path`.
pub fn interpolate(template: &str, variables: &HashMap<String, Value>) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match resolve_path(variables, &caps[1]) {
            Some(value) => render_value(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Interpolate every string inside a JSON value, recursing through arrays
/// and objects. Object keys are left untouched.
pub fn interpolate_value(value: &Value, variables: &HashMap<String, Value>) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate(s, variables)),
        Value::Array(items) => Value::Array(items.iter().map(|v| interpolate_value(v, variables)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, variables)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: Value) -> HashMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_resolves_nested_number() {
        assert_eq!(interpolate("{{a.b}}", &vars(json!({ "a": { "b": 42 } }))), "42");
    }

    #[test]
    fn test_unresolved_left_verbatim() {
        assert_eq!(interpolate("{{a.b}}", &HashMap::new()), "{{a.b}}");
        assert_eq!(
            interpolate("Hi {{ name }}, code {{code}}", &vars(json!({ "name": "Ada" }))),
            "Hi Ada, code {{code}}"
        );
    }

    #[test]
    fn test_inner_whitespace_allowed() {
        assert_eq!(interpolate("{{  contact.name  }}", &vars(json!({ "contact": { "name": "Ada" } }))), "Ada");
    }

    #[test]
    fn test_renders_js_and_json_forms() {
        let v = vars(json!({ "ok": true, "nothing": null, "tags": ["a", "b"], "obj": { "k": 1 } }));
        assert_eq!(interpolate("{{ok}}/{{nothing}}", &v), "true/null");
        assert_eq!(interpolate("{{tags}}", &v), r#"["a","b"]"#);
        assert_eq!(interpolate("{{obj}}", &v), r#"{"k":1}"#);
        assert_eq!(interpolate("{{tags.0}}", &v), "a");
    }

    #[test]
    fn test_malformed_placeholders_untouched() {
        let v = vars(json!({ "a": 1 }));
        assert_eq!(interpolate("{{a-b}} {{}} {a}", &v), "{{a-b}} {{}} {a}");
    }

    #[test]
    fn test_interpolate_value_recurses() {
        let v = vars(json!({ "contact": { "id": "c-1", "score": 7 } }));
        let payload = json!({
            "id": "{{contact.id}}",
            "nested": { "score": "{{contact.score}}", "list": ["{{contact.id}}", 3] },
            "raw": 1
        });
        assert_eq!(
            interpolate_value(&payload, &v),
            json!({
                "id": "c-1",
                "nested": { "score": "7", "list": ["c-1", 3] },
                "raw": 1
            })
        );
    }
}
