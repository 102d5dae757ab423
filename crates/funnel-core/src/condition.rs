//! Condition evaluation for guarded connections and condition nodes.
//!
//! A condition never aborts traversal: malformed or unknown conditions
//! evaluate to false and leave a log entry on the execution.

use std::collections::HashMap;

use funnel_types::execution::{ExecutionContext, LogLevel};
use funnel_types::funnel::{Condition, ConditionOperator};
use serde_json::{Value, json};

use crate::variables::{resolve_path, strict_equals, to_js_string, to_number};

/// Why a condition could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    #[error("condition field is empty")]
    EmptyField,

    #[error("unknown condition operator '{0}'")]
    UnknownOperator(String),
}

/// Evaluate `condition` against a variable bag.
pub fn evaluate(condition: &Condition, variables: &HashMap<String, Value>) -> Result<bool, ConditionError> {
    if condition.field.trim().is_empty() {
        return Err(ConditionError::EmptyField);
    }

    let actual = resolve_path(variables, &condition.field);
    let expected = condition.value.as_ref();

    let result = match &condition.operator {
        ConditionOperator::Equals => strict_equals(actual, expected),
        ConditionOperator::NotEquals => !strict_equals(actual, expected),
        // NaN on either side makes both comparisons false.
        ConditionOperator::GreaterThan => to_number(actual) > to_number(expected),
        ConditionOperator::LessThan => to_number(actual) < to_number(expected),
        ConditionOperator::Contains => to_js_string(actual).contains(&to_js_string(expected)),
        ConditionOperator::Exists => !matches!(actual, None | Some(Value::Null)),
        ConditionOperator::Unknown(label) => {
            return Err(ConditionError::UnknownOperator(label.clone()));
        }
    };
    Ok(result)
}

/// Evaluate `condition` for a running execution.
///
/// Evaluation problems are recorded on the execution log (unknown operators
/// as warnings, malformed conditions as errors) and count as false.
pub fn evaluate_condition(
    condition: &Condition,
    context: &mut ExecutionContext,
    node_id: Option<&str>,
) -> bool {
    match evaluate(condition, &context.variables) {
        Ok(result) => result,
        Err(err) => {
            let level = match err {
                ConditionError::UnknownOperator(_) => LogLevel::Warn,
                ConditionError::EmptyField => LogLevel::Error,
            };
            tracing::warn!(
                execution_id = %context.id,
                node_id = node_id.unwrap_or_default(),
                error = %err,
                "condition evaluated to false"
            );
            context.log(
                level,
                node_id,
                format!("condition evaluation failed: {err}"),
                Some(json!({ "field": condition.field, "operator": condition.operator })),
            );
            false
        }
    }
}
