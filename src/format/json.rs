//! JSON configuration parsing.
//!
//! JSON goes through `serde_json` and is then lifted into the config value
//! model. Since JSON has no unquoted scalars, strings containing `${...}`
//! are treated as pending substitutions.

use super::ParseIssue;
use crate::value::{ConfigTree, ConfigValue};
use serde_json::Value;

pub fn parse(input: &str) -> Result<ConfigTree, ParseIssue> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| ParseIssue::new(Some(e.line()), e.to_string()))?;
    tree_from_json(value).ok_or_else(|| ParseIssue::new(None, "root of a JSON config must be an object"))
}

/// Lift a `serde_json` value into a `ConfigTree`. `None` unless the root is
/// an object.
pub fn tree_from_json(value: Value) -> Option<ConfigTree> {
    match value_from_json(value) {
        ConfigValue::Tree(tree) => Some(tree),
        _ => None,
    }
}

fn value_from_json(value: Value) -> ConfigValue {
    match value {
        Value::Null => ConfigValue::Null,
        Value::Bool(b) => ConfigValue::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ConfigValue::Int(i)
            } else {
                ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => ConfigValue::string_or_reference(s),
        Value::Array(items) => {
            ConfigValue::List(items.into_iter().map(value_from_json).collect())
        }
        Value::Object(map) => ConfigValue::Tree(
            map.into_iter()
                .map(|(k, v)| (k, value_from_json(v)))
                .collect(),
        ),
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        value_from_json(value)
    }
}
