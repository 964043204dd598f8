//! Comparison operators for `condition` nodes.
//!
//! A condition reads one field from the running context and compares it with
//! a literal from the node's configuration. When both sides parse as numbers
//! the comparison is numeric, otherwise both sides are compared as text.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionOperator {
    #[default]
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    NotContains,
}

impl ConditionOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "not_equals",
            ConditionOperator::GreaterThan => "greater_than",
            ConditionOperator::LessThan => "less_than",
            ConditionOperator::Contains => "contains",
            ConditionOperator::NotContains => "not_contains",
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(ConditionOperator::Equals),
            "not_equals" => Ok(ConditionOperator::NotEquals),
            "greater_than" => Ok(ConditionOperator::GreaterThan),
            "less_than" => Ok(ConditionOperator::LessThan),
            "contains" => Ok(ConditionOperator::Contains),
            "not_contains" => Ok(ConditionOperator::NotContains),
            other => Err(format!("unknown condition operator: '{other}'")),
        }
    }
}

/// Look up a context field by key, falling back to a dotted path
/// (`lead.score`) when no top-level key matches.
pub fn lookup<'a>(context: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    if let Some(value) = context.get(field) {
        return Some(value);
    }
    let mut parts = field.split('.');
    let mut current = context.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Evaluate `left <operator> right`. A missing left side compares as `""`.
pub fn evaluate(left: Option<&Value>, operator: ConditionOperator, right: &Value) -> bool {
    match operator {
        ConditionOperator::Equals => compare(left, right) == Ordering::Equal,
        ConditionOperator::NotEquals => compare(left, right) != Ordering::Equal,
        ConditionOperator::GreaterThan => compare(left, right) == Ordering::Greater,
        ConditionOperator::LessThan => compare(left, right) == Ordering::Less,
        ConditionOperator::Contains => contains(left, right),
        ConditionOperator::NotContains => !contains(left, right),
    }
}

fn compare(left: Option<&Value>, right: &Value) -> Ordering {
    if let (Some(a), Some(b)) = (left.and_then(as_number), as_number(right)) {
        return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    }
    as_text(left).cmp(&as_text(Some(right)))
}

fn contains(left: Option<&Value>, right: &Value) -> bool {
    let needle = as_text(Some(right));
    match left {
        Some(Value::Array(items)) => items.iter().any(|item| as_text(Some(item)) == needle),
        other => as_text(other).contains(&needle),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
