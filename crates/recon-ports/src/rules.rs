use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operators available to a leaf [`Condition::Cmp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Contains,
    Regex,
}

/// Tenant-configurable boolean expression evaluated against a JSON context
/// (typically a transaction or settlement projected to `serde_json::Value`).
/// Deserializable so tenants can author rules as data rather than code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Cmp {
        path: String,
        op: CmpOp,
        value: Value,
    },
}

impl Condition {
    pub fn evaluate(&self, context: &Value) -> bool {
        match self {
            Condition::And(children) => children.iter().all(|c| c.evaluate(context)),
            Condition::Or(children) => children.iter().any(|c| c.evaluate(context)),
            Condition::Not(inner) => !inner.evaluate(context),
            Condition::Cmp { path, op, value } => {
                let Some(found) = resolve_path(context, path) else {
                    return false;
                };
                apply_op(*op, found, value)
            }
        }
    }
}

/// Walks a dot-separated JSON path (`"metadata.card.brand"`) through nested
/// objects. Array indices are not supported; an absent key or a non-object
/// intermediate yields `None`.
fn resolve_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = context;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn apply_op(op: CmpOp, found: &Value, expected: &Value) -> bool {
    match op {
        CmpOp::Eq => found == expected,
        CmpOp::Ne => found != expected,
        CmpOp::Lt => compare_numeric(found, expected, |a, b| a < b),
        CmpOp::Le => compare_numeric(found, expected, |a, b| a <= b),
        CmpOp::Gt => compare_numeric(found, expected, |a, b| a > b),
        CmpOp::Ge => compare_numeric(found, expected, |a, b| a >= b),
        CmpOp::In => expected
            .as_array()
            .map(|candidates| candidates.iter().any(|c| c == found))
            .unwrap_or(false),
        CmpOp::Contains => match (found.as_str(), expected.as_str()) {
            (Some(haystack), Some(needle)) => haystack.contains(needle),
            _ => found
                .as_array()
                .map(|items| items.iter().any(|item| item == expected))
                .unwrap_or(false),
        },
        CmpOp::Regex => match (found.as_str(), expected.as_str()) {
            (Some(haystack), Some(pattern)) => Regex::new(pattern)
                .map(|re| re.is_match(haystack))
                .unwrap_or(false),
            _ => false,
        },
    }
}

fn compare_numeric(found: &Value, expected: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (found.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}
