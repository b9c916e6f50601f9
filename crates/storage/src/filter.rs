//! Match filters

use crate::{Document, ObjectId, ID_FIELD};
use serde_json::Value;
use std::cmp::Ordering;

/// A single condition on a top-level field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals value
    Eq(String, Value),
    /// Field is greater than or equal to value
    Gte(String, Value),
    /// Field is less than or equal to value
    Lte(String, Value),
}

impl Condition {
    fn matches(&self, document: &Document) -> bool {
        match self {
            Condition::Eq(field, expected) => document.get(field) == Some(expected),
            Condition::Gte(field, bound) => document
                .get(field)
                .and_then(|v| compare_values(v, bound))
                .is_some_and(|o| o != Ordering::Less),
            Condition::Lte(field, bound) => document
                .get(field)
                .and_then(|v| compare_values(v, bound))
                .is_some_and(|o| o != Ordering::Greater),
        }
    }
}

/// Conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Filter matching everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on the generated object id
    pub fn by_id(id: ObjectId) -> Self {
        Self::new().eq(ID_FIELD, id)
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn gte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Gte(field.to_string(), value.into()));
        self
    }

    pub fn lte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Lte(field.to_string(), value.into()));
        self
    }

    /// Inclusive range on one field
    pub fn between(self, field: &str, start: impl Into<Value>, end: impl Into<Value>) -> Self {
        self.gte(field, start).lte(field, end)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Whether `document` satisfies every condition
    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(document))
    }
}

/// Order two values of the same kind. Numbers compare numerically and
/// strings lexicographically; anything else is incomparable.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
