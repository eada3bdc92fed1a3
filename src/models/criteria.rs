use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Document;

/// A reusable, lazily evaluated query over one collection.
///
/// Scopes return a `Criteria`; the store decides how to run it. The selector
/// only holds equality conditions on document fields. `types` narrows the
/// result to documents instantiated from specific models and is left empty
/// for root models, so a parent model's scope also returns its subclasses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    model: String,
    collection: String,
    #[serde(default)]
    types: Vec<String>,
    selector: Map<String, Value>,
}

impl Criteria {
    pub fn new(model: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            collection: collection.into(),
            types: Vec::new(),
            selector: Map::new(),
        }
    }

    /// Add an equality condition, replacing any previous condition on `field`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.selector.insert(field.into(), value.into());
        self
    }

    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }

    /// The model the criteria was built for.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn selector(&self) -> &Map<String, Value> {
        &self.selector
    }

    /// Evaluate the criteria against a single in-memory document, with the
    /// same equality the SQLite store applies.
    pub fn matches(&self, document: &Document) -> bool {
        if document.collection != self.collection {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&document.model) {
            return false;
        }
        self.selector.iter().all(|(field, expected)| match document.get(field) {
            Some(actual) => json_eq(actual, expected),
            None => expected.is_null(),
        })
    }
}

/// Equality as `json_extract` sees it: booleans are the integers 0 and 1 and
/// numbers compare by value, so `true == 1` and `2.0 == 2`.
fn json_eq(actual: &Value, expected: &Value) -> bool {
    match (as_number(actual), as_number(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => actual == expected,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
