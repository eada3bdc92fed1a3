use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A persisted record in a document collection.
///
/// Field values are kept as raw JSON so any model can be stored in the same
/// table. Enumerated attributes are plain strings inside `fields`; nothing
/// stops application code from assigning an arbitrary value with [`Document::set`],
/// only the generated mutators check the declared tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    /// Name of the model this document was instantiated from.
    pub model: String,
    pub collection: String,
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(model: impl Into<String>, collection: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            model: model.into(),
            collection: collection.into(),
            fields: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String value of a field, `None` when absent or not a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Assign a field in memory. Does not touch the store.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }
}

/// Input for inserting a document directly through the database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDocumentInput {
    pub model: String,
    pub collection: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}
