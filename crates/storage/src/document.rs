//! Stored documents and generated ids

use crate::StorageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Field holding the generated object id of every stored document
pub const ID_FIELD: &str = "_id";

/// A stored record: a JSON object keyed by field name
pub type Document = Map<String, Value>;

/// Identifier generated by the gateway on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ObjectId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| StorageError::SerializationError(format!("Invalid object id {s}: {e}")))
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::String(id.to_string())
    }
}

/// Serialize a record into a document
pub fn to_document<T: Serialize>(record: &T) -> Result<Document, StorageError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StorageError::SerializationError(format!(
            "Expected an object, got {other}"
        ))),
    }
}

/// Deserialize a document into a typed record
pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StorageError> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Probe {
        name: String,
        level: i32,
    }

    #[test]
    fn test_object_id_parse() {
        let id = ObjectId::new();
        let parsed: ObjectId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-an-id".parse::<ObjectId>().is_err());
    }

    #[test]
    fn test_document_conversion() {
        let doc = to_document(&Probe { name: "a".into(), level: 3 }).unwrap();
        assert_eq!(doc.get("level"), Some(&json!(3)));

        let back: Probe = from_document(doc).unwrap();
        assert_eq!(back.name, "a");
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(to_document(&5).is_err());
    }
}
