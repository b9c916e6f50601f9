//! In-memory Gateway Implementation

use crate::pipeline;
use crate::{Document, Filter, Gateway, ObjectId, Stage, StorageError, ID_FIELD};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Documents of one collection plus its unique indexes
#[derive(Debug, Default)]
struct Collection {
    documents: Vec<Document>,
    unique_indexes: Vec<Vec<String>>,
}

impl Collection {
    /// Return the offending key if `document` collides with a unique index
    fn violated_key(&self, document: &Document) -> Option<String> {
        self.unique_indexes.iter().find_map(|fields| {
            let key: Vec<&Value> = fields
                .iter()
                .map(|f| document.get(f).unwrap_or(&Value::Null))
                .collect();
            let taken = self.documents.iter().any(|existing| {
                fields
                    .iter()
                    .zip(&key)
                    .all(|(f, v)| existing.get(f).unwrap_or(&Value::Null) == *v)
            });
            taken.then(|| {
                fields
                    .iter()
                    .zip(&key)
                    .map(|(f, v)| format!("{f}={v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
        })
    }
}

/// Document store held entirely in memory
pub struct MemoryGateway {
    collections: Mutex<HashMap<String, Collection>>,
}

impl MemoryGateway {
    /// Create an empty store
    pub fn new() -> Self {
        info!("Creating in-memory gateway");
        Self {
            collections: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Collection>>, StorageError> {
        self.collections
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
    }

    /// Enforce uniqueness of `fields` on every later insert into `collection`.
    ///
    /// Fails if documents already stored violate the index.
    pub fn create_unique_index(&self, collection: &str, fields: &[&str]) -> Result<(), StorageError> {
        let mut collections = self.lock()?;
        let entry = collections.entry(collection.to_string()).or_default();
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();

        let mut seen = Collection {
            documents: Vec::new(),
            unique_indexes: vec![fields.clone()],
        };
        for document in &entry.documents {
            if let Some(key) = seen.violated_key(document) {
                return Err(StorageError::UniqueViolation {
                    collection: collection.to_string(),
                    key,
                });
            }
            seen.documents.push(document.clone());
        }

        debug!("Unique index on {}: {:?}", collection, fields);
        entry.unique_indexes.push(fields);
        Ok(())
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.lock()
            .map(|c| c.get(collection).map_or(0, |c| c.documents.len()))
            .unwrap_or(0)
    }

    /// Drop all documents, keeping indexes (for testing)
    pub fn clear(&self) {
        if let Ok(mut collections) = self.lock() {
            for collection in collections.values_mut() {
                collection.documents.clear();
            }
        }
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl Gateway for MemoryGateway {
    fn fetch_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StorageError> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .and_then(|c| c.documents.iter().find(|d| filter.matches(d)))
            .cloned())
    }

    fn fetch_all(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StorageError> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .map(|c| c.documents.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    fn insert_one(&self, collection: &str, mut document: Document) -> Result<ObjectId, StorageError> {
        let mut collections = self.lock()?;
        let entry = collections.entry(collection.to_string()).or_default();

        if let Some(key) = entry.violated_key(&document) {
            return Err(StorageError::UniqueViolation {
                collection: collection.to_string(),
                key,
            });
        }

        let id = ObjectId::new();
        document.insert(ID_FIELD.to_string(), id.into());
        entry.documents.push(document);
        debug!("Inserted document {} into {}", id, collection);

        Ok(id)
    }

    fn run_aggregation(&self, collection: &str, stages: &[Stage]) -> Result<Vec<Document>, StorageError> {
        let documents = self.fetch_all(collection, &Filter::new())?;
        pipeline::run(documents, stages)
    }
}
