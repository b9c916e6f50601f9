//! Collection with a uniqueness-checked insert

use crate::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use storage::{from_document, to_document, Document, Filter, SharedGateway, Stage, StorageError};
use tracing::{debug, info, warn};

/// Typed access to one named collection. Remembers the message of the
/// last rejected insert.
pub(crate) struct KeyedCollection {
    gateway: SharedGateway,
    name: &'static str,
    latest_error: Option<String>,
}

impl KeyedCollection {
    pub(crate) fn new(gateway: SharedGateway, name: &'static str) -> Self {
        Self {
            gateway,
            name,
            latest_error: None,
        }
    }

    pub(crate) fn latest_error(&self) -> Option<&str> {
        self.latest_error.as_deref()
    }

    pub(crate) fn find_one<T: DeserializeOwned>(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        debug!("Finding one in {} with {:?}", self.name, filter);
        match self.gateway.fetch_one(self.name, filter)? {
            Some(document) => Ok(Some(from_document(document)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn find_all<T: DeserializeOwned>(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        debug!("Finding all in {} with {:?}", self.name, filter);
        self.gateway
            .fetch_all(self.name, filter)?
            .into_iter()
            .map(|d| from_document(d).map_err(StoreError::from))
            .collect()
    }

    pub(crate) fn aggregate(&self, stages: &[Stage]) -> Result<Vec<Document>, StoreError> {
        debug!("Aggregating {} with {} stages", self.name, stages.len());
        Ok(self.gateway.run_aggregation(self.name, stages)?)
    }

    /// Insert `record` unless a document already matches `key`.
    ///
    /// The pre-check and the write are not atomic; a gateway unique index
    /// catches the race and is reported the same way.
    pub(crate) fn insert_unique<N, T>(&mut self, key: &Filter, record: &N, duplicate: String) -> Result<T, StoreError>
    where
        N: Serialize,
        T: DeserializeOwned,
    {
        self.latest_error = None;

        if self.gateway.fetch_one(self.name, key)?.is_some() {
            return Err(self.reject(duplicate));
        }

        let id = match self.gateway.insert_one(self.name, to_document(record)?) {
            Ok(id) => id,
            Err(StorageError::UniqueViolation { .. }) => return Err(self.reject(duplicate)),
            Err(e) => return Err(e.into()),
        };
        info!("Inserted {} into {}", id, self.name);

        self.find_one(&Filter::by_id(id))?
            .ok_or(StoreError::Storage(StorageError::NotFound))
    }

    fn reject(&mut self, message: String) -> StoreError {
        warn!("{}", message);
        self.latest_error = Some(message.clone());
        StoreError::DuplicateKey(message)
    }
}

/// `value` unchanged if finite. Documents cannot carry NaN or infinity.
pub(crate) fn finite(field: &'static str, value: f64) -> Result<f64, StoreError> {
    if value.is_finite() {
        Ok(value)
    } else {
        warn!("Rejected non-finite {} {}", field, value);
        Err(StoreError::NonFinite { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use storage::{Gateway, MemoryGateway, ObjectId};

    /// Gateway whose lookups can be made to miss, so inserts race past the pre-check
    struct StaleReads {
        inner: MemoryGateway,
        stale: AtomicBool,
    }

    impl Gateway for StaleReads {
        fn fetch_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StorageError> {
            if self.stale.load(Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.fetch_one(collection, filter)
        }

        fn fetch_all(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StorageError> {
            self.inner.fetch_all(collection, filter)
        }

        fn insert_one(&self, collection: &str, document: Document) -> Result<ObjectId, StorageError> {
            self.inner.insert_one(collection, document)
        }

        fn run_aggregation(&self, collection: &str, stages: &[Stage]) -> Result<Vec<Document>, StorageError> {
            self.inner.run_aggregation(collection, stages)
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Tag {
        name: String,
    }

    fn tag(name: &str) -> Tag {
        Tag { name: name.to_string() }
    }

    #[test]
    fn test_unique_index_catches_missed_precheck() {
        let gateway = Arc::new(StaleReads {
            inner: MemoryGateway::new(),
            stale: AtomicBool::new(false),
        });
        gateway.inner.create_unique_index("tags", &["name"]).unwrap();
        let mut collection = KeyedCollection::new(gateway.clone(), "tags");
        let key = Filter::new().eq("name", "a");

        let stored: Tag = collection
            .insert_unique(&key, &tag("a"), "Tag a already exists".to_string())
            .unwrap();
        assert_eq!(stored.name, "a");

        gateway.stale.store(true, Ordering::SeqCst);
        let err = collection
            .insert_unique::<_, Tag>(&key, &tag("a"), "Tag a already exists".to_string())
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateKey(ref m) if m == "Tag a already exists"));
        assert_eq!(collection.latest_error(), Some("Tag a already exists"));
        assert_eq!(gateway.inner.count("tags"), 1);
    }

    #[test]
    fn test_finite() {
        assert_eq!(finite("value", -3.5).unwrap(), -3.5);
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(finite("value", bad), Err(StoreError::NonFinite { field: "value", .. })));
        }
    }
}
