//! Gateway Trait

use crate::{Document, Filter, ObjectId, Stage, StorageError};
use std::sync::Arc;

/// Storage primitives over named collections.
///
/// Implementations hold no domain semantics; uniqueness rules, access
/// checks and record shapes belong to the stores built on top.
pub trait Gateway: Send + Sync {
    /// First document in `collection` matching `filter`
    fn fetch_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StorageError>;

    /// Every document in `collection` matching `filter`, in insertion order
    fn fetch_all(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StorageError>;

    /// Persist `document` and return its generated id
    fn insert_one(&self, collection: &str, document: Document) -> Result<ObjectId, StorageError>;

    /// Run the pipeline stages in order over `collection`
    fn run_aggregation(&self, collection: &str, stages: &[Stage]) -> Result<Vec<Document>, StorageError>;
}

/// Gateway handle shared by the stores of one session
pub type SharedGateway = Arc<dyn Gateway>;
