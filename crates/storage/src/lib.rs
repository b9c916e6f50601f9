//! Storage Layer
//!
//! Document-store gateway used by every weather collection:
//! - `Gateway` trait with the four storage primitives
//! - Filters and aggregation pipeline stages
//! - In-memory `MemoryGateway` with optional unique indexes

mod document;
mod filter;
mod gateway;
mod memory;
mod pipeline;

pub use document::{from_document, to_document, Document, ObjectId, ID_FIELD};
pub use filter::{Condition, Filter};
pub use gateway::{Gateway, SharedGateway};
pub use memory::MemoryGateway;
pub use pipeline::{Accumulator, GroupSpec, KeyPart, SortOrder, Stage};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),
    #[error("Unique index on {collection} violated by key {key}")]
    UniqueViolation { collection: String, key: String },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}
