//! Access Control
//!
//! Session-scoped authorization over the users collection:
//! - User records with roles and per-device access lists
//! - Immutable `AuthContext` snapshot taken when a session opens
//! - Admin-gated `UserDirectory` lookups and inserts

mod context;
mod directory;
mod user;

pub use context::AuthContext;
pub use directory::UserDirectory;
pub use user::{AccessEntry, AccessType, NewUser, Role, User};

use storage::StorageError;
use thiserror::Error;

/// Access control error types
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("User {0} does not exist")]
    UnknownUser(String),

    #[error("User {username} is not allowed to {action}")]
    Unauthorized { username: String, action: String },

    #[error("{0}")]
    DuplicateKey(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AccessError {
    /// Whether the caller was denied rather than the operation failing
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AccessError::Unauthorized { .. })
    }
}
