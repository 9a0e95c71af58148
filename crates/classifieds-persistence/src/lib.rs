//! Persistence layer for classifiedsd
//!
//! Provides:
//! - Versioned storage of listings, stores, discounts and campaigns
//! - Due-time index so a sweep loads only records whose next timer has passed
//! - Optimistic conditional commits keyed on the version a record was read at
//! - Audit log (append-only)

mod audit;
mod sqlite;
mod traits;

pub use audit::*;
pub use sqlite::*;
pub use traits::*;

use classifieds_model::{EntityKind, Version};
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {kind} {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Already exists: {kind} {id}")]
    AlreadyExists { kind: EntityKind, id: String },

    /// Another writer committed this record after it was read
    #[error("Version conflict on {kind} {id}: expected version {expected}")]
    VersionConflict {
        kind: EntityKind,
        id: String,
        expected: Version,
    },

    /// The store cannot serve requests right now (locked, timed out, poisoned)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, _)
                if matches!(
                    err.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                StoreError::Unavailable(e.to_string())
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
