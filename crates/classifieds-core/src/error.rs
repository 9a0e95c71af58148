//! Lifecycle errors

use classifieds_model::EntityKind;
use classifieds_persistence::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Record is missing or has contradictory temporal fields; it is skipped
    #[error("Invalid {kind} {id}: {reason}")]
    InvalidEntity {
        kind: EntityKind,
        id: String,
        reason: String,
    },

    /// A manual action does not apply to the record's current state
    #[error("Cannot {action} {kind} {id}: {reason}")]
    ManualActionRejected {
        kind: EntityKind,
        id: String,
        action: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LifecycleError {
    pub(crate) fn invalid(kind: EntityKind, id: &str, reason: impl Into<String>) -> Self {
        LifecycleError::InvalidEntity {
            kind,
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn rejected(
        kind: EntityKind,
        id: &str,
        action: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        LifecycleError::ManualActionRejected {
            kind,
            id: id.to_string(),
            action,
            reason: reason.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, LifecycleError::Store(e) if e.is_conflict())
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
