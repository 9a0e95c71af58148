//! Store trait definitions

use chrono::{DateTime, Utc};
use classifieds_model::{Entity, EntityKind, Listing, Version, Versioned};
use classifieds_util::StoreId;

use crate::{AuditEvent, StoreResult};

/// Durable home of every lifecycle record.
///
/// Calls are blocking; async callers run them on a blocking thread with a
/// timeout.
pub trait Persistence: Send + Sync {
    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Lifecycle records

    /// Records of `kind` whose next evaluation time is at or before `now`,
    /// earliest first
    fn load_due(
        &self,
        kind: EntityKind,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Versioned<Entity>>>;

    /// Load one record with its current version
    fn load(&self, kind: EntityKind, id: &str) -> StoreResult<Option<Versioned<Entity>>>;

    /// Every listing owned by a store
    fn listings_for_store(&self, store_id: &StoreId) -> StoreResult<Vec<Versioned<Listing>>>;

    /// Create a record; returns its first version
    fn insert(&self, entity: &Entity) -> StoreResult<Version>;

    /// Replace a record if it is still at `expected`; returns the new version.
    ///
    /// Fails with `StoreError::VersionConflict` when another writer got there
    /// first.
    fn commit(&self, entity: &Entity, expected: Version) -> StoreResult<Version>;

    /// Move a record's next evaluation to `until` without touching its body
    /// or version. A later commit recomputes the due time from the record.
    fn defer(&self, kind: EntityKind, id: &str, until: DateTime<Utc>) -> StoreResult<()>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
