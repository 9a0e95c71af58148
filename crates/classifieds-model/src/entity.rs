//! Envelope over every record kind the lifecycle engine persists

use chrono::{DateTime, Duration, Utc};
use classifieds_util::StoreId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Campaign, Discount, Listing, Store};

/// Optimistic concurrency version of a persisted record
pub type Version = u64;

/// Record kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Listing,
    Store,
    Discount,
    Campaign,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Listing,
        EntityKind::Store,
        EntityKind::Discount,
        EntityKind::Campaign,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Listing => "listing",
            EntityKind::Store => "store",
            EntityKind::Discount => "discount",
            EntityKind::Campaign => "campaign",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy-derived lead times needed to schedule store evaluations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueHints {
    /// Payment reminder lead before a store expires
    pub store_reminder_before: Duration,
    /// Retention between deactivation and archival
    pub store_archive_after: Duration,
}

impl Default for DueHints {
    fn default() -> Self {
        Self {
            store_reminder_before: Duration::days(3),
            store_archive_after: Duration::days(30),
        }
    }
}

/// Any persisted lifecycle record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum Entity {
    Listing(Listing),
    Store(Store),
    Discount(Discount),
    Campaign(Campaign),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Listing(_) => EntityKind::Listing,
            Entity::Store(_) => EntityKind::Store,
            Entity::Discount(_) => EntityKind::Discount,
            Entity::Campaign(_) => EntityKind::Campaign,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Listing(l) => l.id.as_str(),
            Entity::Store(s) => s.id.as_str(),
            Entity::Discount(d) => d.id.as_str(),
            Entity::Campaign(c) => c.id.as_str(),
        }
    }

    /// Store owning this record, if any
    pub fn owner_store(&self) -> Option<&StoreId> {
        match self {
            Entity::Listing(l) => l.store_id.as_ref(),
            _ => None,
        }
    }

    pub fn next_due_at(&self, hints: &DueHints) -> Option<DateTime<Utc>> {
        match self {
            Entity::Listing(l) => l.next_due_at(),
            Entity::Store(s) => s.next_due_at(hints),
            Entity::Discount(d) => d.next_due_at(),
            Entity::Campaign(c) => c.next_due_at(),
        }
    }

    pub fn into_listing(self) -> Option<Listing> {
        match self {
            Entity::Listing(l) => Some(l),
            _ => None,
        }
    }

    pub fn into_store(self) -> Option<Store> {
        match self {
            Entity::Store(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Listing> for Entity {
    fn from(listing: Listing) -> Self {
        Entity::Listing(listing)
    }
}

impl From<Store> for Entity {
    fn from(store: Store) -> Self {
        Entity::Store(store)
    }
}

impl From<Discount> for Entity {
    fn from(discount: Discount) -> Self {
        Entity::Discount(discount)
    }
}

impl From<Campaign> for Entity {
    fn from(campaign: Campaign) -> Self {
        Entity::Campaign(campaign)
    }
}

/// A record together with the version it was read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub record: T,
    pub version: Version,
}

impl<T> Versioned<T> {
    pub fn new(record: T, version: Version) -> Self {
        Self { record, version }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        Versioned {
            record: f(self.record),
            version: self.version,
        }
    }
}
