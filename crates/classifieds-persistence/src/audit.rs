//! Audit event types

use chrono::{DateTime, Utc};
use classifieds_model::{EntityKind, ListingStateTag, Money, StoreStatusTag};
use classifieds_util::{CampaignId, DiscountId, ListingId, StoreId};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Configuration loaded
    ConfigLoaded { package_count: usize },

    /// A sweep finished (possibly cut short by shutdown)
    SweepCompleted {
        evaluated: usize,
        committed: usize,
        conflicts: usize,
        failures: usize,
        cancelled: bool,
    },

    /// Listing moved between primary states
    ListingTransitioned {
        listing_id: ListingId,
        from: ListingStateTag,
        to: ListingStateTag,
    },

    /// Overlay timers cleared on a listing
    OverlaysCleared {
        listing_id: ListingId,
        cleared: Vec<String>,
    },

    /// Store moved along its status chain
    StoreTransitioned {
        store_id: StoreId,
        from: StoreStatusTag,
        to: StoreStatusTag,
    },

    /// Auto-renewal charge captured
    RenewalCharged {
        listing_id: ListingId,
        transaction_id: String,
        idempotency_key: String,
        amount: Money,
    },

    /// Auto-renewal charge declined or gateway unavailable
    RenewalFailed {
        listing_id: ListingId,
        idempotency_key: String,
        reason: String,
    },

    /// Discount switched off
    DiscountDeactivated {
        discount_id: DiscountId,
        reason: String,
    },

    /// Campaign reached its end date
    CampaignEnded { campaign_id: CampaignId },

    /// User or admin action applied outside the sweep
    ManualAction {
        kind: EntityKind,
        id: String,
        action: String,
    },
}

/// Full audit event with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self::at(classifieds_util::now(), event)
    }

    /// Event stamped with the sweep's notion of now
    pub fn at(timestamp: DateTime<Utc>, event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp,
            event,
        }
    }
}
