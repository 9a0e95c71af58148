//! Store record and its status chain

use chrono::{DateTime, Utc};
use classifieds_util::{StoreId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DueHints;

/// Store status: `active -> grace_period -> deactivated -> archived`.
///
/// Only a manual reactivation moves a store backwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StoreStatus {
    Active,
    GracePeriod {
        grace_period_ends_at: DateTime<Utc>,
    },
    Deactivated {
        grace_period_ends_at: DateTime<Utc>,
        deactivated_at: DateTime<Utc>,
    },
    Archived {
        deactivated_at: DateTime<Utc>,
        archived_at: DateTime<Utc>,
    },
}

impl StoreStatus {
    pub fn tag(&self) -> StoreStatusTag {
        match self {
            StoreStatus::Active => StoreStatusTag::Active,
            StoreStatus::GracePeriod { .. } => StoreStatusTag::GracePeriod,
            StoreStatus::Deactivated { .. } => StoreStatusTag::Deactivated,
            StoreStatus::Archived { .. } => StoreStatusTag::Archived,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatusTag {
    Active,
    GracePeriod,
    Deactivated,
    Archived,
}

impl fmt::Display for StoreStatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreStatusTag::Active => "active",
            StoreStatusTag::GracePeriod => "grace_period",
            StoreStatusTag::Deactivated => "deactivated",
            StoreStatusTag::Archived => "archived",
        })
    }
}

/// Subscription plan; bounds how many listings the store may hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePlan {
    pub name: String,
    pub max_ads: u32,
}

/// A seller's storefront
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub user_id: UserId,
    #[serde(default)]
    pub name: String,
    pub plan: StorePlan,
    #[serde(default)]
    pub ads_used: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub status: StoreStatus,
    #[serde(default)]
    pub last_payment_reminder: Option<DateTime<Utc>>,
}

impl Store {
    pub fn new(
        id: StoreId,
        user_id: UserId,
        plan: StorePlan,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            name: String::new(),
            plan,
            ads_used: 0,
            created_at,
            expires_at: Some(expires_at),
            status: StoreStatus::Active,
            last_payment_reminder: None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, StoreStatus::Active)
    }

    /// Deactivated or archived: owned listings may not be promoted
    pub fn is_suspended(&self) -> bool {
        matches!(
            self.status,
            StoreStatus::Deactivated { .. } | StoreStatus::Archived { .. }
        )
    }

    pub fn grace_period_ends_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            StoreStatus::GracePeriod {
                grace_period_ends_at,
            }
            | StoreStatus::Deactivated {
                grace_period_ends_at,
                ..
            } => Some(grace_period_ends_at),
            _ => None,
        }
    }

    pub fn deactivated_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            StoreStatus::Deactivated { deactivated_at, .. }
            | StoreStatus::Archived { deactivated_at, .. } => Some(deactivated_at),
            _ => None,
        }
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            StoreStatus::Archived { archived_at, .. } => Some(archived_at),
            _ => None,
        }
    }

    /// Room left under the plan's listing cap
    pub fn remaining_capacity(&self) -> u32 {
        self.plan.max_ads.saturating_sub(self.ads_used)
    }

    pub fn can_post_listing(&self) -> bool {
        self.is_active() && self.remaining_capacity() > 0
    }

    /// Instant at which the payment reminder for the current expiry is due
    pub fn reminder_due_at(&self, hints: &DueHints) -> Option<DateTime<Utc>> {
        self.expires_at.map(|e| e - hints.store_reminder_before)
    }

    /// Whether the reminder for the current expiry has already gone out
    pub fn reminder_sent(&self, hints: &DueHints) -> bool {
        match (self.last_payment_reminder, self.reminder_due_at(hints)) {
            (Some(sent), Some(due)) => sent >= due,
            _ => false,
        }
    }

    /// Earliest instant at which this store needs another evaluation
    pub fn next_due_at(&self, hints: &DueHints) -> Option<DateTime<Utc>> {
        let Some(expires_at) = self.expires_at else {
            return Some(DateTime::<Utc>::MIN_UTC);
        };

        match self.status {
            StoreStatus::Active => {
                if self.reminder_sent(hints) {
                    Some(expires_at)
                } else {
                    self.reminder_due_at(hints).map(|r| r.min(expires_at))
                }
            }
            StoreStatus::GracePeriod {
                grace_period_ends_at,
            } => Some(grace_period_ends_at),
            StoreStatus::Deactivated { deactivated_at, .. } => {
                Some(deactivated_at + hints.store_archive_after)
            }
            StoreStatus::Archived { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn make_store() -> Store {
        Store::new(
            StoreId::new("store-1"),
            UserId::new("user-1"),
            StorePlan {
                name: "basic".into(),
                max_ads: 2,
            },
            t0(),
            t0() + Duration::days(30),
        )
    }

    #[test]
    fn capacity_bounds_posting() {
        let mut store = make_store();
        assert!(store.can_post_listing());

        store.ads_used = 2;
        assert_eq!(store.remaining_capacity(), 0);
        assert!(!store.can_post_listing());
    }

    #[test]
    fn suspended_store_cannot_post() {
        let mut store = make_store();
        store.status = StoreStatus::Deactivated {
            grace_period_ends_at: t0(),
            deactivated_at: t0(),
        };
        assert!(store.is_suspended());
        assert!(!store.can_post_listing());
    }

    #[test]
    fn active_store_due_at_reminder_then_expiry() {
        let hints = DueHints::default();
        let mut store = make_store();
        let expires_at = store.expires_at.unwrap();

        assert_eq!(
            store.next_due_at(&hints),
            Some(expires_at - hints.store_reminder_before)
        );

        store.last_payment_reminder = Some(expires_at - Duration::days(1));
        assert_eq!(store.next_due_at(&hints), Some(expires_at));
    }

    #[test]
    fn deactivated_store_due_after_retention() {
        let hints = DueHints::default();
        let mut store = make_store();
        store.status = StoreStatus::Deactivated {
            grace_period_ends_at: t0(),
            deactivated_at: t0(),
        };
        assert_eq!(store.next_due_at(&hints), Some(t0() + hints.store_archive_after));
    }

    #[test]
    fn status_accessors_follow_the_chain() {
        let mut store = make_store();
        store.status = StoreStatus::Archived {
            deactivated_at: t0(),
            archived_at: t0() + Duration::days(30),
        };
        assert_eq!(store.deactivated_at(), Some(t0()));
        assert_eq!(store.archived_at(), Some(t0() + Duration::days(30)));
        assert!(store.grace_period_ends_at().is_none());
        assert_eq!(store.status.tag().to_string(), "archived");
    }
}
