//! Listing record and its lifecycle state

use chrono::{DateTime, Utc};
use classifieds_util::{ListingId, StoreId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::AdType;

/// Primary lifecycle state of a listing.
///
/// Timestamps live on the variant that needs them, so an archived listing
/// cannot carry a live grace period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ListingState {
    /// Displayed; expires at `Listing::expires_at`
    Active,
    /// Expired but still recoverable until `grace_period_end`
    GracePeriod {
        grace_period_end: DateTime<Utc>,
        /// Next auto-renewal retry, if a charge is still being attempted
        #[serde(default)]
        next_attempt_at: Option<DateTime<Utc>>,
    },
    /// Hidden from display; only a manual reactivation brings it back
    Archived { archived_at: DateTime<Utc> },
    /// Removed by its owner
    Deleted { deleted_at: DateTime<Utc> },
}

impl ListingState {
    pub fn tag(&self) -> ListingStateTag {
        match self {
            ListingState::Active => ListingStateTag::Active,
            ListingState::GracePeriod { .. } => ListingStateTag::GracePeriod,
            ListingState::Archived { .. } => ListingStateTag::Archived,
            ListingState::Deleted { .. } => ListingStateTag::Deleted,
        }
    }
}

/// Field-less view of [`ListingState`] for logs and audit records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStateTag {
    Active,
    GracePeriod,
    Archived,
    Deleted,
}

impl fmt::Display for ListingStateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListingStateTag::Active => "active",
            ListingStateTag::GracePeriod => "grace_period",
            ListingStateTag::Archived => "archived",
            ListingStateTag::Deleted => "deleted",
        })
    }
}

/// Auto-renewal settings and the bookkeeping of the current renewal cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoRenewal {
    pub enabled: bool,
    /// Saved payment instrument
    #[serde(default)]
    pub card_uuid: Option<String>,
    #[serde(default)]
    pub next_renewal_date: Option<DateTime<Utc>>,
    /// A charge succeeded for the current cycle
    #[serde(default)]
    pub paid: bool,
    /// The current cycle has already been renewed
    #[serde(default)]
    pub used: bool,
    /// Declined charge attempts in the current cycle
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_transaction_id: Option<String>,
}

/// Paid promotion window; presence means the listing is featured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub started_at: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Price-cut badge shown on the listing until `end_date`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountOverlay {
    pub percent: u8,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreativeEffectKind {
    Colored,
    Bold,
    Frame,
    Badge,
    Spotlight,
}

impl CreativeEffectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreativeEffectKind::Colored => "colored",
            CreativeEffectKind::Bold => "bold",
            CreativeEffectKind::Frame => "frame",
            CreativeEffectKind::Badge => "badge",
            CreativeEffectKind::Spotlight => "spotlight",
        }
    }
}

/// Cosmetic effect bought for a limited time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeEffect {
    pub kind: CreativeEffectKind,
    pub end_date: DateTime<Utc>,
}

/// Independently expiring attributes that sit outside the primary state machine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingOverlays {
    #[serde(default)]
    pub promotion: Option<Promotion>,
    #[serde(default)]
    pub discount: Option<DiscountOverlay>,
    #[serde(default)]
    pub timer_bar_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub creative_effects: Vec<CreativeEffect>,
}

impl ListingOverlays {
    pub fn is_empty(&self) -> bool {
        self.promotion.is_none()
            && self.discount.is_none()
            && self.timer_bar_end_date.is_none()
            && self.creative_effects.is_empty()
    }

    /// Earliest end date among all overlays
    pub fn earliest_end(&self) -> Option<DateTime<Utc>> {
        self.promotion
            .as_ref()
            .map(|p| p.end_date)
            .into_iter()
            .chain(self.discount.as_ref().map(|d| d.end_date))
            .chain(self.timer_bar_end_date)
            .chain(self.creative_effects.iter().map(|e| e.end_date))
            .min()
    }
}

/// A classified ad
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub user_id: UserId,
    #[serde(default)]
    pub store_id: Option<StoreId>,
    #[serde(default)]
    pub title: String,
    pub ad_type: AdType,
    pub created_at: DateTime<Utc>,
    /// Required; a record without it is rejected by the evaluator
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub state: ListingState,
    #[serde(default)]
    pub auto_renewal: AutoRenewal,
    #[serde(default)]
    pub overlays: ListingOverlays,
}

impl Listing {
    pub fn new(
        id: ListingId,
        user_id: UserId,
        ad_type: AdType,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            store_id: None,
            title: String::new(),
            ad_type,
            created_at,
            expires_at: Some(expires_at),
            state: ListingState::Active,
            auto_renewal: AutoRenewal::default(),
            overlays: ListingOverlays::default(),
        }
    }

    pub fn with_store(mut self, store_id: StoreId) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Enable auto-renewal against a saved card; the first cycle ends at the
    /// current expiry
    pub fn with_auto_renewal(mut self, card_uuid: impl Into<String>) -> Self {
        self.auto_renewal = AutoRenewal {
            enabled: true,
            card_uuid: Some(card_uuid.into()),
            next_renewal_date: self.expires_at,
            ..AutoRenewal::default()
        };
        self
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ListingState::Active)
    }

    pub fn is_archived(&self) -> bool {
        matches!(self.state, ListingState::Archived { .. })
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.state, ListingState::Deleted { .. })
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            ListingState::Archived { archived_at } => Some(archived_at),
            _ => None,
        }
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            ListingState::Deleted { deleted_at } => Some(deleted_at),
            _ => None,
        }
    }

    pub fn grace_period_end(&self) -> Option<DateTime<Utc>> {
        match self.state {
            ListingState::GracePeriod {
                grace_period_end, ..
            } => Some(grace_period_end),
            _ => None,
        }
    }

    /// Grace period end, only while `expires_at < now <= grace_period_end`
    pub fn live_grace_period_end(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let end = self.grace_period_end()?;
        let expires_at = self.expires_at?;
        (expires_at < now && now <= end).then_some(end)
    }

    pub fn is_featured(&self) -> bool {
        self.overlays.promotion.is_some()
    }

    pub fn has_discount(&self) -> bool {
        self.overlays.discount.is_some()
    }

    pub fn auto_renewal_enabled(&self) -> bool {
        self.auto_renewal.enabled
    }

    pub fn auto_renewal_paid(&self) -> bool {
        self.auto_renewal.paid
    }

    pub fn auto_renewal_used(&self) -> bool {
        self.auto_renewal.used
    }

    /// Start of the renewal cycle the next charge pays for
    pub fn renewal_cycle_anchor(&self) -> Option<DateTime<Utc>> {
        self.auto_renewal.next_renewal_date.or(self.expires_at)
    }

    /// Earliest instant at which this listing needs another evaluation.
    ///
    /// A record missing its expiry is due immediately so the sweep surfaces it.
    pub fn next_due_at(&self) -> Option<DateTime<Utc>> {
        let Some(expires_at) = self.expires_at else {
            return Some(DateTime::<Utc>::MIN_UTC);
        };

        let primary = match &self.state {
            ListingState::Active => Some(expires_at),
            ListingState::GracePeriod {
                grace_period_end,
                next_attempt_at,
            } => Some(match next_attempt_at {
                Some(retry) => (*retry).min(*grace_period_end),
                None => *grace_period_end,
            }),
            ListingState::Archived { .. } | ListingState::Deleted { .. } => None,
        };

        primary.into_iter().chain(self.overlays.earliest_end()).min()
    }
}
