//! Discounts and campaigns: time-boxed promotional overlays

use chrono::{DateTime, Utc};
use classifieds_util::{CampaignId, DiscountId, ListingId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    #[serde(default)]
    pub listing_ids: Vec<ListingId>,
    pub percent: u8,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub used_count: u32,
}

impl Discount {
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| self.used_count >= limit)
    }

    pub fn next_due_at(&self) -> Option<DateTime<Utc>> {
        if !self.is_active {
            return None;
        }
        if self.is_exhausted() {
            return Some(self.start_date);
        }
        self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub listing_ids: Vec<ListingId>,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Campaign {
    pub fn next_due_at(&self) -> Option<DateTime<Utc>> {
        if self.is_active { self.end_date } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn exhausted_discount_is_due_immediately() {
        let discount = Discount {
            id: DiscountId::new("d-1"),
            listing_ids: vec![],
            percent: 10,
            start_date: t0(),
            end_date: Some(t0() + Duration::days(10)),
            is_active: true,
            usage_limit: Some(3),
            used_count: 3,
        };
        assert!(discount.is_exhausted());
        assert_eq!(discount.next_due_at(), Some(t0()));
    }

    #[test]
    fn unlimited_discount_is_never_exhausted() {
        let discount = Discount {
            id: DiscountId::new("d-2"),
            listing_ids: vec![],
            percent: 10,
            start_date: t0(),
            end_date: None,
            is_active: true,
            usage_limit: None,
            used_count: 1_000,
        };
        assert!(!discount.is_exhausted());
        assert!(discount.next_due_at().is_none());
    }

    #[test]
    fn inactive_campaign_is_not_due() {
        let campaign = Campaign {
            id: CampaignId::new("c-1"),
            name: "Spring".into(),
            listing_ids: vec![],
            start_date: t0(),
            end_date: Some(t0()),
            is_active: false,
        };
        assert!(campaign.next_due_at().is_none());
    }
}
