//! Discount and campaign evaluation

use chrono::{DateTime, Utc};
use classifieds_model::{Campaign, Discount};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Evaluation;

/// Why a discount was switched off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountEnd {
    Ended,
    Exhausted,
}

impl fmt::Display for DiscountEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiscountEnd::Ended => "ended",
            DiscountEnd::Exhausted => "exhausted",
        })
    }
}

/// Reason an active discount should be switched off at `now`, if any
pub fn discount_end_reason(discount: &Discount, now: DateTime<Utc>) -> Option<DiscountEnd> {
    if !discount.is_active {
        return None;
    }
    if discount.is_exhausted() {
        return Some(DiscountEnd::Exhausted);
    }
    discount
        .end_date
        .is_some_and(|end| now >= end)
        .then_some(DiscountEnd::Ended)
}

pub fn evaluate_discount(discount: &Discount, now: DateTime<Utc>) -> Evaluation<Discount> {
    let mut next = discount.clone();
    if discount_end_reason(discount, now).is_some() {
        next.is_active = false;
    }
    Evaluation {
        next,
        effects: Vec::new(),
    }
}

pub fn evaluate_campaign(campaign: &Campaign, now: DateTime<Utc>) -> Evaluation<Campaign> {
    let mut next = campaign.clone();
    if campaign.is_active && campaign.end_date.is_some_and(|end| now >= end) {
        next.is_active = false;
    }
    Evaluation {
        next,
        effects: Vec::new(),
    }
}
