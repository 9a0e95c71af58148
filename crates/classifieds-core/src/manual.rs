//! Manual user and admin actions
//!
//! Each action is a pure function from the current record to the next one.
//! The orchestrator wraps them with a load and a version-guarded commit.

use chrono::{DateTime, Duration, Utc};
use classifieds_config::LifecyclePolicy;
use classifieds_gateway::NoticeKind;
use classifieds_model::{
    Discount, EntityKind, Listing, ListingOverlays, ListingState, Promotion, Store, StoreStatus,
};
use serde_json::json;

use crate::listing::package;
use crate::{Effect, Evaluation, LifecycleError, LifecycleResult, ListingContext};

fn reject_listing(listing: &Listing, action: &'static str, reason: &str) -> LifecycleError {
    LifecycleError::rejected(EntityKind::Listing, listing.id.as_str(), action, reason)
}

/// Start a fresh renewal cycle ending at `expires_at`
fn restart_cycle(next: &mut Listing, expires_at: DateTime<Utc>) {
    next.expires_at = Some(expires_at);
    next.state = ListingState::Active;
    next.auto_renewal.paid = false;
    next.auto_renewal.used = false;
    next.auto_renewal.attempts = 0;
    if next.auto_renewal.enabled {
        next.auto_renewal.next_renewal_date = Some(expires_at);
    }
}

/// Owner pays for another period; works from `Active` or `GracePeriod`.
///
/// The new period starts at the later of `now` and the old expiry.
pub fn renew_listing(
    listing: &Listing,
    now: DateTime<Utc>,
    policy: &LifecyclePolicy,
) -> LifecycleResult<Evaluation<Listing>> {
    const ACTION: &str = "renew";

    match listing.state {
        ListingState::Active | ListingState::GracePeriod { .. } => {}
        ListingState::Archived { .. } => {
            return Err(reject_listing(listing, ACTION, "archived; reactivate instead"));
        }
        ListingState::Deleted { .. } => {
            return Err(reject_listing(listing, ACTION, "deleted"));
        }
    }

    let package = package(policy, listing)?;
    let start = listing.expires_at.map_or(now, |e| e.max(now));
    let expires_at = start + package.duration;

    let mut next = listing.clone();
    restart_cycle(&mut next, expires_at);

    let effects = vec![Effect::notify(
        &listing.user_id,
        NoticeKind::Renewed,
        json!({ "listing_id": listing.id, "expires_at": expires_at }),
    )];
    Ok(Evaluation { next, effects })
}

/// Bring an archived listing back for a full package period from `now`
pub fn reactivate_listing(
    listing: &Listing,
    now: DateTime<Utc>,
    policy: &LifecyclePolicy,
) -> LifecycleResult<Evaluation<Listing>> {
    if !listing.is_archived() {
        return Err(reject_listing(listing, "reactivate", "not archived"));
    }

    let package = package(policy, listing)?;
    let expires_at = now + package.duration;

    let mut next = listing.clone();
    restart_cycle(&mut next, expires_at);

    let effects = vec![Effect::notify(
        &listing.user_id,
        NoticeKind::Reactivated,
        json!({ "listing_id": listing.id, "expires_at": expires_at }),
    )];
    Ok(Evaluation { next, effects })
}

/// Owner removes a listing; every overlay goes with it
pub fn delete_listing(listing: &Listing, now: DateTime<Utc>) -> LifecycleResult<Evaluation<Listing>> {
    if listing.is_deleted() {
        return Err(reject_listing(listing, "delete", "already deleted"));
    }

    let mut next = listing.clone();
    next.state = ListingState::Deleted { deleted_at: now };
    next.overlays = ListingOverlays::default();

    let effects = vec![Effect::notify(
        &listing.user_id,
        NoticeKind::Deleted,
        json!({ "listing_id": listing.id, "deleted_at": now }),
    )];
    Ok(Evaluation { next, effects })
}

/// Feature a listing until `until`
pub fn promote_listing(
    listing: &Listing,
    ctx: &ListingContext,
    policy: &LifecyclePolicy,
    until: DateTime<Utc>,
) -> LifecycleResult<Evaluation<Listing>> {
    const ACTION: &str = "promote";

    if ctx.store_suspended {
        return Err(reject_listing(listing, ACTION, "store is suspended"));
    }
    if !listing.is_active() {
        return Err(reject_listing(listing, ACTION, "listing is not active"));
    }
    if !package(policy, listing)?.allows_promotion {
        return Err(reject_listing(
            listing,
            ACTION,
            &format!("{} listings cannot be promoted", listing.ad_type),
        ));
    }
    if until <= ctx.now {
        return Err(reject_listing(listing, ACTION, "promotion must end in the future"));
    }

    let mut next = listing.clone();
    next.overlays.promotion = Some(Promotion {
        started_at: ctx.now,
        end_date: until,
    });

    let effects = vec![Effect::notify(
        &listing.user_id,
        NoticeKind::Promoted,
        json!({ "listing_id": listing.id, "until": until }),
    )];
    Ok(Evaluation { next, effects })
}

/// Owner pays again; the store returns to `Active` for `period` from `now`
pub fn reactivate_store(
    store: &Store,
    now: DateTime<Utc>,
    period: Duration,
) -> LifecycleResult<Evaluation<Store>> {
    if store.is_active() {
        return Err(LifecycleError::rejected(
            EntityKind::Store,
            store.id.as_str(),
            "reactivate",
            "already active",
        ));
    }

    let expires_at = now + period;
    let mut next = store.clone();
    next.status = StoreStatus::Active;
    next.expires_at = Some(expires_at);
    next.last_payment_reminder = None;

    let effects = vec![Effect::notify(
        &store.user_id,
        NoticeKind::StoreReactivated,
        json!({ "store_id": store.id, "expires_at": expires_at }),
    )];
    Ok(Evaluation { next, effects })
}

/// Count one use of a discount; reaching the limit switches it off
pub fn redeem_discount(
    discount: &Discount,
    now: DateTime<Utc>,
) -> LifecycleResult<Evaluation<Discount>> {
    let reject = |reason: &str| {
        LifecycleError::rejected(EntityKind::Discount, discount.id.as_str(), "redeem", reason)
    };

    if !discount.is_active {
        return Err(reject("inactive"));
    }
    if now < discount.start_date {
        return Err(reject("not started"));
    }
    if discount.end_date.is_some_and(|end| now >= end) {
        return Err(reject("ended"));
    }
    if discount.is_exhausted() {
        return Err(reject("usage limit reached"));
    }

    let mut next = discount.clone();
    next.used_count += 1;
    if next.is_exhausted() {
        next.is_active = false;
    }

    Ok(Evaluation {
        next,
        effects: Vec::new(),
    })
}
