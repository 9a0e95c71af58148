//! Listing lifecycle evaluation
//!
//! `Active -> GracePeriod -> Archived`, with auto-renewal able to pull a
//! listing back to `Active` and overlay timers expiring on their own clock.

use chrono::{DateTime, Utc};
use classifieds_config::{LifecyclePolicy, Package};
use classifieds_gateway::{NoticeKind, PaymentError};
use classifieds_model::{EntityKind, Listing, ListingOverlays, ListingState};
use serde_json::json;

use crate::{Effect, Evaluation, LifecycleError, LifecycleResult, RenewalCharge};

/// What the evaluator needs besides the listing itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingContext {
    pub now: DateTime<Utc>,
    /// Owning store is deactivated or archived
    pub store_suspended: bool,
}

impl ListingContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            store_suspended: false,
        }
    }

    pub fn with_store_suspended(mut self, suspended: bool) -> Self {
        self.store_suspended = suspended;
        self
    }
}

/// Idempotency key of the next charge attempt:
/// `{listing_id}:{cycle_anchor}:{attempts}`
pub fn renewal_token(listing: &Listing) -> Option<String> {
    let anchor = listing.renewal_cycle_anchor()?;
    Some(format!(
        "{}:{}:{}",
        listing.id,
        anchor.to_rfc3339(),
        listing.auto_renewal.attempts
    ))
}

fn invalid(listing: &Listing, reason: &str) -> LifecycleError {
    LifecycleError::invalid(EntityKind::Listing, listing.id.as_str(), reason)
}

/// Reject records whose timestamps contradict each other
fn validate(listing: &Listing, now: DateTime<Utc>) -> LifecycleResult<DateTime<Utc>> {
    let expires_at = listing
        .expires_at
        .ok_or_else(|| invalid(listing, "missing expires_at"))?;

    if expires_at < listing.created_at {
        return Err(invalid(listing, "expires_at precedes created_at"));
    }

    if let Some(end) = listing.grace_period_end() {
        if end < expires_at {
            return Err(invalid(listing, "grace period ends before expiry"));
        }
        if now < expires_at {
            return Err(invalid(listing, "in grace period before expiry"));
        }
    }

    Ok(expires_at)
}

pub(crate) fn package<'a>(
    policy: &'a LifecyclePolicy,
    listing: &Listing,
) -> LifecycleResult<&'a Package> {
    policy
        .package(listing.ad_type)
        .ok_or_else(|| invalid(listing, "no package for ad type"))
}

fn has_card(listing: &Listing) -> bool {
    listing.auto_renewal.enabled && listing.auto_renewal.card_uuid.is_some()
}

fn charge_for(listing: &Listing, package: &Package) -> Option<Effect> {
    Some(Effect::ChargeRenewal(RenewalCharge {
        listing_id: listing.id.clone(),
        owner: listing.user_id.clone(),
        card_uuid: listing.auto_renewal.card_uuid.clone()?,
        amount: package.price.clone(),
        idempotency_key: renewal_token(listing)?,
    }))
}

/// Drop every overlay whose end date has been reached
fn expire_overlays(overlays: &mut ListingOverlays, now: DateTime<Utc>) {
    if overlays.promotion.as_ref().is_some_and(|p| now >= p.end_date) {
        overlays.promotion = None;
    }
    if overlays.discount.as_ref().is_some_and(|d| now >= d.end_date) {
        overlays.discount = None;
    }
    if overlays.timer_bar_end_date.is_some_and(|end| now >= end) {
        overlays.timer_bar_end_date = None;
    }
    overlays.creative_effects.retain(|e| now < e.end_date);
}

/// Overlay step that follows every primary transition
fn settle_overlays(next: &mut Listing, ctx: &ListingContext) {
    expire_overlays(&mut next.overlays, ctx.now);
    if ctx.store_suspended {
        next.overlays.promotion = None;
    }
}

/// Names of the overlays present in `before` but gone in `after`
pub fn cleared_overlays(before: &ListingOverlays, after: &ListingOverlays) -> Vec<String> {
    let mut cleared = Vec::new();
    if before.promotion.is_some() && after.promotion.is_none() {
        cleared.push("promotion".to_string());
    }
    if before.discount.is_some() && after.discount.is_none() {
        cleared.push("discount".to_string());
    }
    if before.timer_bar_end_date.is_some() && after.timer_bar_end_date.is_none() {
        cleared.push("timer_bar".to_string());
    }
    for effect in &before.creative_effects {
        if !after.creative_effects.contains(effect) {
            cleared.push(format!("creative_effect:{}", effect.kind.as_str()));
        }
    }
    cleared
}

/// Copy of the listing without its promotion, if it had one
pub fn strip_promotion(listing: &Listing) -> Option<Listing> {
    listing.overlays.promotion.as_ref()?;
    let mut next = listing.clone();
    next.overlays.promotion = None;
    Some(next)
}

/// Move a listing into its next cycle, anchored to the old expiry
fn renewed(
    mut next: Listing,
    package: &Package,
    transaction_id: Option<String>,
) -> LifecycleResult<Evaluation<Listing>> {
    let old_expiry = next
        .expires_at
        .ok_or_else(|| invalid(&next, "missing expires_at"))?;
    let new_expiry = old_expiry + package.duration;

    next.expires_at = Some(new_expiry);
    next.state = ListingState::Active;
    next.auto_renewal.next_renewal_date = Some(new_expiry);
    next.auto_renewal.paid = true;
    next.auto_renewal.used = true;
    if transaction_id.is_some() {
        next.auto_renewal.last_transaction_id = transaction_id.clone();
    }

    let effects = vec![Effect::notify(
        &next.user_id,
        NoticeKind::Renewed,
        json!({
            "listing_id": next.id,
            "expires_at": new_expiry,
            "transaction_id": transaction_id,
        }),
    )];

    Ok(Evaluation { next, effects })
}

/// Decide the next state of a listing at `ctx.now`.
///
/// When auto-renewal applies, the result carries a `ChargeRenewal` effect and
/// `next` is the fallback (grace) state. The caller runs the charge and then
/// applies [`apply_renewal_success`] or [`apply_renewal_failure`].
pub fn evaluate_listing(
    listing: &Listing,
    ctx: &ListingContext,
    policy: &LifecyclePolicy,
) -> LifecycleResult<Evaluation<Listing>> {
    let now = ctx.now;
    let expires_at = validate(listing, now)?;
    let mut next = listing.clone();
    let mut effects = Vec::new();

    match listing.state {
        ListingState::Active if now >= expires_at => {
            let grace_period_end = expires_at + policy.listing_grace;

            if has_card(listing) {
                // Reaching expiry starts a new renewal cycle
                next.auto_renewal.paid = false;
                next.auto_renewal.used = false;
                next.auto_renewal.attempts = 0;

                let package = package(policy, listing)?;
                if package.price.is_zero() {
                    let mut evaluation = renewed(next, package, None)?;
                    settle_overlays(&mut evaluation.next, ctx);
                    return Ok(evaluation);
                }

                effects.extend(charge_for(&next, package));
            }

            next.state = ListingState::GracePeriod {
                grace_period_end,
                next_attempt_at: None,
            };
            effects.push(Effect::notify(
                &listing.user_id,
                NoticeKind::GraceStarted,
                json!({
                    "listing_id": listing.id,
                    "expired_at": expires_at,
                    "grace_period_end": grace_period_end,
                }),
            ));
        }
        ListingState::Active => {}
        ListingState::GracePeriod {
            grace_period_end,
            next_attempt_at,
        } => {
            if now >= grace_period_end {
                next.state = ListingState::Archived { archived_at: now };
                next.overlays = ListingOverlays::default();
                effects.push(Effect::notify(
                    &listing.user_id,
                    NoticeKind::Archived,
                    json!({
                        "listing_id": listing.id,
                        "archived_at": now,
                    }),
                ));
            } else if has_card(listing) && !listing.auto_renewal.used {
                if next_attempt_at.is_some_and(|at| now >= at) {
                    let package = package(policy, listing)?;
                    if package.price.is_zero() {
                        let mut evaluation = renewed(next, package, None)?;
                        settle_overlays(&mut evaluation.next, ctx);
                        return Ok(evaluation);
                    }
                    effects.extend(charge_for(&next, package));
                }
            } else if next_attempt_at.is_some() {
                // Renewal no longer possible; stop waking up for it
                next.state = ListingState::GracePeriod {
                    grace_period_end,
                    next_attempt_at: None,
                };
            }
        }
        ListingState::Archived { .. } | ListingState::Deleted { .. } => {}
    }

    settle_overlays(&mut next, ctx);

    Ok(Evaluation { next, effects })
}

/// Commit path after the renewal charge was captured
pub fn apply_renewal_success(
    fallback: &Listing,
    _ctx: &ListingContext,
    policy: &LifecyclePolicy,
    transaction_id: impl Into<String>,
) -> LifecycleResult<Evaluation<Listing>> {
    let package = package(policy, fallback)?;
    renewed(fallback.clone(), package, Some(transaction_id.into()))
}

/// Commit path after the renewal charge was declined or could not be made.
///
/// Only a decline moves to the next attempt. After an unavailable gateway or
/// a timeout the charge may have been captured, so the retry reuses the same
/// renewal token and the processor deduplicates it.
pub fn apply_renewal_failure(
    fallback: Evaluation<Listing>,
    ctx: &ListingContext,
    policy: &LifecyclePolicy,
    error: &PaymentError,
) -> Evaluation<Listing> {
    let mut evaluation = fallback;
    evaluation.take_charge();

    let next = &mut evaluation.next;
    if matches!(error, PaymentError::Declined(_)) {
        next.auto_renewal.attempts += 1;
    }
    next.auto_renewal.paid = false;

    let mut grace_end = None;
    if let ListingState::GracePeriod {
        grace_period_end,
        next_attempt_at,
    } = &mut next.state
    {
        let retry_at = ctx.now + policy.renewal_retry_interval;
        *next_attempt_at = (retry_at < *grace_period_end).then_some(retry_at);
        grace_end = Some(*grace_period_end);
    }

    let notice = Effect::notify(
        &next.user_id,
        NoticeKind::RenewalFailed,
        json!({
            "listing_id": next.id,
            "reason": error.to_string(),
            "attempts": next.auto_renewal.attempts,
            "grace_period_end": grace_end,
        }),
    );
    evaluation.effects.push(notice);
    evaluation
}
