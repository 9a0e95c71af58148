//! Store status chain evaluation

use chrono::{DateTime, Utc};
use classifieds_config::LifecyclePolicy;
use classifieds_gateway::NoticeKind;
use classifieds_model::{EntityKind, Store, StoreStatus};
use serde_json::json;

use crate::{Effect, Evaluation, LifecycleError, LifecycleResult};

/// Advance a store at most one step along
/// `active -> grace_period -> deactivated -> archived`.
pub fn evaluate_store(
    store: &Store,
    now: DateTime<Utc>,
    policy: &LifecyclePolicy,
) -> LifecycleResult<Evaluation<Store>> {
    let expires_at = store.expires_at.ok_or_else(|| {
        LifecycleError::invalid(EntityKind::Store, store.id.as_str(), "missing expires_at")
    })?;

    let mut next = store.clone();
    let mut effects = Vec::new();

    match store.status {
        StoreStatus::Active if now >= expires_at => {
            let grace_period_ends_at = expires_at + policy.store_grace;
            next.status = StoreStatus::GracePeriod {
                grace_period_ends_at,
            };
            effects.push(Effect::notify(
                &store.user_id,
                NoticeKind::StoreGrace,
                json!({
                    "store_id": store.id,
                    "expired_at": expires_at,
                    "grace_period_ends_at": grace_period_ends_at,
                }),
            ));
        }
        StoreStatus::Active => {
            let hints = policy.due_hints();
            let reminder_due = store.reminder_due_at(&hints).is_some_and(|due| now >= due);
            if reminder_due && !store.reminder_sent(&hints) {
                next.last_payment_reminder = Some(now);
                effects.push(Effect::notify(
                    &store.user_id,
                    NoticeKind::StorePaymentReminder,
                    json!({
                        "store_id": store.id,
                        "expires_at": expires_at,
                        "plan": store.plan.name,
                    }),
                ));
            }
        }
        StoreStatus::GracePeriod {
            grace_period_ends_at,
        } => {
            if now >= grace_period_ends_at {
                next.status = StoreStatus::Deactivated {
                    grace_period_ends_at,
                    deactivated_at: now,
                };
                effects.push(Effect::CascadeDeactivateListings {
                    store_id: store.id.clone(),
                });
                effects.push(Effect::notify(
                    &store.user_id,
                    NoticeKind::StoreDeactivated,
                    json!({
                        "store_id": store.id,
                        "deactivated_at": now,
                    }),
                ));
            }
        }
        StoreStatus::Deactivated { deactivated_at, .. } => {
            if now >= deactivated_at + policy.store_archive_after {
                next.status = StoreStatus::Archived {
                    deactivated_at,
                    archived_at: now,
                };
                effects.push(Effect::notify(
                    &store.user_id,
                    NoticeKind::StoreArchived,
                    json!({
                        "store_id": store.id,
                        "archived_at": now,
                    }),
                ));
            }
        }
        StoreStatus::Archived { .. } => {}
    }

    Ok(Evaluation { next, effects })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use classifieds_model::StorePlan;
    use classifieds_util::{StoreId, UserId};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn expiry() -> DateTime<Utc> {
        t0() + Duration::days(30)
    }

    fn make_store() -> Store {
        Store::new(
            StoreId::new("store-1"),
            UserId::new("user-1"),
            StorePlan {
                name: "pro".into(),
                max_ads: 50,
            },
            t0(),
            expiry(),
        )
    }

    #[test]
    fn active_store_before_reminder_is_untouched() {
        let store = make_store();
        let evaluation =
            evaluate_store(&store, t0() + Duration::days(1), &LifecyclePolicy::default())
                .unwrap();
        assert!(evaluation.is_noop(&store));
    }

    #[test]
    fn payment_reminder_sent_once() {
        let store = make_store();
        let policy = LifecyclePolicy::default();
        let now = expiry() - Duration::days(2);

        let evaluation = evaluate_store(&store, now, &policy).unwrap();
        assert!(evaluation.has_notice(NoticeKind::StorePaymentReminder));
        assert_eq!(evaluation.next.last_payment_reminder, Some(now));

        let again = evaluate_store(&evaluation.next, now + Duration::hours(1), &policy).unwrap();
        assert!(again.is_noop(&evaluation.next));
    }

    #[test]
    fn expiry_enters_store_grace() {
        let store = make_store();
        let evaluation = evaluate_store(&store, expiry(), &LifecyclePolicy::default()).unwrap();
        assert_eq!(
            evaluation.next.grace_period_ends_at(),
            Some(expiry() + Duration::days(7))
        );
        assert!(evaluation.has_notice(NoticeKind::StoreGrace));
    }

    #[test]
    fn grace_end_deactivates_and_cascades() {
        let mut store = make_store();
        store.status = StoreStatus::GracePeriod {
            grace_period_ends_at: expiry() + Duration::days(7),
        };

        let now = expiry() + Duration::days(7);
        let evaluation = evaluate_store(&store, now, &LifecyclePolicy::default()).unwrap();

        assert_eq!(evaluation.next.deactivated_at(), Some(now));
        assert!(evaluation.next.is_suspended());
        assert!(evaluation.effects.contains(&Effect::CascadeDeactivateListings {
            store_id: store.id.clone()
        }));
        assert!(evaluation.has_notice(NoticeKind::StoreDeactivated));
    }

    #[test]
    fn retention_elapsed_archives() {
        let mut store = make_store();
        let deactivated_at = expiry() + Duration::days(7);
        store.status = StoreStatus::Deactivated {
            grace_period_ends_at: deactivated_at,
            deactivated_at,
        };
        let policy = LifecyclePolicy::default();

        let early = evaluate_store(&store, deactivated_at + Duration::days(29), &policy).unwrap();
        assert!(early.is_noop(&store));

        let now = deactivated_at + Duration::days(30);
        let evaluation = evaluate_store(&store, now, &policy).unwrap();
        assert_eq!(evaluation.next.archived_at(), Some(now));
        assert_eq!(evaluation.next.deactivated_at(), Some(deactivated_at));
    }

    #[test]
    fn one_step_per_evaluation() {
        let store = make_store();
        // Long after every window has passed, a single call still moves one step
        let now = expiry() + Duration::days(365);
        let evaluation = evaluate_store(&store, now, &LifecyclePolicy::default()).unwrap();
        assert!(matches!(
            evaluation.next.status,
            StoreStatus::GracePeriod { .. }
        ));
    }

    #[test]
    fn archived_store_is_terminal() {
        let mut store = make_store();
        store.status = StoreStatus::Archived {
            deactivated_at: expiry(),
            archived_at: expiry() + Duration::days(30),
        };
        let evaluation =
            evaluate_store(&store, expiry() + Duration::days(400), &LifecyclePolicy::default())
                .unwrap();
        assert!(evaluation.is_noop(&store));
    }

    #[test]
    fn missing_expiry_is_invalid() {
        let mut store = make_store();
        store.expires_at = None;
        let result = evaluate_store(&store, t0(), &LifecyclePolicy::default());
        assert!(matches!(result, Err(LifecycleError::InvalidEntity { .. })));
    }
}
