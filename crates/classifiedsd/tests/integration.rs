//! Integration tests for classifiedsd
//!
//! These tests drive the orchestrator end to end against a real SQLite
//! store, the mock payment gateway and a recording notifier.

use chrono::{DateTime, Duration, TimeZone, Utc};
use classifieds_config::{LifecyclePolicy, parse_config};
use classifieds_core::{
    LifecycleOrchestrator, ListingContext, SweepOptions, evaluate_listing, renewal_token,
};
use classifieds_gateway::{
    ChargeRequest, MockOutcome, MockPaymentGateway, NoticeKind, PaymentGateway, RecordingNotifier,
};
use classifieds_model::{
    AdType, Entity, EntityKind, Listing, ListingState, Promotion, Store, StorePlan, StoreStatus,
    Versioned,
};
use classifieds_persistence::{AuditEventType, Persistence, SqlitePersistence, StoreError};
use classifieds_util::{ListingId, StoreId, UserId};
use std::sync::Arc;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn expiry() -> DateTime<Utc> {
    t0() + Duration::days(30)
}

struct Harness {
    store: Arc<SqlitePersistence>,
    payments: Arc<MockPaymentGateway>,
    notifier: Arc<RecordingNotifier>,
    orchestrator: LifecycleOrchestrator,
}

fn harness_with(store: SqlitePersistence, payments: MockPaymentGateway, policy: LifecyclePolicy) -> Harness {
    let store = Arc::new(store);
    let payments = Arc::new(payments);
    let notifier = Arc::new(RecordingNotifier::new());
    let orchestrator = LifecycleOrchestrator::new(
        store.clone(),
        payments.clone(),
        notifier.clone(),
        policy,
        SweepOptions {
            workers: 4,
            batch_limit: 100,
            ..SweepOptions::default()
        },
    );
    Harness {
        store,
        payments,
        notifier,
        orchestrator,
    }
}

fn harness(payments: MockPaymentGateway) -> Harness {
    harness_with(
        SqlitePersistence::in_memory().unwrap(),
        payments,
        LifecyclePolicy::default(),
    )
}

fn make_listing(id: &str) -> Listing {
    Listing::new(
        ListingId::new(id),
        UserId::new("user-1"),
        AdType::Standard,
        t0(),
        expiry(),
    )
    .with_title("Mountain bike")
}

fn load_listing(store: &SqlitePersistence, id: &str) -> Versioned<Listing> {
    store
        .load(EntityKind::Listing, id)
        .unwrap()
        .unwrap()
        .map(|e| e.into_listing().unwrap())
}

#[tokio::test]
async fn test_listing_before_expiry_is_untouched() {
    let h = harness(MockPaymentGateway::new());
    h.store.insert(&make_listing("ad-1").into()).unwrap();

    let report = h.orchestrator.run_sweep(expiry() - Duration::seconds(1)).await;

    assert_eq!(report.committed, 0);
    let loaded = load_listing(&h.store, "ad-1");
    assert_eq!(loaded.version, 1);
    assert!(loaded.record.is_active());
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn test_expiry_without_auto_renewal_enters_seven_day_grace() {
    let h = harness(MockPaymentGateway::new());
    h.store.insert(&make_listing("ad-1").into()).unwrap();

    h.orchestrator.run_sweep(expiry()).await;

    let loaded = load_listing(&h.store, "ad-1").record;
    assert_eq!(loaded.grace_period_end(), Some(expiry() + Duration::days(7)));
    assert_eq!(loaded.live_grace_period_end(expiry() + Duration::days(1)), loaded.grace_period_end());
    assert_eq!(h.payments.requests().len(), 0);
    assert_eq!(h.notifier.count(NoticeKind::GraceStarted), 1);
}

#[tokio::test]
async fn test_grace_period_end_archives_listing() {
    let h = harness(MockPaymentGateway::new());
    h.store.insert(&make_listing("ad-1").into()).unwrap();

    h.orchestrator.run_sweep(expiry()).await;
    // Inside grace: nothing due
    let report = h.orchestrator.run_sweep(expiry() + Duration::days(3)).await;
    assert_eq!(report.evaluated, 0);

    let archived_at = expiry() + Duration::days(7);
    h.orchestrator.run_sweep(archived_at).await;

    let loaded = load_listing(&h.store, "ad-1").record;
    assert_eq!(loaded.archived_at(), Some(archived_at));
    assert!(loaded.is_archived());
    assert_eq!(loaded.grace_period_end(), None);
    assert_eq!(h.notifier.count(NoticeKind::Archived), 1);

    // Archived is terminal for the sweep
    let report = h.orchestrator.run_sweep(archived_at + Duration::days(365)).await;
    assert_eq!(report.evaluated, 0);
}

#[test]
fn test_evaluation_is_idempotent() {
    let policy = LifecyclePolicy::default();
    let mut listing = make_listing("ad-1").with_auto_renewal("card-1");
    listing.overlays.promotion = Some(Promotion {
        started_at: t0(),
        end_date: expiry() - Duration::days(1),
    });

    for now in [t0(), expiry(), expiry() + Duration::days(3)] {
        let ctx = ListingContext::at(now);
        let first = evaluate_listing(&listing, &ctx, &policy).unwrap();
        let second = evaluate_listing(&listing, &ctx, &policy).unwrap();
        assert_eq!(first, second);

        // Applying the result and evaluating again at the same instant
        // requests nothing further
        let settled = evaluate_listing(&first.next, &ctx, &policy).unwrap();
        assert!(settled.is_noop(&first.next));
    }
}

#[tokio::test]
async fn test_charge_success_renews_listing() {
    let h = harness(MockPaymentGateway::new());
    h.store
        .insert(&make_listing("ad-1").with_auto_renewal("card-1").into())
        .unwrap();

    let now = expiry() + Duration::minutes(5);
    let report = h.orchestrator.run_sweep(now).await;
    assert_eq!(report.committed, 1);

    let loaded = load_listing(&h.store, "ad-1").record;
    assert!(loaded.is_active());
    assert_eq!(loaded.expires_at, Some(expiry() + Duration::days(30)));
    assert_eq!(loaded.auto_renewal.next_renewal_date, Some(expiry() + Duration::days(30)));
    assert!(loaded.auto_renewal_paid());
    assert!(loaded.auto_renewal_used());
    assert_eq!(loaded.auto_renewal.last_transaction_id.as_deref(), Some("txn-1"));

    let requests = h.payments.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount.amount_minor, 4_900);
    assert_eq!(h.notifier.count(NoticeKind::Renewed), 1);

    let audits = h.store.get_recent_audits(20).unwrap();
    assert!(audits.iter().any(|a| matches!(a.event, AuditEventType::RenewalCharged { .. })));

    // The next cycle charges again with a fresh token
    h.orchestrator.run_sweep(expiry() + Duration::days(30)).await;
    let requests = h.payments.requests();
    assert_eq!(requests.len(), 2);
    assert_ne!(requests[0].idempotency_key, requests[1].idempotency_key);
    assert_eq!(h.payments.successful_charges(), 2);
}

#[tokio::test]
async fn test_charge_declined_falls_back_to_grace() {
    let h = harness(MockPaymentGateway::declining("insufficient funds"));
    h.store
        .insert(&make_listing("ad-1").with_auto_renewal("card-1").into())
        .unwrap();

    h.orchestrator.run_sweep(expiry()).await;

    let loaded = load_listing(&h.store, "ad-1").record;
    assert_eq!(loaded.grace_period_end(), Some(expiry() + Duration::days(7)));
    assert_eq!(loaded.expires_at, Some(expiry()));
    assert!(!loaded.auto_renewal_paid());
    assert!(loaded.auto_renewal_enabled());
    assert_eq!(loaded.auto_renewal.attempts, 1);
    assert_eq!(h.notifier.count(NoticeKind::GraceStarted), 1);
    assert_eq!(h.notifier.count(NoticeKind::RenewalFailed), 1);
}

#[tokio::test]
async fn test_retries_exhaust_grace_then_archive() {
    let h = harness(MockPaymentGateway::declining("card expired"));
    h.store
        .insert(&make_listing("ad-1").with_auto_renewal("card-1").into())
        .unwrap();

    // Daily sweeps through the whole grace window
    for day in 0..=7 {
        h.orchestrator
            .run_sweep(expiry() + Duration::days(day))
            .await;
    }

    let loaded = load_listing(&h.store, "ad-1").record;
    assert!(loaded.is_archived());
    assert!(loaded.auto_renewal_enabled());

    // Initial attempt plus one retry per day until the retry would land at
    // or past the end of grace
    let requests = h.payments.requests();
    assert_eq!(requests.len(), 7);
    assert_eq!(h.payments.successful_charges(), 0);
    assert_eq!(h.notifier.count(NoticeKind::Archived), 1);
}

#[tokio::test]
async fn test_same_renewal_token_charges_at_most_once() {
    let h = harness(MockPaymentGateway::new());
    let listing = make_listing("ad-1").with_auto_renewal("card-1");
    h.store.insert(&listing.clone().into()).unwrap();

    // A previous run captured the charge and crashed before committing
    let token = renewal_token(&listing).unwrap();
    h.payments
        .charge(ChargeRequest {
            card_uuid: "card-1".into(),
            amount: classifieds_model::Money::new(4_900, "USD"),
            idempotency_key: token.clone(),
        })
        .await
        .unwrap();
    assert_eq!(h.payments.successful_charges(), 1);

    h.orchestrator.run_sweep(expiry()).await;

    let loaded = load_listing(&h.store, "ad-1").record;
    assert!(loaded.is_active());
    assert_eq!(loaded.auto_renewal.last_transaction_id.as_deref(), Some("txn-1"));
    assert_eq!(h.payments.successful_charges(), 1);
    assert!(h.payments.requests().iter().all(|r| r.idempotency_key == token));
}

#[tokio::test]
async fn test_charge_captured_but_reply_lost_is_not_charged_again() {
    let payments = Arc::new(MockPaymentGateway::new());
    payments.set_reply_delay(Some(std::time::Duration::from_millis(300)));
    let store = Arc::new(SqlitePersistence::in_memory().unwrap());
    let orchestrator = LifecycleOrchestrator::new(
        store.clone(),
        payments.clone(),
        Arc::new(RecordingNotifier::new()),
        LifecyclePolicy::default(),
        SweepOptions {
            payment_timeout: std::time::Duration::from_millis(50),
            ..SweepOptions::default()
        },
    );
    store
        .insert(&make_listing("ad-1").with_auto_renewal("card-1").into())
        .unwrap();

    // The processor takes the money but the answer never arrives in time
    orchestrator.run_sweep(expiry()).await;
    let loaded = load_listing(&store, "ad-1").record;
    assert!(matches!(loaded.state, ListingState::GracePeriod { .. }));
    assert_eq!(payments.successful_charges(), 1);

    // Retries across the rest of grace replay the same key
    payments.set_reply_delay(None);
    for day in 1..=3 {
        orchestrator.run_sweep(expiry() + Duration::days(day)).await;
    }

    let loaded = load_listing(&store, "ad-1").record;
    assert!(loaded.is_active());
    assert_eq!(loaded.expires_at, Some(expiry() + Duration::days(30)));
    assert_eq!(loaded.auto_renewal.last_transaction_id.as_deref(), Some("txn-1"));
    assert_eq!(payments.successful_charges(), 1);

    let keys: Vec<String> = payments
        .requests()
        .into_iter()
        .map(|r| r.idempotency_key)
        .collect();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0], keys[1]);
}

#[tokio::test]
async fn test_store_deactivation_strips_promotions() {
    let h = harness(MockPaymentGateway::new());
    let store_id = StoreId::new("store-1");
    let store_expiry = t0() + Duration::days(10);

    let shop = Store::new(
        store_id.clone(),
        UserId::new("user-1"),
        StorePlan {
            name: "pro".into(),
            max_ads: 20,
        },
        t0(),
        store_expiry,
    );
    h.store.insert(&shop.into()).unwrap();

    for id in ["ad-1", "ad-2"] {
        let mut listing = make_listing(id).with_store(store_id.clone());
        listing.ad_type = AdType::Premium;
        listing.overlays.promotion = Some(Promotion {
            started_at: t0(),
            end_date: t0() + Duration::days(28),
        });
        h.store.insert(&listing.into()).unwrap();
    }

    // Reminder, then grace, then deactivation: one step per sweep
    h.orchestrator.run_sweep(store_expiry - Duration::days(2)).await;
    assert_eq!(h.notifier.count(NoticeKind::StorePaymentReminder), 1);

    h.orchestrator.run_sweep(store_expiry).await;
    let loaded = h.store.load(EntityKind::Store, "store-1").unwrap().unwrap();
    assert!(matches!(
        loaded.record.into_store().unwrap().status,
        StoreStatus::GracePeriod { .. }
    ));

    let deactivated_at = store_expiry + Duration::days(7);
    h.orchestrator.run_sweep(deactivated_at).await;

    let loaded = h
        .store
        .load(EntityKind::Store, "store-1")
        .unwrap()
        .unwrap()
        .record
        .into_store()
        .unwrap();
    assert_eq!(loaded.deactivated_at(), Some(deactivated_at));
    assert!(!loaded.can_post_listing());

    for id in ["ad-1", "ad-2"] {
        let listing = load_listing(&h.store, id).record;
        assert!(!listing.is_featured());
        assert!(listing.is_active());
        assert_eq!(listing.expires_at, Some(expiry()));
    }

    // Promotion is refused while the store is suspended
    let err = h
        .orchestrator
        .promote_listing(&ListingId::new("ad-1"), expiry(), deactivated_at)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        classifieds_core::LifecycleError::ManualActionRejected { .. }
    ));

    // Retention elapses
    let archived_at = deactivated_at + Duration::days(30);
    h.orchestrator.run_sweep(archived_at).await;
    let loaded = h
        .store
        .load(EntityKind::Store, "store-1")
        .unwrap()
        .unwrap()
        .record
        .into_store()
        .unwrap();
    assert_eq!(loaded.archived_at(), Some(archived_at));
}

#[test]
fn test_concurrent_commit_second_writer_conflicts() {
    let store = SqlitePersistence::in_memory().unwrap();
    store.insert(&make_listing("ad-1").into()).unwrap();

    // Sweep and a manual action both read version 1
    let sweep_copy = load_listing(&store, "ad-1");
    let manual_copy = load_listing(&store, "ad-1");

    let mut deleted = manual_copy.record.clone();
    deleted.state = ListingState::Deleted { deleted_at: t0() };
    assert_eq!(store.commit(&deleted.into(), manual_copy.version).unwrap(), 2);

    let mut graced = sweep_copy.record.clone();
    graced.state = ListingState::GracePeriod {
        grace_period_end: expiry() + Duration::days(7),
        next_attempt_at: None,
    };
    let result = store.commit(&graced.into(), sweep_copy.version);
    assert!(matches!(result, Err(StoreError::VersionConflict { .. })));

    assert!(load_listing(&store, "ad-1").record.is_deleted());
}

#[tokio::test]
async fn test_overlapping_sweeps_commit_each_listing_once() {
    let h = harness(MockPaymentGateway::new());
    for i in 0..20 {
        h.store
            .insert(&make_listing(&format!("ad-{i:02}")).into())
            .unwrap();
    }

    let (a, b) = tokio::join!(
        h.orchestrator.run_sweep(expiry()),
        h.orchestrator.run_sweep(expiry())
    );

    assert_eq!(a.committed + b.committed, 20);
    assert_eq!(h.notifier.count(NoticeKind::GraceStarted), 20);
    for i in 0..20 {
        assert_eq!(load_listing(&h.store, &format!("ad-{i:02}")).version, 2);
    }
}

#[tokio::test]
async fn test_manual_renewal_during_grace() {
    let h = harness(MockPaymentGateway::new());
    h.store.insert(&make_listing("ad-1").into()).unwrap();
    h.orchestrator.run_sweep(expiry()).await;

    let now = expiry() + Duration::days(2);
    let renewed = h
        .orchestrator
        .renew_listing(&ListingId::new("ad-1"), now)
        .await
        .unwrap();
    assert!(renewed.record.is_active());
    assert_eq!(renewed.record.expires_at, Some(now + Duration::days(30)));
    assert_eq!(renewed.version, 3);

    // Nothing left for the sweep at the old grace end
    let report = h.orchestrator.run_sweep(expiry() + Duration::days(7)).await;
    assert_eq!(report.evaluated, 0);
}

#[tokio::test]
async fn test_reactivate_archived_listing() {
    let h = harness(MockPaymentGateway::new());
    h.store.insert(&make_listing("ad-1").into()).unwrap();
    h.orchestrator.run_sweep(expiry()).await;
    h.orchestrator.run_sweep(expiry() + Duration::days(7)).await;
    assert!(load_listing(&h.store, "ad-1").record.is_archived());

    let now = expiry() + Duration::days(40);
    let reactivated = h
        .orchestrator
        .reactivate_listing(&ListingId::new("ad-1"), now)
        .await
        .unwrap();
    assert!(reactivated.record.is_active());
    assert_eq!(h.notifier.count(NoticeKind::Reactivated), 1);
}

#[tokio::test]
async fn test_discount_and_campaign_expire() {
    use classifieds_model::{Campaign, Discount};
    use classifieds_util::{CampaignId, DiscountId};

    let h = harness(MockPaymentGateway::new());
    let discount = Discount {
        id: DiscountId::new("spring"),
        listing_ids: vec![ListingId::new("ad-1")],
        percent: 10,
        start_date: t0(),
        end_date: Some(t0() + Duration::days(5)),
        is_active: true,
        usage_limit: Some(1),
        used_count: 0,
    };
    let campaign = Campaign {
        id: CampaignId::new("summer"),
        name: "Summer".into(),
        listing_ids: vec![],
        start_date: t0(),
        end_date: Some(t0() + Duration::days(5)),
        is_active: true,
    };
    h.store.insert(&Entity::from(discount)).unwrap();
    h.store.insert(&Entity::from(campaign)).unwrap();

    // Redeeming the only use switches the discount off immediately
    let redeemed = h
        .orchestrator
        .redeem_discount(&DiscountId::new("spring"), t0() + Duration::days(1))
        .await
        .unwrap();
    assert!(!redeemed.record.is_active);

    let report = h.orchestrator.run_sweep(t0() + Duration::days(5)).await;
    assert_eq!(report.committed, 1);

    let campaign = h.store.load(EntityKind::Campaign, "summer").unwrap().unwrap();
    assert!(matches!(campaign.record, Entity::Campaign(c) if !c.is_active));
}

#[tokio::test]
async fn test_unavailable_gateway_then_recovery() {
    let payments = MockPaymentGateway::new();
    payments.push_outcome(MockOutcome::Unavailable("connection refused".into()));
    let h = harness(payments);
    h.store
        .insert(&make_listing("ad-1").with_auto_renewal("card-1").into())
        .unwrap();

    h.orchestrator.run_sweep(expiry()).await;
    assert!(matches!(
        load_listing(&h.store, "ad-1").record.state,
        ListingState::GracePeriod { .. }
    ));

    h.orchestrator.run_sweep(expiry() + Duration::days(1)).await;
    let loaded = load_listing(&h.store, "ad-1").record;
    assert!(loaded.is_active());
    assert_eq!(h.payments.successful_charges(), 1);
}

#[tokio::test]
async fn test_config_drives_policy_and_on_disk_store() {
    let config = parse_config(
        r#"
        config_version = 1

        [service]
        workers = 2
        batch_limit = 50

        [lifecycle]
        listing_grace_days = 3

        [[packages]]
        ad_type = "standard"
        duration_days = 10
        price_minor = 1500
        currency = "EUR"
        "#,
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = SqlitePersistence::open(dir.path().join("classifieds.db"))
        .unwrap()
        .with_due_hints(config.lifecycle.due_hints())
        .unwrap();
    let h = harness_with(store, MockPaymentGateway::new(), config.lifecycle.clone());

    h.store
        .insert(&make_listing("ad-1").with_auto_renewal("card-1").into())
        .unwrap();
    h.store.insert(&make_listing("ad-2").into()).unwrap();

    h.orchestrator.run_sweep(expiry()).await;

    let renewed = load_listing(&h.store, "ad-1").record;
    assert_eq!(renewed.expires_at, Some(expiry() + Duration::days(10)));
    assert_eq!(h.payments.requests()[0].amount.currency, "EUR");

    let graced = load_listing(&h.store, "ad-2").record;
    assert_eq!(graced.grace_period_end(), Some(expiry() + Duration::days(3)));
}
