//! Sweep orchestration
//!
//! Loads due records, evaluates them, runs the renewal charge before the
//! commit, commits under the version the record was read at, and only then
//! notifies owners and cascades store deactivation.

use chrono::{DateTime, Duration, Utc};
use classifieds_config::{LifecyclePolicy, ServiceConfig};
use classifieds_gateway::{
    ChargeReceipt, ChargeRequest, NotificationPort, PaymentError, PaymentGateway, PaymentResult,
};
use classifieds_model::{
    Campaign, Discount, Entity, EntityKind, Listing, Store, Version, Versioned,
};
use classifieds_persistence::{AuditEvent, AuditEventType, Persistence, StoreError, StoreResult};
use classifieds_util::{DiscountId, ListingId, StoreId};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::{
    Effect, Evaluation, LifecycleResult, ListingContext, RenewalCharge,
    apply_renewal_failure, apply_renewal_success, cleared_overlays, delete_listing,
    discount_end_reason, evaluate_campaign, evaluate_discount, evaluate_listing, evaluate_store,
    promote_listing, reactivate_listing, reactivate_store, redeem_discount, renew_listing,
    strip_promotion,
};

/// Sweep concurrency and timeout bounds
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Records evaluated in parallel
    pub workers: usize,
    /// Bound on every persistence call
    pub store_timeout: StdDuration,
    /// Bound on every payment call
    pub payment_timeout: StdDuration,
    /// Records loaded per kind per sweep
    pub batch_limit: usize,
    /// How long an invalid record sits out before it is evaluated again
    pub invalid_backoff: StdDuration,
}

impl SweepOptions {
    pub fn from_service(service: &ServiceConfig) -> Self {
        Self {
            workers: service.workers,
            store_timeout: service.store_timeout,
            payment_timeout: service.payment_timeout,
            batch_limit: service.batch_limit,
            invalid_backoff: service.invalid_backoff,
        }
    }
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self::from_service(&ServiceConfig::default())
    }
}

/// What happened to one record during a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOutcome {
    Unchanged,
    Committed,
    /// Another writer committed first; picked up again next sweep
    Conflict,
    Invalid,
    PersistenceFailed,
    Cancelled,
}

/// Totals for one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evaluated: usize,
    pub unchanged: usize,
    pub committed: usize,
    pub conflicts: usize,
    pub invalid: usize,
    pub failures: usize,
    pub cancelled_entities: usize,
    /// Shutdown cut the sweep short
    pub cancelled: bool,
}

impl SweepReport {
    fn record(&mut self, outcome: EntityOutcome) {
        match outcome {
            EntityOutcome::Cancelled => {
                self.cancelled_entities += 1;
                return;
            }
            EntityOutcome::Unchanged => self.unchanged += 1,
            EntityOutcome::Committed => self.committed += 1,
            EntityOutcome::Conflict => self.conflicts += 1,
            EntityOutcome::Invalid => self.invalid += 1,
            EntityOutcome::PersistenceFailed => self.failures += 1,
        }
        self.evaluated += 1;
    }
}

/// Resolves once shutdown is requested; never if the sender is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Drives sweeps and manual actions against the outside world
#[derive(Clone)]
pub struct LifecycleOrchestrator {
    persistence: Arc<dyn Persistence>,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationPort>,
    policy: Arc<LifecyclePolicy>,
    options: SweepOptions,
}

impl LifecycleOrchestrator {
    pub fn new(
        persistence: Arc<dyn Persistence>,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationPort>,
        policy: LifecyclePolicy,
        options: SweepOptions,
    ) -> Self {
        info!(
            workers = options.workers,
            batch_limit = options.batch_limit,
            "Lifecycle orchestrator initialized"
        );

        Self {
            persistence,
            payments,
            notifier,
            policy: Arc::new(policy),
            options,
        }
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    /// Run a persistence call on the blocking pool, bounded by the store timeout
    async fn store_call<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&dyn Persistence) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let persistence = Arc::clone(&self.persistence);
        let task = tokio::task::spawn_blocking(move || f(persistence.as_ref()));

        match tokio::time::timeout(self.options.store_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(StoreError::Unavailable(format!("store task failed: {e}"))),
            Err(_) => Err(StoreError::Unavailable("store call timed out".into())),
        }
    }

    /// Append an audit record; failures are logged and dropped
    async fn audit(&self, now: DateTime<Utc>, event: AuditEventType) {
        let record = AuditEvent::at(now, event);
        if let Err(e) = self.store_call(move |p| p.append_audit(record)).await {
            warn!(error = %e, "Failed to append audit event");
        }
    }

    async fn charge(&self, charge: &RenewalCharge) -> PaymentResult<ChargeReceipt> {
        let request = ChargeRequest {
            card_uuid: charge.card_uuid.clone(),
            amount: charge.amount.clone(),
            idempotency_key: charge.idempotency_key.clone(),
        };

        match tokio::time::timeout(self.options.payment_timeout, self.payments.charge(request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(PaymentError::Unavailable("payment call timed out".into())),
        }
    }

    async fn commit(&self, entity: Entity, expected: Version) -> StoreResult<Version> {
        self.store_call(move |p| p.commit(&entity, expected)).await
    }

    // Sweeps

    /// One full pass over every due record
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let (_tx, rx) = watch::channel(false);
        self.run_sweep_with_shutdown(now, rx).await
    }

    /// Like [`run_sweep`](Self::run_sweep), but stops dispatching and aborts
    /// in-flight work once `shutdown` turns true
    pub async fn run_sweep_with_shutdown(
        &self,
        now: DateTime<Utc>,
        mut shutdown: watch::Receiver<bool>,
    ) -> SweepReport {
        let mut report = SweepReport::default();

        // Stores first so their cascades land before listings are loaded
        for kind in [
            EntityKind::Store,
            EntityKind::Listing,
            EntityKind::Discount,
            EntityKind::Campaign,
        ] {
            if *shutdown.borrow() {
                report.cancelled = true;
                break;
            }

            let limit = self.options.batch_limit;
            let due = match self.store_call(move |p| p.load_due(kind, now, limit)).await {
                Ok(due) => due,
                Err(e) => {
                    error!(kind = %kind, error = %e, "Failed to load due records");
                    report.failures += 1;
                    continue;
                }
            };

            if due.is_empty() {
                continue;
            }
            debug!(kind = %kind, count = due.len(), "Evaluating due records");

            self.run_phase(due, now, &mut shutdown, &mut report).await;
            if report.cancelled {
                break;
            }
        }

        self.audit(
            now,
            AuditEventType::SweepCompleted {
                evaluated: report.evaluated,
                committed: report.committed,
                conflicts: report.conflicts,
                failures: report.failures,
                cancelled: report.cancelled,
            },
        )
        .await;

        info!(
            evaluated = report.evaluated,
            committed = report.committed,
            conflicts = report.conflicts,
            invalid = report.invalid,
            failures = report.failures,
            cancelled = report.cancelled,
            "Sweep completed"
        );

        report
    }

    async fn run_phase(
        &self,
        due: Vec<Versioned<Entity>>,
        now: DateTime<Utc>,
        shutdown: &mut watch::Receiver<bool>,
        report: &mut SweepReport,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let mut tasks = JoinSet::new();

        for versioned in due {
            if *shutdown.borrow() {
                report.cancelled = true;
                break;
            }

            let permit = tokio::select! {
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = wait_for_shutdown(shutdown) => {
                    report.cancelled = true;
                    break;
                }
            };

            let this = self.clone();
            tasks.spawn(async move {
                let _permit = permit;
                this.process(versioned, now).await
            });
        }

        if report.cancelled {
            tasks.abort_all();
        }

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(outcome)) => report.record(outcome),
                    Some(Err(e)) if e.is_cancelled() => report.record(EntityOutcome::Cancelled),
                    Some(Err(e)) => {
                        error!(error = %e, "Evaluation task panicked");
                        report.record(EntityOutcome::PersistenceFailed);
                    }
                    None => break,
                },
                _ = wait_for_shutdown(shutdown), if !report.cancelled => {
                    info!("Shutdown requested; aborting in-flight evaluations");
                    report.cancelled = true;
                    tasks.abort_all();
                }
            }
        }
    }

    async fn process(&self, versioned: Versioned<Entity>, now: DateTime<Utc>) -> EntityOutcome {
        let Versioned { record, version } = versioned;
        match record {
            Entity::Listing(listing) => self.process_listing(listing, version, now).await,
            Entity::Store(store) => self.process_store(store, version, now).await,
            Entity::Discount(discount) => self.process_discount(discount, version, now).await,
            Entity::Campaign(campaign) => self.process_campaign(campaign, version, now).await,
        }
    }

    /// Push an invalid record out of the due window so it cannot crowd
    /// valid records out of later batches
    async fn skip_invalid(&self, kind: EntityKind, id: &str, now: DateTime<Utc>) -> EntityOutcome {
        let until = match Duration::from_std(self.options.invalid_backoff) {
            Ok(backoff) => now + backoff,
            Err(_) => now + Duration::hours(1),
        };
        let key = id.to_string();
        if let Err(e) = self.store_call(move |p| p.defer(kind, &key, until)).await {
            warn!(kind = %kind, id, error = %e, "Failed to defer invalid record");
        }
        EntityOutcome::Invalid
    }

    /// Whether the store owning `listing` is deactivated or archived
    async fn store_suspended(&self, listing: &Listing) -> StoreResult<bool> {
        let Some(store_id) = listing.store_id.clone() else {
            return Ok(false);
        };
        let loaded = self
            .store_call(move |p| p.load(EntityKind::Store, store_id.as_str()))
            .await?;
        Ok(loaded
            .and_then(|v| v.record.into_store())
            .is_some_and(|s| s.is_suspended()))
    }

    async fn process_listing(
        &self,
        listing: Listing,
        version: Version,
        now: DateTime<Utc>,
    ) -> EntityOutcome {
        let store_suspended = match self.store_suspended(&listing).await {
            Ok(suspended) => suspended,
            Err(e) => {
                warn!(listing_id = %listing.id, error = %e, "Failed to load owning store");
                return EntityOutcome::PersistenceFailed;
            }
        };
        let ctx = ListingContext::at(now).with_store_suspended(store_suspended);

        let mut evaluation = match evaluate_listing(&listing, &ctx, &self.policy) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!(listing_id = %listing.id, error = %e, "Skipping invalid listing");
                return self
                    .skip_invalid(EntityKind::Listing, listing.id.as_str(), now)
                    .await;
            }
        };

        if let Some(charge) = evaluation.take_charge() {
            evaluation = match self.charge(&charge).await {
                Ok(receipt) => {
                    info!(
                        listing_id = %listing.id,
                        transaction_id = %receipt.transaction_id,
                        amount = %charge.amount,
                        "Auto-renewal charge captured"
                    );
                    self.audit(
                        now,
                        AuditEventType::RenewalCharged {
                            listing_id: listing.id.clone(),
                            transaction_id: receipt.transaction_id.clone(),
                            idempotency_key: charge.idempotency_key.clone(),
                            amount: charge.amount.clone(),
                        },
                    )
                    .await;

                    match apply_renewal_success(
                        &evaluation.next,
                        &ctx,
                        &self.policy,
                        receipt.transaction_id,
                    ) {
                        Ok(renewed) => renewed,
                        Err(e) => {
                            error!(listing_id = %listing.id, error = %e, "Charged listing could not be renewed");
                            return self
                                .skip_invalid(EntityKind::Listing, listing.id.as_str(), now)
                                .await;
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        listing_id = %listing.id,
                        idempotency_key = %charge.idempotency_key,
                        error = %e,
                        "Auto-renewal charge failed"
                    );
                    self.audit(
                        now,
                        AuditEventType::RenewalFailed {
                            listing_id: listing.id.clone(),
                            idempotency_key: charge.idempotency_key.clone(),
                            reason: e.to_string(),
                        },
                    )
                    .await;

                    apply_renewal_failure(evaluation, &ctx, &self.policy, &e)
                }
            };
        }

        if evaluation.is_noop(&listing) {
            return EntityOutcome::Unchanged;
        }

        let Evaluation { next, effects } = evaluation;
        match self.commit(next.clone().into(), version).await {
            Ok(_) => {}
            Err(e) => return self.commit_failed(EntityKind::Listing, listing.id.as_str(), e),
        }

        self.audit_listing_change(&listing, &next, now).await;
        self.execute_effects(effects, now).await;
        EntityOutcome::Committed
    }

    async fn audit_listing_change(&self, before: &Listing, after: &Listing, now: DateTime<Utc>) {
        let (from, to) = (before.state.tag(), after.state.tag());
        if from != to {
            info!(listing_id = %after.id, from = %from, to = %to, "Listing transitioned");
            self.audit(
                now,
                AuditEventType::ListingTransitioned {
                    listing_id: after.id.clone(),
                    from,
                    to,
                },
            )
            .await;
        }

        let cleared = cleared_overlays(&before.overlays, &after.overlays);
        if !cleared.is_empty() {
            debug!(listing_id = %after.id, cleared = ?cleared, "Overlays cleared");
            self.audit(
                now,
                AuditEventType::OverlaysCleared {
                    listing_id: after.id.clone(),
                    cleared,
                },
            )
            .await;
        }
    }

    async fn process_store(&self, store: Store, version: Version, now: DateTime<Utc>) -> EntityOutcome {
        let evaluation = match evaluate_store(&store, now, &self.policy) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!(store_id = %store.id, error = %e, "Skipping invalid store");
                return self
                    .skip_invalid(EntityKind::Store, store.id.as_str(), now)
                    .await;
            }
        };

        if evaluation.is_noop(&store) {
            return EntityOutcome::Unchanged;
        }

        let Evaluation { next, effects } = evaluation;
        if let Err(e) = self.commit(next.clone().into(), version).await {
            return self.commit_failed(EntityKind::Store, store.id.as_str(), e);
        }

        let (from, to) = (store.status.tag(), next.status.tag());
        if from != to {
            info!(store_id = %store.id, from = %from, to = %to, "Store transitioned");
            self.audit(
                now,
                AuditEventType::StoreTransitioned {
                    store_id: store.id.clone(),
                    from,
                    to,
                },
            )
            .await;
        }

        self.execute_effects(effects, now).await;
        EntityOutcome::Committed
    }

    async fn process_discount(
        &self,
        discount: Discount,
        version: Version,
        now: DateTime<Utc>,
    ) -> EntityOutcome {
        let evaluation = evaluate_discount(&discount, now);
        if evaluation.is_noop(&discount) {
            return EntityOutcome::Unchanged;
        }

        if let Err(e) = self.commit(evaluation.next.into(), version).await {
            return self.commit_failed(EntityKind::Discount, discount.id.as_str(), e);
        }

        let reason = discount_end_reason(&discount, now)
            .map(|r| r.to_string())
            .unwrap_or_default();
        info!(discount_id = %discount.id, reason = %reason, "Discount deactivated");
        self.audit(
            now,
            AuditEventType::DiscountDeactivated {
                discount_id: discount.id.clone(),
                reason,
            },
        )
        .await;

        EntityOutcome::Committed
    }

    async fn process_campaign(
        &self,
        campaign: Campaign,
        version: Version,
        now: DateTime<Utc>,
    ) -> EntityOutcome {
        let evaluation = evaluate_campaign(&campaign, now);
        if evaluation.is_noop(&campaign) {
            return EntityOutcome::Unchanged;
        }

        if let Err(e) = self.commit(evaluation.next.into(), version).await {
            return self.commit_failed(EntityKind::Campaign, campaign.id.as_str(), e);
        }

        info!(campaign_id = %campaign.id, "Campaign ended");
        self.audit(
            now,
            AuditEventType::CampaignEnded {
                campaign_id: campaign.id.clone(),
            },
        )
        .await;

        EntityOutcome::Committed
    }

    fn commit_failed(&self, kind: EntityKind, id: &str, e: StoreError) -> EntityOutcome {
        if e.is_conflict() {
            debug!(kind = %kind, id, "Version conflict; skipping until next sweep");
            EntityOutcome::Conflict
        } else {
            warn!(kind = %kind, id, error = %e, "Commit failed");
            EntityOutcome::PersistenceFailed
        }
    }

    // Effects

    async fn execute_effects(&self, effects: Vec<Effect>, now: DateTime<Utc>) {
        for effect in effects {
            match effect {
                Effect::NotifyOwner {
                    user_id,
                    kind,
                    payload,
                } => {
                    if let Err(e) = self.notifier.notify(&user_id, kind, payload).await {
                        warn!(user_id = %user_id, notice = %kind, error = %e, "Failed to notify owner");
                    }
                }
                Effect::CascadeDeactivateListings { store_id } => {
                    self.cascade_deactivation(&store_id, now).await;
                }
                Effect::ChargeRenewal(charge) => {
                    // Charges only run before a commit
                    debug!(listing_id = %charge.listing_id, "Ignoring charge after commit");
                }
            }
        }
    }

    /// Strip promotions from every listing the store owns.
    ///
    /// Each listing commits under its own version; a conflicting listing is
    /// fixed by its own next evaluation. Returns the number stripped.
    pub async fn cascade_deactivation(&self, store_id: &StoreId, now: DateTime<Utc>) -> usize {
        let owner = store_id.clone();
        let listings = match self.store_call(move |p| p.listings_for_store(&owner)).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!(store_id = %store_id, error = %e, "Failed to load store listings for cascade");
                return 0;
            }
        };

        let mut stripped = 0;
        for versioned in listings {
            let Some(next) = strip_promotion(&versioned.record) else {
                continue;
            };
            let listing_id = next.id.clone();

            match self.commit(next.into(), versioned.version).await {
                Ok(_) => {
                    stripped += 1;
                    self.audit(
                        now,
                        AuditEventType::OverlaysCleared {
                            listing_id,
                            cleared: vec!["promotion".into()],
                        },
                    )
                    .await;
                }
                Err(e) if e.is_conflict() => {
                    debug!(listing_id = %listing_id, "Cascade conflict; listing will clear its own promotion");
                }
                Err(e) => {
                    warn!(listing_id = %listing_id, error = %e, "Cascade commit failed");
                }
            }
        }

        info!(store_id = %store_id, stripped, "Store deactivation cascaded");
        stripped
    }

    // Manual actions

    async fn load_listing(&self, id: &ListingId) -> LifecycleResult<Versioned<Listing>> {
        let key = id.as_str().to_string();
        let loaded = self
            .store_call(move |p| p.load(EntityKind::Listing, &key))
            .await?;
        loaded
            .and_then(|v| {
                let version = v.version;
                v.record.into_listing().map(|l| Versioned::new(l, version))
            })
            .ok_or_else(|| {
                StoreError::NotFound {
                    kind: EntityKind::Listing,
                    id: id.to_string(),
                }
                .into()
            })
    }

    async fn load_store(&self, id: &StoreId) -> LifecycleResult<Versioned<Store>> {
        let key = id.as_str().to_string();
        let loaded = self.store_call(move |p| p.load(EntityKind::Store, &key)).await?;
        loaded
            .and_then(|v| {
                let version = v.version;
                v.record.into_store().map(|s| Versioned::new(s, version))
            })
            .ok_or_else(|| {
                StoreError::NotFound {
                    kind: EntityKind::Store,
                    id: id.to_string(),
                }
                .into()
            })
    }

    async fn load_discount(&self, id: &DiscountId) -> LifecycleResult<Versioned<Discount>> {
        let key = id.as_str().to_string();
        let loaded = self
            .store_call(move |p| p.load(EntityKind::Discount, &key))
            .await?;
        match loaded {
            Some(Versioned {
                record: Entity::Discount(discount),
                version,
            }) => Ok(Versioned::new(discount, version)),
            _ => Err(StoreError::NotFound {
                kind: EntityKind::Discount,
                id: id.to_string(),
            }
            .into()),
        }
    }

    /// Commit a manual action's result, then audit it and run its effects
    async fn commit_manual<T>(
        &self,
        evaluation: Evaluation<T>,
        version: Version,
        action: &'static str,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Versioned<T>>
    where
        T: Clone + Into<Entity>,
    {
        let Evaluation { next, effects } = evaluation;
        let entity: Entity = next.clone().into();
        let (kind, id) = (entity.kind(), entity.id().to_string());

        let new_version = self.commit(entity, version).await?;

        info!(kind = %kind, id = %id, action, "Manual action applied");
        self.audit(now, AuditEventType::ManualAction { kind, id, action: action.into() })
            .await;
        self.execute_effects(effects, now).await;

        Ok(Versioned::new(next, new_version))
    }

    pub async fn renew_listing(
        &self,
        id: &ListingId,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Versioned<Listing>> {
        let current = self.load_listing(id).await?;
        let evaluation = renew_listing(&current.record, now, &self.policy)?;
        self.commit_manual(evaluation, current.version, "renew", now).await
    }

    pub async fn reactivate_listing(
        &self,
        id: &ListingId,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Versioned<Listing>> {
        let current = self.load_listing(id).await?;
        let evaluation = reactivate_listing(&current.record, now, &self.policy)?;
        self.commit_manual(evaluation, current.version, "reactivate", now)
            .await
    }

    pub async fn delete_listing(
        &self,
        id: &ListingId,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Versioned<Listing>> {
        let current = self.load_listing(id).await?;
        let evaluation = delete_listing(&current.record, now)?;
        self.commit_manual(evaluation, current.version, "delete", now).await
    }

    pub async fn promote_listing(
        &self,
        id: &ListingId,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Versioned<Listing>> {
        let current = self.load_listing(id).await?;
        let suspended = self.store_suspended(&current.record).await?;
        let ctx = ListingContext::at(now).with_store_suspended(suspended);
        let evaluation = promote_listing(&current.record, &ctx, &self.policy, until)?;
        self.commit_manual(evaluation, current.version, "promote", now).await
    }

    pub async fn reactivate_store(
        &self,
        id: &StoreId,
        period: Duration,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Versioned<Store>> {
        let current = self.load_store(id).await?;
        let evaluation = reactivate_store(&current.record, now, period)?;
        self.commit_manual(evaluation, current.version, "reactivate", now)
            .await
    }

    pub async fn redeem_discount(
        &self,
        id: &DiscountId,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Versioned<Discount>> {
        let current = self.load_discount(id).await?;
        let evaluation = redeem_discount(&current.record, now)?;
        self.commit_manual(evaluation, current.version, "redeem", now).await
    }

    /// Register a new record
    pub async fn insert(&self, entity: Entity) -> LifecycleResult<Version> {
        Ok(self.store_call(move |p| p.insert(&entity)).await?)
    }
}
