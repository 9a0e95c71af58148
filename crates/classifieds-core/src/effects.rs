//! Side effects requested by the evaluators

use classifieds_gateway::NoticeKind;
use classifieds_model::Money;
use classifieds_util::{ListingId, StoreId, UserId};

/// Auto-renewal charge to run before the fallback state is committed
#[derive(Debug, Clone, PartialEq)]
pub struct RenewalCharge {
    pub listing_id: ListingId,
    pub owner: UserId,
    pub card_uuid: String,
    pub amount: Money,
    pub idempotency_key: String,
}

/// Effects are data; the orchestrator decides when and whether to run them
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Charge the saved card; runs before the commit
    ChargeRenewal(RenewalCharge),

    /// Tell the owner what happened; runs after the commit
    NotifyOwner {
        user_id: UserId,
        kind: NoticeKind,
        payload: serde_json::Value,
    },

    /// Strip promotions from every listing of a deactivated store; runs
    /// after the store commit
    CascadeDeactivateListings { store_id: StoreId },
}

impl Effect {
    pub fn notify(user_id: &UserId, kind: NoticeKind, payload: serde_json::Value) -> Self {
        Effect::NotifyOwner {
            user_id: user_id.clone(),
            kind,
            payload,
        }
    }
}

/// Target snapshot plus the effects needed to get there.
///
/// Evaluators never touch their input; `next` is a fresh copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation<T> {
    pub next: T,
    pub effects: Vec<Effect>,
}

impl<T: PartialEq> Evaluation<T> {
    pub fn unchanged(record: T) -> Self {
        Self {
            next: record,
            effects: Vec::new(),
        }
    }

    /// Nothing to commit and nothing to do
    pub fn is_noop(&self, original: &T) -> bool {
        self.effects.is_empty() && self.next == *original
    }

    /// Remove and return the pending charge, if any
    pub fn take_charge(&mut self) -> Option<RenewalCharge> {
        let index = self
            .effects
            .iter()
            .position(|e| matches!(e, Effect::ChargeRenewal(_)))?;
        match self.effects.remove(index) {
            Effect::ChargeRenewal(charge) => Some(charge),
            _ => None,
        }
    }

    pub fn notices(&self) -> impl Iterator<Item = NoticeKind> + '_ {
        self.effects.iter().filter_map(|e| match e {
            Effect::NotifyOwner { kind, .. } => Some(*kind),
            _ => None,
        })
    }

    pub fn has_notice(&self, kind: NoticeKind) -> bool {
        self.notices().any(|k| k == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_charge_removes_only_the_charge() {
        let owner = UserId::new("user-1");
        let mut evaluation = Evaluation {
            next: 1u32,
            effects: vec![
                Effect::notify(&owner, NoticeKind::GraceStarted, serde_json::json!({})),
                Effect::ChargeRenewal(RenewalCharge {
                    listing_id: ListingId::new("ad-1"),
                    owner: owner.clone(),
                    card_uuid: "card-1".into(),
                    amount: Money::new(100, "USD"),
                    idempotency_key: "k".into(),
                }),
            ],
        };

        let charge = evaluation.take_charge().unwrap();
        assert_eq!(charge.idempotency_key, "k");
        assert!(evaluation.take_charge().is_none());
        assert!(evaluation.has_notice(NoticeKind::GraceStarted));
        assert_eq!(evaluation.effects.len(), 1);
    }

    #[test]
    fn noop_requires_same_record_and_no_effects() {
        let evaluation = Evaluation::unchanged(7u32);
        assert!(evaluation.is_noop(&7));
        assert!(!evaluation.is_noop(&8));
    }
}
