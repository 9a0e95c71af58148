//! Mock gateway and notifier for testing

use async_trait::async_trait;
use classifieds_util::UserId;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{
    ChargeReceipt, ChargeRequest, NoticeKind, NotificationPort, NotifyError, PaymentError,
    PaymentGateway, PaymentResult,
};

/// Scripted result of the next new charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    Approve,
    Decline(String),
    Unavailable(String),
}

/// In-memory payment processor.
///
/// Captures at most once per idempotency key, like a real processor, and
/// counts how many charges were actually captured.
pub struct MockPaymentGateway {
    next_txn: AtomicU64,
    captured: Arc<Mutex<HashMap<String, ChargeReceipt>>>,
    requests: Arc<Mutex<Vec<ChargeRequest>>>,
    script: Arc<Mutex<VecDeque<MockOutcome>>>,

    /// Outcome used once the script runs dry
    pub default_outcome: Arc<Mutex<MockOutcome>>,

    /// Artificial latency before answering
    pub delay: Arc<Mutex<Option<Duration>>>,

    /// Latency after a charge is captured, before the receipt is returned
    pub reply_delay: Arc<Mutex<Option<Duration>>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            next_txn: AtomicU64::new(1),
            captured: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
            default_outcome: Arc::new(Mutex::new(MockOutcome::Approve)),
            delay: Arc::new(Mutex::new(None)),
            reply_delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Gateway that declines every charge
    pub fn declining(reason: impl Into<String>) -> Self {
        let gateway = Self::new();
        gateway.set_default_outcome(MockOutcome::Decline(reason.into()));
        gateway
    }

    /// Queue the outcome of the next charge with an unseen key
    pub fn push_outcome(&self, outcome: MockOutcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn set_default_outcome(&self, outcome: MockOutcome) {
        *self.default_outcome.lock().unwrap() = outcome;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Capture the charge, then stall before answering. A caller that times
    /// out sees a failure although the money was taken.
    pub fn set_reply_delay(&self, delay: Option<Duration>) {
        *self.reply_delay.lock().unwrap() = delay;
    }

    /// Number of charges actually captured
    pub fn successful_charges(&self) -> usize {
        self.captured.lock().unwrap().len()
    }

    /// Every request received, including replays
    pub fn requests(&self) -> Vec<ChargeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(&self, request: ChargeRequest) -> PaymentResult<ChargeReceipt> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.requests.lock().unwrap().push(request.clone());

        if let Some(receipt) = self.captured.lock().unwrap().get(&request.idempotency_key) {
            return Ok(receipt.clone());
        }

        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_outcome.lock().unwrap().clone());

        match outcome {
            MockOutcome::Approve => {
                let n = self.next_txn.fetch_add(1, Ordering::SeqCst);
                let receipt = ChargeReceipt {
                    transaction_id: format!("txn-{n}"),
                };
                self.captured
                    .lock()
                    .unwrap()
                    .insert(request.idempotency_key, receipt.clone());

                let reply_delay = *self.reply_delay.lock().unwrap();
                if let Some(delay) = reply_delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(receipt)
            }
            MockOutcome::Decline(reason) => Err(PaymentError::Declined(reason)),
            MockOutcome::Unavailable(msg) => Err(PaymentError::Unavailable(msg)),
        }
    }
}

/// A notice captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedNotice {
    pub user_id: UserId,
    pub kind: NoticeKind,
    pub payload: serde_json::Value,
}

/// Notifier that keeps every notice in memory
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<RecordedNotice>>>,

    /// Configure delivery to fail
    pub fail: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<RecordedNotice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn notify(
        &self,
        user_id: &UserId,
        kind: NoticeKind,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        if *self.fail.lock().unwrap() {
            return Err(NotifyError::Delivery("Mock delivery failure".into()));
        }
        self.notices.lock().unwrap().push(RecordedNotice {
            user_id: user_id.clone(),
            kind,
            payload,
        });
        Ok(())
    }
}
