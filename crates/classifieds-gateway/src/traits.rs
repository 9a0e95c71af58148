//! Gateway traits

use async_trait::async_trait;
use classifieds_model::Money;
use classifieds_util::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from payment capture
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The processor refused the charge (insufficient funds, expired card...)
    #[error("Charge declined: {0}")]
    Declined(String),

    /// The processor could not be reached or timed out
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),
}

pub type PaymentResult<T> = Result<T, PaymentError>;

/// Errors from the notification port
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// One auto-renewal charge attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Saved payment instrument
    pub card_uuid: String,
    pub amount: Money,
    /// Same key for the same attempt in the same cycle; the processor must
    /// capture at most once per key
    pub idempotency_key: String,
}

/// Proof of a captured charge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub transaction_id: String,
}

/// What an owner is being told about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    GraceStarted,
    Renewed,
    RenewalFailed,
    Archived,
    Reactivated,
    Deleted,
    Promoted,
    StoreGrace,
    StoreDeactivated,
    StoreArchived,
    StoreReactivated,
    StorePaymentReminder,
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::GraceStarted => "grace_started",
            NoticeKind::Renewed => "renewed",
            NoticeKind::RenewalFailed => "renewal_failed",
            NoticeKind::Archived => "archived",
            NoticeKind::Reactivated => "reactivated",
            NoticeKind::Deleted => "deleted",
            NoticeKind::Promoted => "promoted",
            NoticeKind::StoreGrace => "store_grace",
            NoticeKind::StoreDeactivated => "store_deactivated",
            NoticeKind::StoreArchived => "store_archived",
            NoticeKind::StoreReactivated => "store_reactivated",
            NoticeKind::StorePaymentReminder => "store_payment_reminder",
        }
    }
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment processor adapter
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Capture `request.amount` from the saved card.
    ///
    /// Repeating a request with the same idempotency key returns the
    /// original receipt without charging again.
    async fn charge(&self, request: ChargeRequest) -> PaymentResult<ChargeReceipt>;

    /// Optional: check if the gateway is reachable
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Owner notification sink. Delivery is best effort.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn notify(
        &self,
        user_id: &UserId,
        kind: NoticeKind,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError>;
}
