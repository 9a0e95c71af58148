//! Notification port that writes owner notices to the log

use async_trait::async_trait;
use classifieds_util::UserId;
use tracing::info;

use crate::{NoticeKind, NotificationPort, NotifyError};

/// Logs every notice; stands in until a delivery channel is wired up
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationPort for LogNotifier {
    async fn notify(
        &self,
        user_id: &UserId,
        kind: NoticeKind,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        info!(user_id = %user_id, notice = %kind, payload = %payload, "Owner notified");
        Ok(())
    }
}
