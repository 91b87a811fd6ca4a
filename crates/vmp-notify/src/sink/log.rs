// crates/vmp-notify/src/sink/log.rs
// ============================================================================
// Module: Log Sink
// Description: Structured-log notification sink; always wired in so no
//              notification is ever silently dropped (spec.md §4.7).
// Dependencies: vmp-core, tracing
// ============================================================================

use async_trait::async_trait;
use vmp_core::CoreError;
use vmp_core::interfaces::NotificationSink;
use vmp_core::model::notification::Notification;

/// Delivers notifications by emitting a structured `tracing` event.
///
/// # Invariants
/// - Never fails; this sink is the delivery floor every notification
///   reaches even when every other sink is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl LogSink {
    /// Creates a new log sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), CoreError> {
        tracing::info!(
            notification.id = %notification.id,
            notification.user_id = %notification.user_id,
            notification.kind = ?notification.kind,
            notification.case_id = ?notification.case_id,
            notification.title = %notification.title,
            "notification delivered",
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use vmp_core::ids::NotificationId;
    use vmp_core::ids::UserId;
    use vmp_core::model::notification::NotificationKind;
    use vmp_core::time::Timestamp;

    use super::*;

    #[tokio::test]
    async fn log_sink_never_fails() {
        let sink = LogSink::new();
        let notification = Notification {
            id: NotificationId::generate(),
            user_id: UserId::generate(),
            case_id: None,
            kind: NotificationKind::NewMessage,
            title: "New message".to_string(),
            body: "A vendor replied.".to_string(),
            read: false,
            created_at: Timestamp::now(),
        };
        sink.deliver(&notification).await.expect("log sink never fails");
    }
}
