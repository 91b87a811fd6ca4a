// crates/vmp-notify/src/dispatch.rs
// ============================================================================
// Module: Composite Notification Dispatcher
// Description: Fan-out `NotificationSink` delivering to every configured
//              sink, never failing the caller on a downstream sink error.
// Dependencies: vmp-core, tracing
// ============================================================================

//! ## Overview
//! Grounded on `decision-gate-broker::broker::CompositeBroker`'s
//! builder/registry shape, adapted from scheme-routed content resolution
//! to push-to-all-sinks fan-out: a notification has exactly one delivery
//! semantics (best-effort broadcast), not a choice of one source per URI
//! scheme. The log sink is always present (spec.md §4.7: no notification
//! may go fully undelivered), so [`CompositeDispatcher::deliver`] never
//! returns an error as long as at least the log sink succeeds; sink
//! failures beyond that are logged, not propagated, since a webhook
//! outage must not block the case workflow that triggered the
//! notification.

use std::sync::Arc;

use async_trait::async_trait;
use vmp_core::CoreError;
use vmp_core::interfaces::NotificationSink;
use vmp_core::model::notification::Notification;

use crate::sink::log::LogSink;

/// Fans a single notification out to every registered sink.
///
/// # Invariants
/// - The log sink is always the first entry; it is infallible, so
///   `deliver` only ever returns an error if the log sink itself somehow
///   fails, which its implementation guarantees it never does.
pub struct CompositeDispatcher {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl CompositeDispatcher {
    /// Builds a dispatcher with the log sink and zero or more additional
    /// sinks (e.g. a webhook sink, when configured).
    #[must_use]
    pub fn new(additional: Vec<Arc<dyn NotificationSink>>) -> Self {
        let mut sinks: Vec<Arc<dyn NotificationSink>> = vec![Arc::new(LogSink::new())];
        sinks.extend(additional);
        Self { sinks }
    }
}

#[async_trait]
impl NotificationSink for CompositeDispatcher {
    async fn deliver(&self, notification: &Notification) -> Result<(), CoreError> {
        let mut first_error = None;
        for (index, sink) in self.sinks.iter().enumerate() {
            if let Err(err) = sink.deliver(notification).await {
                tracing::warn!(sink_index = index, error = %err, "notification sink delivery failed");
                if index == 0 {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use vmp_core::ids::NotificationId;
    use vmp_core::ids::UserId;
    use vmp_core::model::notification::NotificationKind;
    use vmp_core::time::Timestamp;

    use super::*;

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn deliver(&self, _notification: &Notification) -> Result<(), CoreError> {
            Err(CoreError::Unavailable("always fails".to_string()))
        }
    }

    struct RecordingSink {
        delivered: Mutex<Vec<NotificationId>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, notification: &Notification) -> Result<(), CoreError> {
            self.delivered.lock().expect("lock").push(notification.id);
            Ok(())
        }
    }

    fn sample() -> Notification {
        Notification {
            id: NotificationId::generate(),
            user_id: UserId::generate(),
            case_id: None,
            kind: NotificationKind::NewMessage,
            title: "hi".to_string(),
            body: "body".to_string(),
            read: false,
            created_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn delivers_to_every_sink() {
        let recorder = Arc::new(RecordingSink { delivered: Mutex::new(Vec::new()) });
        let dispatcher = CompositeDispatcher::new(vec![recorder.clone()]);
        let notification = sample();
        dispatcher.deliver(&notification).await.expect("log sink succeeds");
        assert_eq!(recorder.delivered.lock().expect("lock").as_slice(), &[notification.id]);
    }

    #[tokio::test]
    async fn a_failing_additional_sink_does_not_fail_the_call() {
        let dispatcher = CompositeDispatcher::new(vec![Arc::new(FailingSink)]);
        dispatcher.deliver(&sample()).await.expect("log sink masks the additional sink's failure");
    }
}
