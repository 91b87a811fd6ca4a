// crates/vmp-notify/src/sink/webhook.rs
// ============================================================================
// Module: Webhook Sink
// Description: Best-effort HTTP POST notification sink.
// Dependencies: reqwest, serde_json, vmp-core
// ============================================================================

//! ## Overview
//! Posts a JSON body to a configured endpoint (`VmpConfig::notify.webhook_endpoint`,
//! spec.md §1 "out of scope... notification delivery transport" is the
//! reason this sink stays deliberately simple: one POST, no retry queue,
//! no delivery guarantee beyond "the HTTP call returned 2xx"). A non-2xx
//! response or transport failure surfaces as `CoreError::Unavailable` so
//! [`crate::dispatch::CompositeDispatcher`] can log it without ever
//! blocking the notification row that the log sink already delivered.

use async_trait::async_trait;
use serde_json::json;
use vmp_core::CoreError;
use vmp_core::interfaces::NotificationSink;
use vmp_core::model::notification::Notification;

/// Delivers notifications by POSTing a JSON body to a webhook endpoint.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookSink {
    /// Creates a sink posting to `endpoint` with a fresh HTTP client.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into() }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), CoreError> {
        let body = json!({
            "id": notification.id.to_string(),
            "user_id": notification.user_id.to_string(),
            "case_id": notification.case_id.map(|id| id.to_string()),
            "kind": notification.kind,
            "title": notification.title,
            "body": notification.body,
            "created_at": notification.created_at,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Unavailable(format!("webhook post failed: {e}")))?;
        if !response.status().is_success() {
            return Err(CoreError::Unavailable(format!("webhook returned {}", response.status())));
        }
        Ok(())
    }
}
