// crates/vmp-core/src/model/notification.rs
// ============================================================================
// Module: VMP Notification
// Description: A row-insertion notification record (spec.md §3, §4.7).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::ids::CaseId;
use crate::ids::NotificationId;
use crate::ids::UserId;
use crate::time::Timestamp;

/// Symbolic notification kind; downstream transports key off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A new inbound message for the other party.
    NewMessage,
    /// An evidence step was verified.
    EvidenceVerified,
    /// An evidence step was rejected.
    EvidenceRejected,
    /// A case was escalated.
    CaseEscalated,
    /// SOA sign-off is required.
    SoaSignoffRequired,
    /// The case's SLA posture became `approaching`.
    SlaApproaching,
    /// The case's SLA posture became `due_today`.
    SlaDueToday,
    /// The case's SLA posture became `overdue`.
    SlaOverdue,
}

/// A notification row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Identifier.
    pub id: NotificationId,
    /// Recipient user.
    pub user_id: UserId,
    /// Related case, if any.
    pub case_id: Option<CaseId>,
    /// Notification kind.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Whether the recipient has read it.
    pub read: bool,
    /// Creation timestamp.
    pub created_at: Timestamp,
}
