// crates/vmp-core/src/model/thread.rs
// ============================================================================
// Module: VMP Message
// Description: Immutable thread entries attached to a case (spec.md §3, §4.2).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::ids::CaseId;
use crate::ids::MessageId;
use crate::ids::UserId;
use crate::time::Timestamp;

/// Which side of the conversation produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderParty {
    /// The supplier side.
    Vendor,
    /// Internal staff.
    Internal,
    /// An automated assistant acting on the case.
    Ai,
    /// The system itself (status transitions, audit entries).
    System,
}

/// The channel a message arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSource {
    /// The VMP portal UI.
    Portal,
    /// An email adapter.
    Email,
    /// A WhatsApp adapter.
    Whatsapp,
    /// A Slack adapter.
    Slack,
    /// Produced by the system itself.
    System,
}

/// An immutable thread entry.
///
/// # Invariants
/// - There is no update or delete operation; messages are write-once.
/// - Ordering within a case is by `created_at` ascending, ties broken by
///   `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier.
    pub id: MessageId,
    /// Owning case.
    pub case_id: CaseId,
    /// Sending user, absent for system-originated messages.
    pub sender_user_id: Option<UserId>,
    /// Which side produced the message.
    pub sender_party: SenderParty,
    /// Channel the message arrived through.
    pub channel_source: ChannelSource,
    /// Message text.
    pub body: String,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// True if only internal actors may see this message.
    pub internal_note: bool,
}
