// crates/vmp-core/src/thread.rs
// ============================================================================
// Module: VMP Thread
// Description: Message validation and sender-party/channel resolution
//              (spec.md §4.2).
// Dependencies: crate::model, crate::error
// ============================================================================

//! ## Overview
//! Append-message validation and the "opposite party flips the waiting
//! side" convenience rule live here as pure functions; persistence and
//! notification dispatch are the caller's responsibility.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::error::CoreError;
use crate::ids::CaseId;
use crate::ids::MessageId;
use crate::model::actor::Actor;
use crate::model::actor::ActorRole;
use crate::model::case::CaseStatus;
use crate::model::thread::ChannelSource;
use crate::model::thread::Message;
use crate::model::thread::SenderParty;
use crate::time::Timestamp;

/// Maximum message body size in bytes (spec.md §4.2).
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// Validates and trims a message body.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if the trimmed body is empty or
/// exceeds [`MAX_BODY_BYTES`].
pub fn validate_body(body: &str) -> Result<String, CoreError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("message body must not be empty"));
    }
    if trimmed.len() > MAX_BODY_BYTES {
        return Err(CoreError::validation(format!(
            "message body of {} bytes exceeds the {} byte limit",
            trimmed.len(),
            MAX_BODY_BYTES
        )));
    }
    Ok(trimmed.to_string())
}

/// Determines the sender party from the posting actor.
#[must_use]
pub const fn sender_party_for(actor: &Actor) -> SenderParty {
    match actor.role {
        ActorRole::Supplier => SenderParty::Vendor,
        ActorRole::Internal => SenderParty::Internal,
    }
}

/// Validates the internal-note flag against the posting actor.
///
/// # Errors
///
/// Returns [`CoreError::Authorization`] if a supplier actor requests an
/// internal note.
pub fn validate_internal_note(actor: &Actor, internal_note: bool) -> Result<(), CoreError> {
    if internal_note && matches!(actor.role, ActorRole::Supplier) {
        return Err(CoreError::authorization("supplier actors may not post internal notes"));
    }
    Ok(())
}

/// Computes the case status toggle convenience rule: when the posting
/// actor is on the opposite side from the case's current waiting status,
/// the case flips to wait on the other side.
#[must_use]
pub const fn waiting_side_toggle(actor: &Actor, current_status: CaseStatus) -> Option<CaseStatus> {
    match (actor.role, current_status) {
        (ActorRole::Supplier, CaseStatus::WaitingSupplier) => Some(CaseStatus::WaitingInternal),
        (ActorRole::Internal, CaseStatus::WaitingInternal) => Some(CaseStatus::WaitingSupplier),
        _ => None,
    }
}

/// Returns whether a supplier actor may view the given message, honoring
/// the internal-note visibility rule (spec.md §4.2, §8).
#[must_use]
pub const fn visible_to_supplier(internal_note: bool) -> bool {
    !internal_note
}

/// Builds a system-authored audit message (case opened, status changed,
/// escalated, sign-off recorded, and similar events). Always visible to
/// both parties.
#[must_use]
pub fn system_message(case_id: CaseId, body: String, now: Timestamp) -> Message {
    Message {
        id: MessageId::generate(),
        case_id,
        sender_user_id: None,
        sender_party: SenderParty::System,
        channel_source: ChannelSource::System,
        body,
        created_at: now,
        internal_note: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TenantId;
    use crate::ids::UserId;
    use crate::ids::VendorId;

    fn supplier_actor() -> Actor {
        Actor {
            user_id: UserId::generate(),
            tenant_id: TenantId::generate(),
            role: ActorRole::Supplier,
            vendor_id: Some(VendorId::generate()),
        }
    }

    fn internal_actor() -> Actor {
        Actor { user_id: UserId::generate(), tenant_id: TenantId::generate(), role: ActorRole::Internal, vendor_id: None }
    }

    #[test]
    fn empty_body_is_rejected() {
        assert!(validate_body("   ").is_err());
    }

    #[test]
    fn oversized_body_is_rejected() {
        let body = "a".repeat(MAX_BODY_BYTES + 1);
        assert!(validate_body(&body).is_err());
    }

    #[test]
    fn body_is_trimmed() {
        assert_eq!(validate_body("  hello  ").expect("valid"), "hello");
    }

    #[test]
    fn supplier_cannot_post_internal_note() {
        assert!(validate_internal_note(&supplier_actor(), true).is_err());
        assert!(validate_internal_note(&internal_actor(), true).is_ok());
    }

    #[test]
    fn waiting_side_flips_on_opposite_party() {
        assert_eq!(
            waiting_side_toggle(&supplier_actor(), CaseStatus::WaitingSupplier),
            Some(CaseStatus::WaitingInternal)
        );
        assert_eq!(
            waiting_side_toggle(&internal_actor(), CaseStatus::WaitingInternal),
            Some(CaseStatus::WaitingSupplier)
        );
        assert_eq!(waiting_side_toggle(&supplier_actor(), CaseStatus::WaitingInternal), None);
    }

    #[test]
    fn suppliers_never_see_internal_notes() {
        assert!(!visible_to_supplier(true));
        assert!(visible_to_supplier(false));
    }

    #[test]
    fn system_messages_are_visible_to_both_parties() {
        let message = system_message(CaseId::generate(), "case escalated to level 2".to_string(), Timestamp::now());
        assert_eq!(message.sender_party, SenderParty::System);
        assert_eq!(message.channel_source, ChannelSource::System);
        assert!(message.sender_user_id.is_none());
        assert!(visible_to_supplier(message.internal_note));
    }
}
