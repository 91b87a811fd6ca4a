// crates/vmp-core/src/notify.rs
// ============================================================================
// Module: VMP Notifications & SLA Ticker
// Description: Notification draft construction and SLA posture-transition
//              detection (spec.md §4.7).
// Dependencies: crate::model, crate::ids
// ============================================================================

//! ## Overview
//! Notification rows are inserted by `vmp-store` and delivered by
//! `vmp-notify`'s sinks; this module only builds the drafts (content, not
//! persistence) and decides, for the SLA ticker, whether a posture change
//! warrants firing at all. The ticker itself (the periodic scan) lives in
//! `vmp-cli`; it calls [`should_notify`] once per case per tick.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::ids::CaseId;
use crate::ids::UserId;
use crate::model::case::SlaPosture;
use crate::model::notification::NotificationKind;

/// A notification row awaiting an id and creation timestamp, assigned at
/// persistence time by `vmp-store`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
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
}

/// Builds the draft for a new inbound message notification, sent to the
/// other party (spec.md §4.2, §4.7).
#[must_use]
pub fn new_message_draft(recipient: UserId, case_id: CaseId) -> NotificationDraft {
    NotificationDraft {
        user_id: recipient,
        case_id: Some(case_id),
        kind: NotificationKind::NewMessage,
        title: "New message".to_string(),
        body: "A new message was posted on your case.".to_string(),
    }
}

/// Builds the draft for an evidence verdict notification, sent to the
/// supplier.
#[must_use]
pub fn evidence_verdict_draft(recipient: UserId, case_id: CaseId, verified: bool) -> NotificationDraft {
    if verified {
        NotificationDraft {
            user_id: recipient,
            case_id: Some(case_id),
            kind: NotificationKind::EvidenceVerified,
            title: "Evidence verified".to_string(),
            body: "Your uploaded evidence was verified.".to_string(),
        }
    } else {
        NotificationDraft {
            user_id: recipient,
            case_id: Some(case_id),
            kind: NotificationKind::EvidenceRejected,
            title: "Evidence rejected".to_string(),
            body: "Your uploaded evidence was rejected; see the case for the reason.".to_string(),
        }
    }
}

/// Builds the draft for a case-escalation notification.
#[must_use]
pub fn escalation_draft(recipient: UserId, case_id: CaseId, level: u8) -> NotificationDraft {
    NotificationDraft {
        user_id: recipient,
        case_id: Some(case_id),
        kind: NotificationKind::CaseEscalated,
        title: "Case escalated".to_string(),
        body: format!("Case escalated to level {level}."),
    }
}

/// Builds the draft for a SOA sign-off-required notification.
#[must_use]
pub fn soa_signoff_required_draft(recipient: UserId, case_id: CaseId) -> NotificationDraft {
    NotificationDraft {
        user_id: recipient,
        case_id: Some(case_id),
        kind: NotificationKind::SoaSignoffRequired,
        title: "SOA sign-off required".to_string(),
        body: "All lines are matched or resolved; the statement is ready for sign-off.".to_string(),
    }
}

/// Maps an SLA posture to the notification kind fired on transition into
/// it. `OnTrack` never fires a notification.
#[must_use]
pub const fn posture_kind(posture: SlaPosture) -> Option<NotificationKind> {
    match posture {
        SlaPosture::OnTrack => None,
        SlaPosture::Approaching => Some(NotificationKind::SlaApproaching),
        SlaPosture::DueToday => Some(NotificationKind::SlaDueToday),
        SlaPosture::Overdue => Some(NotificationKind::SlaOverdue),
    }
}

/// Returns whether the SLA ticker should fire for a case whose recorded
/// posture was `last` and is now `current` (spec.md §4.7: "idempotent...
/// only fires on change").
#[must_use]
pub fn should_notify(last: Option<SlaPosture>, current: SlaPosture) -> bool {
    last != Some(current) && posture_kind(current).is_some()
}

/// Builds the SLA posture-transition draft, if one should fire.
#[must_use]
pub fn sla_posture_draft(recipient: UserId, case_id: CaseId, last: Option<SlaPosture>, current: SlaPosture) -> Option<NotificationDraft> {
    if !should_notify(last, current) {
        return None;
    }
    let kind = posture_kind(current)?;
    Some(NotificationDraft {
        user_id: recipient,
        case_id: Some(case_id),
        kind,
        title: "SLA posture changed".to_string(),
        body: format!("Case SLA posture is now {current:?}."),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_track_never_notifies() {
        assert!(!should_notify(None, SlaPosture::OnTrack));
        assert!(!should_notify(Some(SlaPosture::Overdue), SlaPosture::OnTrack));
    }

    #[test]
    fn fires_once_per_posture_change() {
        assert!(should_notify(Some(SlaPosture::OnTrack), SlaPosture::Overdue));
        assert!(!should_notify(Some(SlaPosture::Overdue), SlaPosture::Overdue));
    }

    #[test]
    fn scenario_6_sla_escalation_fires_exactly_once() {
        let user = UserId::generate();
        let case = CaseId::generate();
        let first = sla_posture_draft(user, case, Some(SlaPosture::OnTrack), SlaPosture::Overdue);
        assert!(first.is_some());
        let second = sla_posture_draft(user, case, Some(SlaPosture::Overdue), SlaPosture::Overdue);
        assert!(second.is_none());
    }
}
