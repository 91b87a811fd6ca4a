// crates/vmp-core/src/case.rs
// ============================================================================
// Module: VMP Case Registry
// Description: Status machine, SLA window defaults, and escalation effects.
// Purpose: Pure decision logic for the Case Registry component (spec.md §4.1).
//          Persistence is performed by callers through `crate::interfaces`.
// Dependencies: crate::model, crate::error, time
// ============================================================================

//! ## Overview
//! The Case Registry's hard rules — which status transitions are legal,
//! what a case's default SLA window and owner team are, and what an
//! escalation does to status and owner team — are pure functions here so
//! they can be unit tested without a store. The HTTP boundary and
//! `vmp-store` call into this module rather than re-implementing the
//! matrix of spec.md §4.1.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Duration;

use crate::error::CoreError;
use crate::model::case::CaseStatus;
use crate::model::case::CaseType;
use crate::model::case::OwnerTeam;

// ============================================================================
// SECTION: SLA Window Defaults
// ============================================================================

/// Default SLA window for a case type, per spec.md §4.1.
///
/// SPEC_FULL.md §3.3 requires these be configurable; this function supplies
/// the defaults `VmpConfig` falls back to when a tenant has not overridden
/// them.
#[must_use]
pub const fn default_sla_window(case_type: CaseType) -> Duration {
    match case_type {
        CaseType::Onboarding => Duration::days(5),
        CaseType::Invoice => Duration::days(3),
        CaseType::Payment => Duration::days(2),
        CaseType::Soa => Duration::days(7),
        CaseType::Contract | CaseType::General => Duration::days(5),
    }
}

// ============================================================================
// SECTION: Status Machine
// ============================================================================

/// Returns whether `from -> to` is an allowed transition (spec.md §4.1
/// status matrix).
#[must_use]
pub const fn is_allowed_transition(from: CaseStatus, to: CaseStatus) -> bool {
    use CaseStatus::{Blocked, Cancelled, Open, Rejected, Resolved, WaitingInternal, WaitingSupplier};
    matches!(
        (from, to),
        (Open, WaitingSupplier | WaitingInternal | Blocked | Cancelled)
            | (WaitingSupplier, WaitingInternal | Resolved | Rejected | Blocked)
            | (WaitingInternal, WaitingSupplier | Resolved | Rejected | Blocked)
            | (Rejected, WaitingSupplier)
            | (Blocked, WaitingInternal | WaitingSupplier)
    )
}

/// Validates a requested transition, returning a conflict error when it is
/// not permitted by the status matrix.
///
/// # Errors
///
/// Returns [`CoreError::Conflict`] when `from -> to` is not in the allowed
/// set (spec.md §8: "a status transition from resolved to anything is
/// rejected with conflict").
pub fn validate_transition(from: CaseStatus, to: CaseStatus) -> Result<(), CoreError> {
    if is_allowed_transition(from, to) {
        Ok(())
    } else {
        Err(CoreError::conflict(format!("cannot transition case from {from:?} to {to:?}")))
    }
}

// ============================================================================
// SECTION: Escalation
// ============================================================================

/// The status and owner-team side effects of setting an escalation level
/// (spec.md §4.1 Escalate).
///
/// # Invariants
/// - Only levels 2 and 3 are valid escalation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationEffect {
    /// Status the case is forced into.
    pub status: CaseStatus,
    /// Owner team the case is forced into, if any.
    pub owner_team: Option<OwnerTeam>,
    /// Whether the break-glass contact is revealed to the supplier UI.
    pub reveal_break_glass: bool,
}

/// Computes the effect of escalating to `level` (2 or 3).
///
/// # Errors
///
/// Returns [`CoreError::Validation`] for any level other than 2 or 3.
pub fn escalation_effect(level: u8) -> Result<EscalationEffect, CoreError> {
    match level {
        2 => Ok(EscalationEffect {
            status: CaseStatus::WaitingInternal,
            owner_team: Some(OwnerTeam::AccountsPayable),
            reveal_break_glass: false,
        }),
        3 => Ok(EscalationEffect {
            status: CaseStatus::Blocked,
            owner_team: None,
            reveal_break_glass: true,
        }),
        other => Err(CoreError::validation(format!("escalation level must be 2 or 3, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::CaseStatus::{Blocked, Cancelled, Open, Rejected, Resolved, WaitingInternal, WaitingSupplier};
    use super::*;

    #[test]
    fn open_allows_four_next_states() {
        assert!(is_allowed_transition(Open, WaitingSupplier));
        assert!(is_allowed_transition(Open, WaitingInternal));
        assert!(is_allowed_transition(Open, Blocked));
        assert!(is_allowed_transition(Open, Cancelled));
        assert!(!is_allowed_transition(Open, Resolved));
    }

    #[test]
    fn resolved_is_terminal() {
        assert!(CaseStatus::Resolved.is_terminal());
        for to in [Open, WaitingSupplier, WaitingInternal, Rejected, Blocked, Cancelled] {
            assert!(!is_allowed_transition(Resolved, to));
        }
        assert!(validate_transition(Resolved, WaitingSupplier).is_err());
    }

    #[test]
    fn rejected_only_reopens_to_waiting_supplier() {
        assert!(is_allowed_transition(Rejected, WaitingSupplier));
        assert!(!is_allowed_transition(Rejected, WaitingInternal));
        assert!(!is_allowed_transition(Rejected, Resolved));
    }

    #[test]
    fn escalation_level_1_is_rejected() {
        assert!(escalation_effect(1).is_err());
    }

    #[test]
    fn escalation_level_3_blocks_and_reveals_break_glass() {
        let effect = escalation_effect(3).expect("valid level");
        assert_eq!(effect.status, Blocked);
        assert!(effect.reveal_break_glass);
    }

    #[test]
    fn default_sla_windows_match_spec() {
        assert_eq!(default_sla_window(CaseType::Onboarding), Duration::days(5));
        assert_eq!(default_sla_window(CaseType::Invoice), Duration::days(3));
        assert_eq!(default_sla_window(CaseType::Payment), Duration::days(2));
        assert_eq!(default_sla_window(CaseType::Soa), Duration::days(7));
        assert_eq!(default_sla_window(CaseType::General), Duration::days(5));
    }
}
