// crates/vmp-core/src/model/case.rs
// ============================================================================
// Module: VMP Case
// Description: The central collaboration entity (spec.md §3, §4.1).
// Purpose: Data shapes for case type, status, owner team, escalation, and
//          the case row itself. Status-machine enforcement lives in
//          `crate::case`.
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ids::CaseId;
use crate::ids::CompanyId;
use crate::ids::InvoiceId;
use crate::ids::TenantId;
use crate::ids::UserId;
use crate::ids::VendorId;
use crate::time::Timestamp;

/// Case type; drives default owner team, SLA window, and checklist rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseType {
    /// Vendor onboarding.
    Onboarding,
    /// Invoice exception.
    Invoice,
    /// Payment query or bank-details change.
    Payment,
    /// Statement-of-account reconciliation.
    Soa,
    /// Contract matter.
    Contract,
    /// Anything else.
    General,
}

/// Case lifecycle state (spec.md §4.1 status machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Freshly created, awaiting first action.
    Open,
    /// Waiting on the supplier.
    WaitingSupplier,
    /// Waiting on internal staff.
    WaitingInternal,
    /// Terminal: resolved successfully.
    Resolved,
    /// Terminal: rejected.
    Rejected,
    /// Blocked, typically by a level-3 escalation.
    Blocked,
    /// Terminal: cancelled.
    Cancelled,
}

impl CaseStatus {
    /// Returns whether this status has no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled)
    }
}

/// Internal team that owns a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerTeam {
    /// Procurement.
    Procurement,
    /// Accounts payable.
    AccountsPayable,
    /// Finance.
    Finance,
    /// No owning team assigned.
    None,
}

impl OwnerTeam {
    /// Returns the default owner team for a case type (spec.md §4.1).
    #[must_use]
    pub const fn default_for(case_type: CaseType) -> Self {
        match case_type {
            CaseType::Onboarding => Self::Procurement,
            CaseType::Invoice | CaseType::Payment | CaseType::Soa => Self::AccountsPayable,
            CaseType::Contract | CaseType::General => Self::None,
        }
    }
}

/// Discrete SLA state of a case (glossary "Posture").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaPosture {
    /// Ample time remains before the due timestamp.
    OnTrack,
    /// Due within 48 hours.
    Approaching,
    /// Due within 24 hours.
    DueToday,
    /// Past the due timestamp.
    Overdue,
}

/// The central case record.
///
/// # Invariants
/// - `vendor_id` belongs to `tenant_id`; `company_id` belongs to
///   `tenant_id`; the vendor is linked to the company (checked on create).
/// - Status transitions are restricted; see `crate::case`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    /// Identifier.
    pub id: CaseId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Company the case concerns.
    pub company_id: CompanyId,
    /// Vendor the case concerns.
    pub vendor_id: VendorId,
    /// Case type.
    pub case_type: CaseType,
    /// Free-text subject line.
    pub subject: String,
    /// Current lifecycle status.
    pub status: CaseStatus,
    /// Owning internal team.
    pub owner_team: OwnerTeam,
    /// Assigned internal user, if any.
    pub assigned_user_id: Option<UserId>,
    /// SLA due timestamp, set on create and unchanged unless explicitly
    /// extended by an internal action.
    pub sla_due_at: Option<Timestamp>,
    /// Last SLA posture recorded by the ticker (§4.7); used to detect
    /// posture transitions.
    pub last_posture: Option<SlaPosture>,
    /// Escalation level, 0-3.
    pub escalation_level: u8,
    /// Free-form metadata (e.g. `bank_details_change` proposals).
    pub metadata: BTreeMap<String, Value>,
    /// Linked shadow-ledger invoice, if any.
    pub linked_invoice_id: Option<InvoiceId>,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last-update timestamp.
    pub updated_at: Timestamp,
}

impl Case {
    /// Derives the current SLA posture relative to `now`.
    #[must_use]
    pub fn posture(&self, now: Timestamp) -> SlaPosture {
        let Some(due) = self.sla_due_at else {
            return SlaPosture::OnTrack;
        };
        if now > due {
            return SlaPosture::Overdue;
        }
        let remaining = due.since(now);
        if remaining <= time::Duration::hours(24) {
            SlaPosture::DueToday
        } else if remaining <= time::Duration::hours(48) {
            SlaPosture::Approaching
        } else {
            SlaPosture::OnTrack
        }
    }
}
