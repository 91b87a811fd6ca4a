// crates/vmp-core/src/model/checklist.rs
// ============================================================================
// Module: VMP Checklist Step
// Description: Required evidence slot on a case (spec.md §3, §4.3).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::ids::CaseId;
use crate::ids::ChecklistStepId;

/// Symbolic evidence type, shared by checklist steps and evidence rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    /// Invoice PDF.
    InvoicePdf,
    /// Purchase order number reference.
    PoNumber,
    /// Goods-received note.
    Grn,
    /// A letter confirming bank details.
    BankLetter,
    /// Tax identification document.
    TaxId,
    /// VAT registration certificate.
    VatCertificate,
    /// US EIN certificate.
    EinCertificate,
    /// US IRS Form W-9.
    W9Form,
    /// Trade license.
    TradeLicense,
    /// Import/export permit.
    ImportExportPermit,
    /// Remittance advice.
    Remittance,
    /// Bank statement.
    BankStatement,
    /// Company registration certificate.
    CompanyRegistration,
    /// A statement-of-account document.
    SoaDocument,
    /// Reconciliation working file.
    Reconciliation,
    /// GST/tax registration certificate (e.g. Malaysia).
    TaxCertificate,
    /// A free-form general supporting document.
    SupportingDocumentation,
}

/// Lifecycle status of a checklist step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// No qualifying evidence yet.
    Pending,
    /// Evidence uploaded, awaiting a verdict.
    Submitted,
    /// Internally verified.
    Verified,
    /// Internally rejected.
    Rejected,
    /// Explicitly waived by an internal actor; sticky.
    Waived,
}

/// A required evidence slot on a case.
///
/// # Invariants
/// - `(case_id, required_type)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistStep {
    /// Identifier.
    pub id: ChecklistStepId,
    /// Owning case.
    pub case_id: CaseId,
    /// Human-readable label.
    pub label: String,
    /// Required evidence type.
    pub required_type: EvidenceType,
    /// Current status.
    pub status: StepStatus,
    /// Rejection reason, present only while `status == Rejected`.
    pub rejection_reason: Option<String>,
}
