// crates/vmp-core/src/checklist.rs
// ============================================================================
// Module: VMP Checklist Engine
// Description: Table-driven required-evidence rule set, step transitions,
//              and case-status recommendation (spec.md §4.3).
// Dependencies: crate::model, crate::error
// ============================================================================

//! ## Overview
//! The Checklist Engine is a single table-driven rule function plus a small
//! step-transition state machine. All case-type-specific branching for
//! required evidence lives in [`required_steps`]; nothing downstream
//! re-derives it.
//!
//! Contract-type cases have no rule defined in spec.md §4.3 (the rule list
//! enumerates invoice, payment, soa, onboarding, and general only); this
//! implementation materializes zero required steps for `CaseType::Contract`
//! rather than inventing one, matching "the rule set is authoritative and
//! defined in this specification."

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::error::CoreError;
use crate::model::case::CaseStatus;
use crate::model::case::CaseType;
use crate::model::checklist::EvidenceType;
use crate::model::checklist::StepStatus;
use crate::model::tenant::VendorType;

// ============================================================================
// SECTION: Rule Table
// ============================================================================

/// ISO 3166-1 alpha-2 codes treated as the EU set for VAT-certificate
/// requirements (spec.md §4.3).
pub const EU_COUNTRIES: &[&str] = &[
    "AT", "BE", "BG", "CY", "CZ", "DE", "DK", "EE", "ES", "FI", "FR", "GR", "HR", "HU", "IE",
    "IT", "LT", "LU", "LV", "MT", "NL", "PL", "PT", "RO", "SE", "SI", "SK", "GB",
];

/// One required checklist step, prior to persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredStep {
    /// Evidence type required.
    pub evidence_type: EvidenceType,
    /// Human-readable label.
    pub label: &'static str,
}

impl RequiredStep {
    const fn new(evidence_type: EvidenceType, label: &'static str) -> Self {
        Self { evidence_type, label }
    }
}

/// Inputs that condition the onboarding rule set.
#[derive(Debug, Clone, Copy)]
pub struct OnboardingInputs {
    /// Vendor's classification.
    pub vendor_type: VendorType,
    /// Vendor's ISO 3166-1 alpha-2 country code.
    pub country_code: &'static str,
}

/// Inputs that condition the payment rule set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentInputs {
    /// True when `metadata["bank_details_change"] == true` (spec.md §4.3
    /// bank-change sub-flow).
    pub bank_details_change: bool,
}

/// Computes the required checklist steps for a case (spec.md §4.3).
///
/// Materialization of this set is idempotent by construction: calling it
/// twice with the same inputs returns the same steps in the same order.
#[must_use]
pub fn required_steps(
    case_type: CaseType,
    onboarding: Option<OnboardingInputs>,
    payment: PaymentInputs,
) -> Vec<RequiredStep> {
    match case_type {
        CaseType::Invoice => vec![
            RequiredStep::new(EvidenceType::InvoicePdf, "Invoice PDF"),
            RequiredStep::new(EvidenceType::PoNumber, "Purchase order number"),
            RequiredStep::new(EvidenceType::Grn, "Goods received note"),
        ],
        CaseType::Payment => {
            let mut steps = vec![
                RequiredStep::new(EvidenceType::Remittance, "Remittance advice"),
                RequiredStep::new(EvidenceType::BankStatement, "Bank statement"),
            ];
            if payment.bank_details_change {
                steps.push(RequiredStep::new(EvidenceType::BankLetter, "Bank confirmation letter"));
            }
            steps
        }
        CaseType::Soa => vec![
            RequiredStep::new(EvidenceType::SoaDocument, "Statement of account"),
            RequiredStep::new(EvidenceType::Reconciliation, "Reconciliation working file"),
        ],
        CaseType::Onboarding => onboarding_steps(onboarding),
        CaseType::General => vec![RequiredStep::new(
            EvidenceType::SupportingDocumentation,
            "Supporting documentation",
        )],
        CaseType::Contract => Vec::new(),
    }
}

/// Onboarding rule set (spec.md §4.3).
fn onboarding_steps(inputs: Option<OnboardingInputs>) -> Vec<RequiredStep> {
    let Some(inputs) = inputs else {
        return vec![
            RequiredStep::new(EvidenceType::BankLetter, "Bank confirmation letter"),
            RequiredStep::new(EvidenceType::TaxId, "Tax identification document"),
        ];
    };

    let mut steps = vec![
        RequiredStep::new(EvidenceType::BankLetter, "Bank confirmation letter"),
        RequiredStep::new(EvidenceType::TaxId, "Tax identification document"),
    ];

    if inputs.vendor_type != VendorType::Individual {
        steps.push(RequiredStep::new(EvidenceType::CompanyRegistration, "Company registration"));
    }
    if inputs.country_code.eq_ignore_ascii_case("US") {
        steps.push(RequiredStep::new(EvidenceType::EinCertificate, "EIN certificate"));
        steps.push(RequiredStep::new(EvidenceType::W9Form, "IRS Form W-9"));
    }
    if EU_COUNTRIES.iter().any(|code| inputs.country_code.eq_ignore_ascii_case(code)) {
        steps.push(RequiredStep::new(EvidenceType::VatCertificate, "VAT certificate"));
    }
    if inputs.country_code.eq_ignore_ascii_case("MY") {
        steps.push(RequiredStep::new(EvidenceType::TaxCertificate, "GST/tax registration certificate"));
    }
    if inputs.vendor_type == VendorType::International {
        steps.push(RequiredStep::new(EvidenceType::TradeLicense, "Trade license"));
        steps.push(RequiredStep::new(EvidenceType::ImportExportPermit, "Import/export permit"));
    }
    steps
}

// ============================================================================
// SECTION: Step Transitions
// ============================================================================

/// Applies an evidence upload to a step's current status.
///
/// Waived steps are sticky: an upload against a waived step leaves it
/// waived (spec.md §4.3).
#[must_use]
pub const fn on_evidence_uploaded(current: StepStatus) -> StepStatus {
    match current {
        StepStatus::Waived => StepStatus::Waived,
        StepStatus::Pending | StepStatus::Submitted | StepStatus::Verified | StepStatus::Rejected => {
            StepStatus::Submitted
        }
    }
}

/// Applies an internal verify verdict to a step.
///
/// # Errors
///
/// Returns [`CoreError::Conflict`] if the step is currently waived.
pub fn on_verify(current: StepStatus) -> Result<StepStatus, CoreError> {
    match current {
        StepStatus::Waived => Err(CoreError::conflict("cannot verify a waived checklist step")),
        _ => Ok(StepStatus::Verified),
    }
}

/// Applies an internal reject verdict to a step.
///
/// # Errors
///
/// Returns [`CoreError::Conflict`] if the step is currently waived.
pub fn on_reject(current: StepStatus) -> Result<StepStatus, CoreError> {
    match current {
        StepStatus::Waived => Err(CoreError::conflict("cannot reject a waived checklist step")),
        _ => Ok(StepStatus::Rejected),
    }
}

/// Marks a step as waived; sticky thereafter.
#[must_use]
pub const fn on_waive() -> StepStatus {
    StepStatus::Waived
}

// ============================================================================
// SECTION: Case Status Recommendation
// ============================================================================

/// Recommends a case status from the current set of step statuses
/// (spec.md §4.3 status reconciliation). Returns `None` when the status
/// should be left unchanged.
#[must_use]
pub fn recommended_case_status(step_statuses: &[StepStatus]) -> Option<CaseStatus> {
    let non_waived = || step_statuses.iter().filter(|s| **s != StepStatus::Waived);

    if non_waived().all(|s| *s == StepStatus::Verified) && non_waived().count() > 0 {
        return Some(CaseStatus::Resolved);
    }
    if step_statuses.iter().any(|s| *s == StepStatus::Rejected) {
        return Some(CaseStatus::WaitingSupplier);
    }
    if step_statuses.iter().any(|s| *s == StepStatus::Submitted) {
        return Some(CaseStatus::WaitingInternal);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onboarding_us_individual_has_no_company_registration() {
        let steps = required_steps(
            CaseType::Onboarding,
            Some(OnboardingInputs { vendor_type: VendorType::Individual, country_code: "US" }),
            PaymentInputs::default(),
        );
        let types: Vec<_> = steps.iter().map(|s| s.evidence_type).collect();
        assert!(types.contains(&EvidenceType::BankLetter));
        assert!(types.contains(&EvidenceType::TaxId));
        assert!(types.contains(&EvidenceType::EinCertificate));
        assert!(types.contains(&EvidenceType::W9Form));
        assert!(!types.contains(&EvidenceType::CompanyRegistration));
    }

    #[test]
    fn onboarding_my_corporate_matches_scenario_3() {
        let steps = required_steps(
            CaseType::Onboarding,
            Some(OnboardingInputs { vendor_type: VendorType::Corporate, country_code: "MY" }),
            PaymentInputs::default(),
        );
        let types: Vec<_> = steps.iter().map(|s| s.evidence_type).collect();
        assert!(types.contains(&EvidenceType::CompanyRegistration));
        assert!(types.contains(&EvidenceType::BankLetter));
        assert!(types.contains(&EvidenceType::TaxId));
        assert!(types.contains(&EvidenceType::TaxCertificate));
        assert!(!types.contains(&EvidenceType::VatCertificate));
        assert!(!types.contains(&EvidenceType::EinCertificate));
        assert!(!types.contains(&EvidenceType::W9Form));
    }

    #[test]
    fn materialization_is_idempotent() {
        let first = required_steps(CaseType::Invoice, None, PaymentInputs::default());
        let second = required_steps(CaseType::Invoice, None, PaymentInputs::default());
        assert_eq!(first, second);
    }

    #[test]
    fn bank_details_change_forces_bank_letter() {
        let steps = required_steps(CaseType::Payment, None, PaymentInputs { bank_details_change: true });
        assert!(steps.iter().any(|s| s.evidence_type == EvidenceType::BankLetter));
    }

    #[test]
    fn contract_case_type_has_no_rule() {
        assert!(required_steps(CaseType::Contract, None, PaymentInputs::default()).is_empty());
    }

    #[test]
    fn all_verified_recommends_resolved() {
        let statuses = [StepStatus::Verified, StepStatus::Verified, StepStatus::Waived];
        assert_eq!(recommended_case_status(&statuses), Some(CaseStatus::Resolved));
    }

    #[test]
    fn any_rejected_recommends_waiting_supplier() {
        let statuses = [StepStatus::Verified, StepStatus::Rejected];
        assert_eq!(recommended_case_status(&statuses), Some(CaseStatus::WaitingSupplier));
    }

    #[test]
    fn any_submitted_recommends_waiting_internal() {
        let statuses = [StepStatus::Pending, StepStatus::Submitted];
        assert_eq!(recommended_case_status(&statuses), Some(CaseStatus::WaitingInternal));
    }

    #[test]
    fn all_pending_leaves_status_unchanged() {
        let statuses = [StepStatus::Pending, StepStatus::Pending];
        assert_eq!(recommended_case_status(&statuses), None);
    }

    #[test]
    fn waived_step_is_sticky() {
        assert_eq!(on_evidence_uploaded(StepStatus::Waived), StepStatus::Waived);
        assert!(on_verify(StepStatus::Waived).is_err());
        assert!(on_reject(StepStatus::Waived).is_err());
    }
}
