// crates/vmp-core/src/model/soa.rs
// ============================================================================
// Module: VMP SOA Lines, Matches, and Issues
// Description: Statement-of-account reconciliation records (spec.md §3, §4.6).
// ============================================================================

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde::Serialize;

use crate::ids::CaseId;
use crate::ids::InvoiceId;
use crate::ids::SoaIssueId;
use crate::ids::SoaLineId;
use crate::ids::SoaMatchId;
use crate::ids::UserId;
use crate::time::Timestamp;

/// Document type as recorded on a vendor statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    /// Invoice.
    Inv,
    /// Credit note.
    Cn,
    /// Debit note.
    Dn,
    /// Payment.
    Pay,
    /// Withholding tax entry.
    Wht,
    /// Adjustment.
    Adj,
    /// Anything not covered by the above.
    Other,
}

/// Lifecycle status of a SOA line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    /// Parsed from the statement, not yet matched.
    Extracted,
    /// Matched to a shadow-ledger invoice.
    Matched,
    /// Matched or unmatched with an open discrepancy.
    Discrepancy,
    /// Discrepancy resolved.
    Resolved,
    /// Explicitly excluded from the sign-off gate.
    Ignored,
}

/// One line parsed out of a vendor statement of account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoaLine {
    /// Identifier.
    pub id: SoaLineId,
    /// Owning SOA case.
    pub case_id: CaseId,
    /// Document number as printed on the statement.
    pub document_number: String,
    /// Document date.
    pub document_date: Timestamp,
    /// Document amount.
    pub amount: BigDecimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Document type.
    pub document_type: DocumentType,
    /// Lifecycle status.
    pub status: LineStatus,
}

/// Which matching pass produced a SOA match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPass {
    /// Pass A: exact match.
    A,
    /// Pass B: date-tolerance match.
    B,
    /// Pass C: normalized-document-number match.
    C,
    /// A manually recorded match.
    Manual,
}

/// A link between a SOA line and a shadow-ledger invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoaMatch {
    /// Identifier.
    pub id: SoaMatchId,
    /// Matched line.
    pub line_id: SoaLineId,
    /// Matched invoice.
    pub invoice_id: InvoiceId,
    /// Which pass produced this match.
    pub pass: MatchPass,
    /// True when amount and date both matched exactly.
    pub is_exact: bool,
    /// `line.amount - invoice.amount`.
    pub amount_delta: BigDecimal,
    /// `line.document_date - invoice.invoice_date`, in whole days.
    pub days_delta: i64,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

/// Kind of discrepancy raised against a SOA line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// No invoice could be matched.
    Unmatched,
    /// Matched, but the amount differs.
    AmountVariance,
    /// Matched, but the date differs.
    DateVariance,
    /// The same document appears more than once.
    Duplicate,
    /// An expected invoice is missing from the shadow ledger.
    MissingInvoice,
    /// Any other discrepancy.
    Other,
}

/// Status of a SOA issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Awaiting resolution.
    Open,
    /// Resolved.
    Resolved,
}

/// A discrepancy raised against a SOA line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoaIssue {
    /// Identifier.
    pub id: SoaIssueId,
    /// The line this issue concerns.
    pub line_id: SoaLineId,
    /// Discrepancy type.
    pub issue_type: IssueType,
    /// Free-text description.
    pub description: String,
    /// Current status.
    pub status: IssueStatus,
    /// Resolving user, present only once resolved.
    pub resolver_user_id: Option<UserId>,
    /// Resolution timestamp, present only once resolved.
    pub resolved_at: Option<Timestamp>,
}
