// crates/vmp-core/src/soa.rs
// ============================================================================
// Module: VMP SOA Matching Engine
// Description: Flexible CSV column resolution and the deterministic 3-pass
//              matcher (spec.md §4.6).
// Dependencies: crate::model, crate::error, bigdecimal, time
// ============================================================================

//! ## Overview
//! Two independent pieces of pure logic: resolving a CSV header row into
//! document-number/date/amount/currency/type columns case- and
//! whitespace-insensitively, and running the three-pass matcher against a
//! candidate invoice set already scoped to the correct vendor and company.
//! Byte-level CSV parsing is performed by `vmp-http` using the `csv` crate;
//! this module only resolves column *names*.

// ============================================================================
// SECTION: Imports
// ============================================================================

use bigdecimal::BigDecimal;

use crate::error::CoreError;
use crate::ids::InvoiceId;
use crate::ids::SoaLineId;
use crate::model::invoice::Invoice;
use crate::model::soa::IssueStatus;
use crate::model::soa::LineStatus;
use crate::model::soa::MatchPass;
use crate::model::soa::SoaLine;
use crate::time::Timestamp;

// ============================================================================
// SECTION: CSV Column Resolution
// ============================================================================

/// A CSV column recognized by the SOA ingest parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Document number column.
    DocumentNumber,
    /// Document date column.
    Date,
    /// Amount column.
    Amount,
    /// Currency column.
    Currency,
    /// Document type column.
    DocumentType,
}

/// Normalizes a header cell: trims, collapses internal whitespace, and
/// lowercases, so `"Invoice #"`, `"invoice#"`, and `" INVOICE # "` all
/// compare equal (spec.md §4.6, §6).
#[must_use]
pub fn normalize_header(header: &str) -> String {
    header.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Returns the [`ColumnKind`] a normalized header cell resolves to, if
/// any.
#[must_use]
pub fn resolve_column(header: &str) -> Option<ColumnKind> {
    let normalized = normalize_header(header);
    const DOCUMENT_NUMBER: &[&str] =
        &["invoice #", "invoice#", "invoice number", "doc no", "doc no.", "document number", "reference", "ref", "ref no"];
    const DATE: &[&str] = &["date", "doc date", "document date", "invoice date", "transaction date"];
    const AMOUNT: &[&str] = &["amount", "amt", "value", "total"];
    const CURRENCY: &[&str] = &["currency", "ccy", "curr"];
    const DOCUMENT_TYPE: &[&str] = &["type", "doc type", "document type"];

    if DOCUMENT_NUMBER.contains(&normalized.as_str()) {
        Some(ColumnKind::DocumentNumber)
    } else if DATE.contains(&normalized.as_str()) {
        Some(ColumnKind::Date)
    } else if AMOUNT.contains(&normalized.as_str()) {
        Some(ColumnKind::Amount)
    } else if CURRENCY.contains(&normalized.as_str()) {
        Some(ColumnKind::Currency)
    } else if DOCUMENT_TYPE.contains(&normalized.as_str()) {
        Some(ColumnKind::DocumentType)
    } else {
        None
    }
}

/// Column indices resolved from a header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedColumns {
    /// Index of the document-number column.
    pub document_number: Option<usize>,
    /// Index of the date column.
    pub date: Option<usize>,
    /// Index of the amount column.
    pub amount: Option<usize>,
    /// Index of the currency column, if present.
    pub currency: Option<usize>,
    /// Index of the document-type column, if present.
    pub document_type: Option<usize>,
}

/// Resolves a CSV header row into column indices.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] unless document number, date, and
/// amount all resolve (spec.md §6: "at minimum a document-number, date,
/// and amount column must be resolvable").
pub fn resolve_columns(header: &[String]) -> Result<ResolvedColumns, CoreError> {
    let mut resolved = ResolvedColumns::default();
    for (index, cell) in header.iter().enumerate() {
        match resolve_column(cell) {
            Some(ColumnKind::DocumentNumber) => resolved.document_number = Some(index),
            Some(ColumnKind::Date) => resolved.date = Some(index),
            Some(ColumnKind::Amount) => resolved.amount = Some(index),
            Some(ColumnKind::Currency) => resolved.currency = Some(index),
            Some(ColumnKind::DocumentType) => resolved.document_type = Some(index),
            None => {}
        }
    }
    if resolved.document_number.is_none() || resolved.date.is_none() || resolved.amount.is_none() {
        return Err(CoreError::validation(
            "CSV header must resolve a document number, date, and amount column",
        ));
    }
    Ok(resolved)
}

// ============================================================================
// SECTION: Document Number Normalization
// ============================================================================

/// Strips whitespace, hyphens, and punctuation and case-folds a document
/// number, used by Pass C (spec.md §4.6).
#[must_use]
pub fn normalize_document_number(value: &str) -> String {
    value.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase()
}

// ============================================================================
// SECTION: Matching Protocol
// ============================================================================

/// The pass-B date tolerance: 7 days (spec.md §4.6; configurable per
/// SPEC_FULL.md §3.3, this is the compiled-in default).
pub const DEFAULT_DATE_TOLERANCE_DAYS: i64 = 7;

/// The outcome of successfully matching a SOA line to an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// The matched invoice.
    pub invoice_id: InvoiceId,
    /// Which pass produced the match.
    pub pass: MatchPass,
    /// Whether the match was exact (no amount or date delta).
    pub is_exact: bool,
    /// `line.amount - invoice.amount` (always zero; amount tolerance is 0
    /// in every pass per spec.md §4.6).
    pub amount_delta: BigDecimal,
    /// `line.document_date - invoice.invoice_date`, in whole days.
    pub days_delta: i64,
}

/// Finds the first invoice matching `line` under the given tolerance and
/// normalization policy. Amount must match exactly in every pass; only the
/// date tolerance and document-number normalization vary between passes.
fn find_candidate<'a>(
    line: &SoaLine,
    invoices: &'a [Invoice],
    date_tolerance_days: i64,
    normalize_numbers: bool,
) -> Option<(&'a Invoice, i64)> {
    let line_number = if normalize_numbers {
        normalize_document_number(&line.document_number)
    } else {
        line.document_number.clone()
    };
    invoices.iter().find_map(|invoice| {
        let invoice_number = if normalize_numbers {
            normalize_document_number(&invoice.invoice_number)
        } else {
            invoice.invoice_number.clone()
        };
        if invoice_number != line_number {
            return None;
        }
        if invoice.currency != line.currency {
            return None;
        }
        if invoice.amount != line.amount {
            return None;
        }
        let days_delta = line.document_date.since(invoice.invoice_date).whole_days();
        if days_delta.abs() > date_tolerance_days {
            return None;
        }
        Some((invoice, days_delta))
    })
}

/// Runs the deterministic three-pass matcher for a single line against a
/// candidate invoice set already scoped to the line's vendor and company.
///
/// A line stops at the first pass that produces a match (spec.md §4.6).
#[must_use]
pub fn match_line(line: &SoaLine, invoices: &[Invoice]) -> Option<MatchOutcome> {
    let attempts: &[(MatchPass, i64, bool)] = &[
        (MatchPass::A, 0, false),
        (MatchPass::B, DEFAULT_DATE_TOLERANCE_DAYS, false),
        (MatchPass::C, 0, true),
        (MatchPass::C, DEFAULT_DATE_TOLERANCE_DAYS, true),
    ];
    for (pass, tolerance, normalize) in attempts.iter().copied() {
        if let Some((invoice, days_delta)) = find_candidate(line, invoices, tolerance, normalize) {
            return Some(MatchOutcome {
                invoice_id: invoice.id,
                pass,
                is_exact: days_delta == 0,
                amount_delta: BigDecimal::from(0),
                days_delta,
            });
        }
    }
    None
}

// ============================================================================
// SECTION: Issue Resolution
// ============================================================================

/// Returns the line status that should follow resolving one of its
/// blocking issues (spec.md §4.6 "`resolve_issue(issue, note)`: closes an
/// issue"; §8 "sign-off refused until the INV-C issue is resolved").
///
/// A line only clears to [`LineStatus::Resolved`] once none of its other
/// issues remain open and it was sitting in [`LineStatus::Discrepancy`];
/// a line already `matched`, `extracted`, or `ignored` is left as-is, and
/// a line with another still-open issue stays `discrepancy`.
#[must_use]
pub fn line_status_after_issue_resolved(current: LineStatus, other_issues_open: bool) -> LineStatus {
    if other_issues_open || current != LineStatus::Discrepancy {
        current
    } else {
        LineStatus::Resolved
    }
}

// ============================================================================
// SECTION: Sign-off Gate
// ============================================================================

/// A line's current sign-off eligibility status, paired with its id for
/// error reporting.
#[derive(Debug, Clone, Copy)]
pub struct LineGateInput {
    /// The line's identifier.
    pub line_id: SoaLineId,
    /// The line's current status.
    pub status: LineStatus,
}

/// Validates the sign-off gate: every line must be `matched`, `resolved`,
/// or `ignored`, and every issue must be `resolved` (spec.md §4.6, §8).
///
/// # Errors
///
/// Returns [`CoreError::Conflict`] citing the first offending line if any
/// line is still `extracted` or `discrepancy`, or if any issue remains
/// `open`.
pub fn validate_signoff(lines: &[LineGateInput], issue_statuses: &[IssueStatus]) -> Result<(), CoreError> {
    if let Some(offending) = lines.iter().find(|line| {
        !matches!(line.status, LineStatus::Matched | LineStatus::Resolved | LineStatus::Ignored)
    }) {
        return Err(CoreError::conflict(format!(
            "line {} is {:?}; sign-off requires matched, resolved, or ignored",
            offending.line_id, offending.status
        )));
    }
    if issue_statuses.iter().any(|status| *status == IssueStatus::Open) {
        return Err(CoreError::conflict("sign-off requires every issue to be resolved"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::CompanyId;
    use crate::ids::TenantId;
    use crate::ids::VendorId;
    use crate::model::invoice::InvoiceSource;
    use crate::model::invoice::InvoiceStatus;
    use crate::model::soa::DocumentType;
    use time::Duration;

    fn invoice(number: &str, date: Timestamp, amount: i64) -> Invoice {
        Invoice {
            id: InvoiceId::generate(),
            tenant_id: TenantId::generate(),
            company_id: CompanyId::generate(),
            vendor_id: VendorId::generate(),
            invoice_number: number.to_string(),
            invoice_date: date,
            amount: BigDecimal::from(amount),
            currency: "USD".to_string(),
            po_reference: None,
            grn_reference: None,
            status: InvoiceStatus::Pending,
            source: InvoiceSource::Manual,
        }
    }

    fn line(number: &str, date: Timestamp, amount: i64) -> SoaLine {
        SoaLine {
            id: SoaLineId::generate(),
            case_id: crate::ids::CaseId::generate(),
            document_number: number.to_string(),
            document_date: date,
            amount: BigDecimal::from(amount),
            currency: "USD".to_string(),
            document_type: DocumentType::Inv,
            status: LineStatus::Extracted,
        }
    }

    #[test]
    fn header_synonyms_resolve_case_and_whitespace_insensitively() {
        let header = vec!["Invoice #".to_string(), "Date".to_string(), "Amount".to_string()];
        let resolved = resolve_columns(&header).expect("resolvable");
        assert_eq!(resolved.document_number, Some(0));
        assert_eq!(resolved.date, Some(1));
        assert_eq!(resolved.amount, Some(2));
    }

    #[test]
    fn missing_required_column_is_rejected() {
        let header = vec!["Currency".to_string()];
        assert!(resolve_columns(&header).is_err());
    }

    #[test]
    fn pass_a_exact_match() {
        let date = Timestamp::now();
        let inv = invoice("INV-A", date, 100);
        let ln = line("INV-A", date, 100);
        let outcome = match_line(&ln, &[inv.clone()]).expect("pass A match");
        assert_eq!(outcome.pass, MatchPass::A);
        assert!(outcome.is_exact);
        assert_eq!(outcome.invoice_id, inv.id);
    }

    #[test]
    fn pass_b_date_tolerance_scenario_5() {
        let invoice_date = Timestamp::now();
        let line_date = invoice_date.plus(Duration::days(7));
        let inv = invoice("INV-B", invoice_date, 50);
        let ln = line("INV-B", line_date, 50);
        let outcome = match_line(&ln, &[inv]).expect("pass B match");
        assert_eq!(outcome.pass, MatchPass::B);
        assert!(!outcome.is_exact);
        assert_eq!(outcome.days_delta, 7);
    }

    #[test]
    fn pass_b_rejects_beyond_tolerance() {
        let invoice_date = Timestamp::now();
        let line_date = invoice_date.plus(Duration::days(8));
        let inv = invoice("INV-D", invoice_date, 10);
        let ln = line("INV-D", line_date, 10);
        assert!(match_line(&ln, &[inv]).is_none());
    }

    #[test]
    fn pass_c_normalizes_document_number() {
        let date = Timestamp::now();
        let inv = invoice("INV A", date, 10);
        let ln = line("inv-a", date, 10);
        let outcome = match_line(&ln, &[inv]).expect("pass C match");
        assert_eq!(outcome.pass, MatchPass::C);
    }

    #[test]
    fn unmatched_line_scenario_5() {
        let date = Timestamp::now();
        let ln = line("INV-C", date, 75);
        assert!(match_line(&ln, &[]).is_none());
    }

    #[test]
    fn signoff_blocked_by_extracted_line() {
        let lines = [LineGateInput { line_id: SoaLineId::generate(), status: LineStatus::Extracted }];
        assert!(validate_signoff(&lines, &[]).is_err());
    }

    #[test]
    fn signoff_blocked_by_open_issue() {
        let lines = [LineGateInput { line_id: SoaLineId::generate(), status: LineStatus::Matched }];
        assert!(validate_signoff(&lines, &[IssueStatus::Open]).is_err());
    }

    #[test]
    fn signoff_allowed_when_clean() {
        let lines = [
            LineGateInput { line_id: SoaLineId::generate(), status: LineStatus::Matched },
            LineGateInput { line_id: SoaLineId::generate(), status: LineStatus::Resolved },
            LineGateInput { line_id: SoaLineId::generate(), status: LineStatus::Ignored },
        ];
        assert!(validate_signoff(&lines, &[IssueStatus::Resolved]).is_ok());
    }

    #[test]
    fn resolving_the_last_open_issue_clears_a_discrepancy_line() {
        assert_eq!(line_status_after_issue_resolved(LineStatus::Discrepancy, false), LineStatus::Resolved);
    }

    #[test]
    fn resolving_one_of_two_open_issues_leaves_the_line_blocked() {
        assert_eq!(line_status_after_issue_resolved(LineStatus::Discrepancy, true), LineStatus::Discrepancy);
    }

    #[test]
    fn resolving_an_issue_on_an_already_matched_line_is_a_no_op() {
        assert_eq!(line_status_after_issue_resolved(LineStatus::Matched, false), LineStatus::Matched);
    }

    #[test]
    fn unmatched_line_round_trips_through_dispute_and_resolve_to_signoff() {
        // spec.md §8 scenario 5: an unmatched line blocks sign-off until its
        // issue is resolved, after which sign-off succeeds.
        let line_id = SoaLineId::generate();
        let mut line_status = LineStatus::Discrepancy;
        let gate_before = [LineGateInput { line_id, status: line_status }];
        assert!(validate_signoff(&gate_before, &[IssueStatus::Open]).is_err());

        line_status = line_status_after_issue_resolved(line_status, false);
        assert_eq!(line_status, LineStatus::Resolved);
        let gate_after = [LineGateInput { line_id, status: line_status }];
        assert!(validate_signoff(&gate_after, &[IssueStatus::Resolved]).is_ok());
    }
}
