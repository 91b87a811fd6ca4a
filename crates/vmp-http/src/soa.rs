// crates/vmp-http/src/soa.rs
// ============================================================================
// Module: SOA Reconciliation Routes
// Description: Statement ingest, recompute, and sign-off (spec.md §4.6, §6).
// Dependencies: axum (multipart), csv, bigdecimal, time, vmp-core
// ============================================================================

//! ## Overview
//! Ingest finds or opens the case for a vendor/company/period, resolves the
//! CSV header, parses each row, and skips document numbers already present
//! on the case so re-ingesting the same statement is a no-op (spec.md §8
//! idempotence). Every newly inserted line is matched immediately. Recompute
//! re-runs the matcher over lines still `extracted`, leaving already-matched
//! or manually-resolved lines untouched. Sign-off is internal-only and gated
//! by [`vmp_core::soa::validate_signoff`].

use std::collections::BTreeSet;

use axum::Json;
use axum::extract::Multipart;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde::Serialize;
use time::Date;
use time::Month;
use time::PrimitiveDateTime;
use time::Time;
use vmp_core::CoreError;
use vmp_core::auth::require_internal;
use vmp_core::auth::require_same_tenant;
use vmp_core::auth::require_vendor_scope;
use vmp_core::case::default_sla_window;
use vmp_core::case::validate_transition;
use vmp_core::checklist::required_steps;
use vmp_core::checklist::PaymentInputs;
use vmp_core::ids::CaseId;
use vmp_core::ids::ChecklistStepId;
use vmp_core::ids::CompanyId;
use vmp_core::ids::InvoiceId;
use vmp_core::ids::SoaIssueId;
use vmp_core::ids::SoaLineId;
use vmp_core::ids::SoaMatchId;
use vmp_core::ids::VendorId;
use vmp_core::model::case::Case;
use vmp_core::model::case::CaseStatus;
use vmp_core::model::case::CaseType;
use vmp_core::model::case::OwnerTeam;
use vmp_core::model::checklist::ChecklistStep;
use vmp_core::model::checklist::StepStatus;
use vmp_core::model::evidence::Evidence;
use vmp_core::model::soa::DocumentType;
use vmp_core::model::soa::IssueStatus;
use vmp_core::model::soa::IssueType;
use vmp_core::model::soa::LineStatus;
use vmp_core::model::soa::MatchPass;
use vmp_core::model::soa::SoaIssue;
use vmp_core::model::soa::SoaLine;
use vmp_core::model::soa::SoaMatch;
use vmp_core::soa::line_status_after_issue_resolved;
use vmp_core::soa::match_line;
use vmp_core::soa::resolve_columns;
use vmp_core::soa::LineGateInput;
use vmp_core::soa::ResolvedColumns;
use vmp_core::soa::validate_signoff;
use vmp_core::thread::system_message;
use vmp_core::time::Timestamp;

use crate::deadline::with_deadline;
use crate::error::ApiError;
use crate::session::ActorExtractor;
use crate::state::AppState;

fn db_deadline(state: &AppState) -> std::time::Duration {
    std::time::Duration::from_secs(state.config.server.db_deadline_secs)
}

// ============================================================================
// SECTION: Regional Date Parsing
// ============================================================================

/// Parses one statement date cell, trying ISO 8601, `DD-Mon-YYYY`, then
/// slash-separated forms (SPEC_FULL.md §4 CSV regional date formats).
///
/// Returns the parsed date together with whether the slash form was
/// ambiguous (neither component exceeds 12) and so was resolved by
/// assuming ISO order (month-before-day), the convention recorded as a
/// per-row warning rather than an error.
fn parse_date_cell(raw: &str) -> Result<(Date, bool), String> {
    let trimmed = raw.trim();
    if let Some(date) = parse_iso_date(trimmed) {
        return Ok((date, false));
    }
    if let Some(date) = parse_dmon_yyyy(trimmed) {
        return Ok((date, false));
    }
    if let Some(result) = parse_slash_date(trimmed) {
        return Ok(result);
    }
    Err(format!("unrecognized date '{trimmed}'"))
}

fn parse_iso_date(trimmed: &str) -> Option<Date> {
    const FORMAT: &[time::format_description::FormatItem<'_>] =
        time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(trimmed, FORMAT).ok()
}

fn parse_dmon_yyyy(trimmed: &str) -> Option<Date> {
    const FORMAT: &[time::format_description::FormatItem<'_>] =
        time::macros::format_description!("[day]-[month repr:short]-[year]");
    Date::parse(trimmed, FORMAT).ok()
}

/// `DD/MM/YYYY` or `MM/DD/YYYY`, disambiguated by whichever component
/// exceeds 12; falls back to ISO order (month-before-day) when both
/// components are plausible as either (SPEC_FULL.md §4).
fn parse_slash_date(trimmed: &str) -> Option<(Date, bool)> {
    let parts: Vec<&str> = trimmed.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let a: u8 = parts[0].trim().parse().ok()?;
    let b: u8 = parts[1].trim().parse().ok()?;
    let year: i32 = parts[2].trim().parse().ok()?;
    let (day, month, ambiguous) = if a > 12 {
        (a, b, false)
    } else if b > 12 {
        (b, a, false)
    } else {
        (b, a, true)
    };
    let month = Month::try_from(month).ok()?;
    let date = Date::from_calendar_date(year, month, day).ok()?;
    Some((date, ambiguous))
}

fn date_to_timestamp(date: Date) -> Timestamp {
    Timestamp::from_offset(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc())
}

fn parse_amount_cell(raw: &str) -> Result<BigDecimal, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("amount is empty".to_string());
    }
    let negative_parens = trimmed.starts_with('(') && trimmed.ends_with(')');
    let inner = if negative_parens { &trimmed[1..trimmed.len() - 1] } else { trimmed };
    let cleaned: String = inner.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-').collect();
    if cleaned.is_empty() {
        return Err(format!("amount '{raw}' has no numeric content"));
    }
    let mut value: BigDecimal =
        cleaned.parse().map_err(|_| format!("amount '{raw}' is not a valid number"))?;
    if negative_parens {
        value = -value;
    }
    Ok(value)
}

fn parse_document_type(raw: &str) -> DocumentType {
    match raw.trim().to_lowercase().as_str() {
        "inv" | "invoice" => DocumentType::Inv,
        "cn" | "credit note" | "credit" => DocumentType::Cn,
        "dn" | "debit note" | "debit" => DocumentType::Dn,
        "pay" | "payment" => DocumentType::Pay,
        "wht" | "withholding tax" | "withholding" => DocumentType::Wht,
        "adj" | "adjustment" => DocumentType::Adj,
        _ => DocumentType::Other,
    }
}

fn parse_soa_line(case_id: CaseId, record: &csv::StringRecord, resolved: &ResolvedColumns) -> Result<SoaLine, String> {
    let document_number = resolved
        .document_number
        .and_then(|index| record.get(index))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| "missing document number".to_string())?
        .to_string();
    let date_cell = resolved.date.and_then(|index| record.get(index)).ok_or_else(|| "missing date".to_string())?;
    let (date, _ambiguous) = parse_date_cell(date_cell)?;
    let amount_cell = resolved.amount.and_then(|index| record.get(index)).ok_or_else(|| "missing amount".to_string())?;
    let amount = parse_amount_cell(amount_cell)?;
    let currency = resolved
        .currency
        .and_then(|index| record.get(index))
        .map(|value| value.trim().to_uppercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "USD".to_string());
    let document_type =
        resolved.document_type.and_then(|index| record.get(index)).map(parse_document_type).unwrap_or(DocumentType::Inv);

    Ok(SoaLine {
        id: SoaLineId::generate(),
        case_id,
        document_number,
        document_date: date_to_timestamp(date),
        amount,
        currency,
        document_type,
        status: LineStatus::Extracted,
    })
}

// ============================================================================
// SECTION: Ingest
// ============================================================================

#[derive(Default)]
struct IngestFields {
    vendor_id: Option<VendorId>,
    company_id: Option<CompanyId>,
    period_start: Option<Timestamp>,
    period_end: Option<Timestamp>,
    csv_bytes: Option<Vec<u8>>,
}

async fn collect_ingest_fields(multipart: &mut Multipart) -> Result<IngestFields, ApiError> {
    let mut fields = IngestFields::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError(CoreError::validation(format!("malformed multipart body: {error}"))))?
    {
        match field.name().unwrap_or_default() {
            "vendor_id" => {
                let text = field.text().await.map_err(|error| ApiError(CoreError::validation(error.to_string())))?;
                fields.vendor_id =
                    Some(text.trim().parse().map_err(|_| ApiError(CoreError::validation("malformed vendor_id")))?);
            }
            "company_id" => {
                let text = field.text().await.map_err(|error| ApiError(CoreError::validation(error.to_string())))?;
                fields.company_id =
                    Some(text.trim().parse().map_err(|_| ApiError(CoreError::validation("malformed company_id")))?);
            }
            "period_start" => {
                let text = field.text().await.map_err(|error| ApiError(CoreError::validation(error.to_string())))?;
                let (date, _) = parse_date_cell(&text).map_err(|reason| ApiError(CoreError::validation(reason)))?;
                fields.period_start = Some(date_to_timestamp(date));
            }
            "period_end" => {
                let text = field.text().await.map_err(|error| ApiError(CoreError::validation(error.to_string())))?;
                let (date, _) = parse_date_cell(&text).map_err(|reason| ApiError(CoreError::validation(reason)))?;
                fields.period_end = Some(date_to_timestamp(date));
            }
            "file" => {
                let data = field.bytes().await.map_err(|error| ApiError(CoreError::validation(error.to_string())))?;
                fields.csv_bytes = Some(data.to_vec());
            }
            _ => {}
        }
    }
    Ok(fields)
}

/// One row that failed to parse during ingest; the rest of the file still
/// ingests (SPEC_FULL.md §4, spec.md §6).
#[derive(Debug, Serialize)]
pub struct IngestRowError {
    /// Zero-based row index within the data rows (header excluded).
    pub row: usize,
    /// Why the row was rejected.
    pub reason: String,
}

/// `POST /soa/ingest` response body.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// The SOA case the lines were ingested against.
    pub case_id: CaseId,
    /// Count of newly inserted lines.
    pub lines_ingested: usize,
    /// Count of rows skipped because their document number was already
    /// present on the case (spec.md §8 idempotence).
    pub lines_skipped_duplicate: usize,
    /// Per-row parse failures.
    pub errors: Vec<IngestRowError>,
}

async fn create_soa_case(
    state: &AppState,
    tenant_id: vmp_core::ids::TenantId,
    company_id: CompanyId,
    vendor_id: VendorId,
    period_start: Timestamp,
    period_end: Timestamp,
    now: Timestamp,
) -> Result<CaseId, ApiError> {
    let case = Case {
        id: CaseId::generate(),
        tenant_id,
        company_id,
        vendor_id,
        case_type: CaseType::Soa,
        subject: format!("Statement of account {} to {}", period_start.date_stamp(), period_end.date_stamp()),
        status: CaseStatus::Open,
        owner_team: OwnerTeam::default_for(CaseType::Soa),
        assigned_user_id: None,
        sla_due_at: Some(now.plus(default_sla_window(CaseType::Soa))),
        last_posture: None,
        escalation_level: 0,
        metadata: std::collections::BTreeMap::new(),
        linked_invoice_id: None,
        created_at: now,
        updated_at: now,
    };
    with_deadline(db_deadline(state), state.store.insert_case(case.clone())).await?;

    let steps: Vec<ChecklistStep> = required_steps(CaseType::Soa, None, PaymentInputs::default())
        .into_iter()
        .map(|required| ChecklistStep {
            id: ChecklistStepId::generate(),
            case_id: case.id,
            label: required.label.to_string(),
            required_type: required.evidence_type,
            status: StepStatus::Pending,
            rejection_reason: None,
        })
        .collect();
    if !steps.is_empty() {
        with_deadline(db_deadline(state), state.store.insert_missing_steps(steps)).await?;
    }

    let opened = system_message(case.id, "SOA case opened from statement ingest".to_string(), now);
    with_deadline(db_deadline(state), state.store.insert_message(opened)).await?;

    Ok(case.id)
}

/// Matches one line against the candidate invoice set, records the match
/// or the resulting issue, and persists the line's resulting status.
/// Shared by ingest and recompute so both apply identical matching rules.
async fn match_and_record_line(
    state: &AppState,
    line: &SoaLine,
    invoices: &[vmp_core::model::invoice::Invoice],
) -> Result<(), ApiError> {
    let mut updated = line.clone();
    match match_line(line, invoices) {
        Some(outcome) => {
            let soa_match = SoaMatch {
                id: SoaMatchId::generate(),
                line_id: line.id,
                invoice_id: outcome.invoice_id,
                pass: outcome.pass,
                is_exact: outcome.is_exact,
                amount_delta: outcome.amount_delta,
                days_delta: outcome.days_delta,
                created_at: Timestamp::now(),
            };
            with_deadline(db_deadline(state), state.store.insert_match(soa_match)).await?;
            if outcome.is_exact {
                updated.status = LineStatus::Matched;
            } else {
                updated.status = LineStatus::Discrepancy;
                let issue = SoaIssue {
                    id: SoaIssueId::generate(),
                    line_id: line.id,
                    issue_type: IssueType::DateVariance,
                    description: format!("matched with a {}-day date difference", outcome.days_delta.abs()),
                    status: IssueStatus::Open,
                    resolver_user_id: None,
                    resolved_at: None,
                };
                with_deadline(db_deadline(state), state.store.insert_issue(issue)).await?;
            }
        }
        None => {
            updated.status = LineStatus::Discrepancy;
            let issue = SoaIssue {
                id: SoaIssueId::generate(),
                line_id: line.id,
                issue_type: IssueType::Unmatched,
                description: "no shadow-ledger invoice matched this line".to_string(),
                status: IssueStatus::Open,
                resolver_user_id: None,
                resolved_at: None,
            };
            with_deadline(db_deadline(state), state.store.insert_issue(issue)).await?;
        }
    }
    with_deadline(db_deadline(state), state.store.update_line(updated)).await?;
    Ok(())
}

/// `POST /soa/ingest` (spec.md §4.6 Ingest, §6). Open to a supplier
/// ingesting its own vendor's statement or to internal staff.
pub async fn ingest(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let fields = collect_ingest_fields(&mut multipart).await?;
    let vendor_id = fields.vendor_id.ok_or_else(|| ApiError(CoreError::validation("missing vendor_id field")))?;
    let company_id = fields.company_id.ok_or_else(|| ApiError(CoreError::validation("missing company_id field")))?;
    let period_start = fields.period_start.ok_or_else(|| ApiError(CoreError::validation("missing period_start field")))?;
    let period_end = fields.period_end.ok_or_else(|| ApiError(CoreError::validation("missing period_end field")))?;
    let csv_bytes = fields.csv_bytes.ok_or_else(|| ApiError(CoreError::validation("missing file field")))?;

    require_vendor_scope(&actor, vendor_id).map_err(ApiError)?;
    let _vendor = with_deadline(db_deadline(&state), state.store.get_vendor(actor.tenant_id, vendor_id)).await?;
    let _company = with_deadline(db_deadline(&state), state.store.get_company(actor.tenant_id, company_id)).await?;
    let linked = with_deadline(db_deadline(&state), state.store.vendor_linked_to_company(vendor_id, company_id)).await?;
    if !linked {
        return Err(ApiError(CoreError::validation("vendor is not linked to the given company")));
    }

    let now = Timestamp::now();
    let case_id = match with_deadline(
        db_deadline(&state),
        state.store.find_soa_case(vendor_id, company_id, period_start, period_end),
    )
    .await?
    {
        Some(existing) => existing,
        None => create_soa_case(&state, actor.tenant_id, company_id, vendor_id, period_start, period_end, now).await?,
    };

    let mut reader = csv::ReaderBuilder::new().from_reader(csv_bytes.as_slice());
    let header: Vec<String> = reader
        .headers()
        .map_err(|error| ApiError(CoreError::validation(format!("malformed CSV header: {error}"))))?
        .iter()
        .map(str::to_string)
        .collect();
    let resolved = resolve_columns(&header).map_err(ApiError)?;

    let mut existing_numbers: BTreeSet<String> =
        with_deadline(db_deadline(&state), state.store.existing_document_numbers(case_id)).await?.into_iter().collect();

    let mut new_lines = Vec::new();
    let mut errors = Vec::new();
    let mut skipped_duplicates = 0usize;

    for (row_index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                errors.push(IngestRowError { row: row_index, reason: error.to_string() });
                continue;
            }
        };
        match parse_soa_line(case_id, &record, &resolved) {
            Ok(line) => {
                if existing_numbers.contains(&line.document_number) {
                    skipped_duplicates += 1;
                    continue;
                }
                existing_numbers.insert(line.document_number.clone());
                new_lines.push(line);
            }
            Err(reason) => errors.push(IngestRowError { row: row_index, reason }),
        }
    }

    if !new_lines.is_empty() {
        with_deadline(db_deadline(&state), state.store.insert_lines(new_lines.clone())).await?;
        let invoices = with_deadline(db_deadline(&state), state.store.find_invoices(vendor_id, company_id)).await?;
        for line in &new_lines {
            match_and_record_line(&state, line, &invoices).await?;
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            case_id,
            lines_ingested: new_lines.len(),
            lines_skipped_duplicate: skipped_duplicates,
            errors,
        }),
    ))
}

// ============================================================================
// SECTION: Recompute
// ============================================================================

/// `POST /soa/{case}/recompute` (spec.md §4.6, §6). Re-runs the matcher
/// over lines still `extracted` only; matched, resolved, or ignored lines
/// are left untouched.
pub async fn recompute(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path(case_id): Path<CaseId>,
) -> Result<Json<Vec<SoaLine>>, ApiError> {
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;
    require_vendor_scope(&actor, case.vendor_id).map_err(ApiError)?;

    let lines = with_deadline(db_deadline(&state), state.store.list_lines(case_id)).await?;
    let invoices =
        with_deadline(db_deadline(&state), state.store.find_invoices(case.vendor_id, case.company_id)).await?;
    for line in lines.iter().filter(|line| line.status == LineStatus::Extracted) {
        match_and_record_line(&state, line, &invoices).await?;
    }
    let refreshed = with_deadline(db_deadline(&state), state.store.list_lines(case_id)).await?;
    Ok(Json(refreshed))
}

// ============================================================================
// SECTION: Lines Read
// ============================================================================

/// One line with its recorded matches and issues, for the reconciliation
/// view (supplements spec.md §6, which names the SOA action routes but not
/// a read shape; a sign-off UI cannot function without this).
#[derive(Debug, Serialize)]
pub struct LineWithDetails {
    /// The line.
    pub line: SoaLine,
    /// Matches recorded against the line.
    pub matches: Vec<SoaMatch>,
    /// Issues raised against the line.
    pub issues: Vec<SoaIssue>,
}

/// `GET /soa/{case}/lines` (spec.md §6 read surface, supplemented).
pub async fn list_lines(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path(case_id): Path<CaseId>,
) -> Result<Json<Vec<LineWithDetails>>, ApiError> {
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;
    require_vendor_scope(&actor, case.vendor_id).map_err(ApiError)?;

    let lines = with_deadline(db_deadline(&state), state.store.list_lines(case_id)).await?;
    let all_issues = with_deadline(db_deadline(&state), state.store.list_issues(case_id)).await?;
    let mut with_details = Vec::with_capacity(lines.len());
    for line in lines {
        let matches = with_deadline(db_deadline(&state), state.store.list_matches(line.id)).await?;
        let issues = all_issues.iter().filter(|issue| issue.line_id == line.id).cloned().collect();
        with_details.push(LineWithDetails { line, matches, issues });
    }
    Ok(Json(with_details))
}

// ============================================================================
// SECTION: Sign-off
// ============================================================================

/// `POST /soa/{case}/signoff` response body.
#[derive(Debug, Serialize)]
pub struct SignoffResponse {
    /// The resolved case.
    pub case: Case,
    /// Sum of `amount_delta` across every recorded match on the case, for
    /// the audit trail (spec.md §4.6).
    pub net_variance: BigDecimal,
}

/// `POST /soa/{case}/signoff` (spec.md §4.6 Sign-off, internal-only).
pub async fn signoff(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path(case_id): Path<CaseId>,
) -> Result<Json<SignoffResponse>, ApiError> {
    require_internal(&actor).map_err(ApiError)?;
    let mut case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;

    let lines = with_deadline(db_deadline(&state), state.store.list_lines(case_id)).await?;
    let gate_lines: Vec<LineGateInput> =
        lines.iter().map(|line| LineGateInput { line_id: line.id, status: line.status }).collect();
    let issues = with_deadline(db_deadline(&state), state.store.list_issues(case_id)).await?;
    let issue_statuses: Vec<IssueStatus> = issues.iter().map(|issue| issue.status).collect();
    validate_signoff(&gate_lines, &issue_statuses).map_err(ApiError)?;

    let mut net_variance = BigDecimal::from(0);
    for line in &lines {
        let matches = with_deadline(db_deadline(&state), state.store.list_matches(line.id)).await?;
        for line_match in matches {
            net_variance += line_match.amount_delta;
        }
    }

    validate_transition(case.status, CaseStatus::Resolved).map_err(ApiError)?;
    case.status = CaseStatus::Resolved;
    case.updated_at = Timestamp::now();
    with_deadline(db_deadline(&state), state.store.update_case(case.clone())).await?;

    let note =
        system_message(case.id, format!("SOA signed off by user {}; net variance {net_variance}", actor.user_id), case.updated_at);
    with_deadline(db_deadline(&state), state.store.insert_message(note)).await?;

    Ok(Json(SignoffResponse { case, net_variance }))
}

// ============================================================================
// SECTION: Manual Actions
// ============================================================================

async fn find_line(state: &AppState, case_id: CaseId, line_id: SoaLineId) -> Result<SoaLine, ApiError> {
    let lines = with_deadline(db_deadline(state), state.store.list_lines(case_id)).await?;
    lines.into_iter().find(|line| line.id == line_id).ok_or_else(|| ApiError(CoreError::not_found(format!("soa line {line_id}"))))
}

async fn find_issue(state: &AppState, case_id: CaseId, issue_id: SoaIssueId) -> Result<SoaIssue, ApiError> {
    let issues = with_deadline(db_deadline(state), state.store.list_issues(case_id)).await?;
    issues.into_iter().find(|issue| issue.id == issue_id).ok_or_else(|| ApiError(CoreError::not_found(format!("soa issue {issue_id}"))))
}

/// `POST /soa/{case}/lines/{line}/match` request body.
#[derive(Debug, Deserialize)]
pub struct MatchLineRequest {
    /// The shadow-ledger invoice to record the line against.
    pub invoice_id: InvoiceId,
}

/// `POST /soa/{case}/lines/{line}/match` (spec.md §4.6 "`match_line(line,
/// invoice)`: records a manual match (pass = \"manual\")"). Internal-only,
/// the same authorization tier as a checklist verdict: a manual match
/// overrides what the automatic passes concluded.
pub async fn match_line_manually(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path((case_id, line_id)): Path<(CaseId, SoaLineId)>,
    Json(body): Json<MatchLineRequest>,
) -> Result<Json<SoaMatch>, ApiError> {
    require_internal(&actor).map_err(ApiError)?;
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;

    let mut line = find_line(&state, case_id, line_id).await?;
    let invoices = with_deadline(db_deadline(&state), state.store.find_invoices(case.vendor_id, case.company_id)).await?;
    let invoice = invoices
        .into_iter()
        .find(|invoice| invoice.id == body.invoice_id)
        .ok_or_else(|| ApiError(CoreError::not_found(format!("invoice {}", body.invoice_id))))?;

    let amount_delta = &line.amount - &invoice.amount;
    let days_delta = line.document_date.since(invoice.invoice_date).whole_days();
    let soa_match = SoaMatch {
        id: SoaMatchId::generate(),
        line_id: line.id,
        invoice_id: invoice.id,
        pass: MatchPass::Manual,
        is_exact: amount_delta == BigDecimal::from(0) && days_delta == 0,
        amount_delta,
        days_delta,
        created_at: Timestamp::now(),
    };
    with_deadline(db_deadline(&state), state.store.insert_match(soa_match.clone())).await?;

    line.status = LineStatus::Matched;
    with_deadline(db_deadline(&state), state.store.update_line(line)).await?;

    let note = system_message(
        case_id,
        format!("SOA line {line_id} manually matched to invoice {} by user {}", invoice.id, actor.user_id),
        Timestamp::now(),
    );
    with_deadline(db_deadline(&state), state.store.insert_message(note)).await?;

    Ok(Json(soa_match))
}

/// `POST /soa/{case}/lines/{line}/dispute` request body.
#[derive(Debug, Deserialize)]
pub struct DisputeLineRequest {
    /// Why the line is being disputed.
    pub reason: String,
}

/// `POST /soa/{case}/lines/{line}/dispute` (spec.md §4.6 "`dispute_line(line,
/// reason)`: opens an issue"). Open to the vendor whose statement the line
/// belongs to, the same tier as posting a message or uploading evidence —
/// disputing a line is how a supplier flags a discrepancy it sees, not a
/// decision that changes the line's resolution.
pub async fn dispute_line(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path((case_id, line_id)): Path<(CaseId, SoaLineId)>,
    Json(body): Json<DisputeLineRequest>,
) -> Result<(StatusCode, Json<SoaIssue>), ApiError> {
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;
    require_vendor_scope(&actor, case.vendor_id).map_err(ApiError)?;

    let reason = body.reason.trim();
    if reason.is_empty() {
        return Err(ApiError(CoreError::validation("dispute reason must not be empty")));
    }
    let mut line = find_line(&state, case_id, line_id).await?;

    let issue = SoaIssue {
        id: SoaIssueId::generate(),
        line_id: line.id,
        issue_type: IssueType::Unmatched,
        description: reason.to_string(),
        status: IssueStatus::Open,
        resolver_user_id: None,
        resolved_at: None,
    };
    with_deadline(db_deadline(&state), state.store.insert_issue(issue.clone())).await?;

    line.status = LineStatus::Discrepancy;
    with_deadline(db_deadline(&state), state.store.update_line(line)).await?;

    let note = system_message(case_id, format!("SOA line {line_id} disputed: {reason}"), Timestamp::now());
    with_deadline(db_deadline(&state), state.store.insert_message(note)).await?;

    Ok((StatusCode::CREATED, Json(issue)))
}

/// `POST /soa/{case}/issues/{issue}/resolve` request body.
#[derive(Debug, Deserialize)]
pub struct ResolveIssueRequest {
    /// Resolution note recorded on the case thread.
    pub note: String,
}

/// `POST /soa/{case}/issues/{issue}/resolve` (spec.md §4.6
/// "`resolve_issue(issue, note)`: closes an issue"). Internal-only: closing
/// an issue clears it from the sign-off gate (spec.md §4.6 sign-off gate),
/// so it carries the same authorization tier as sign-off itself.
pub async fn resolve_issue(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path((case_id, issue_id)): Path<(CaseId, SoaIssueId)>,
    Json(body): Json<ResolveIssueRequest>,
) -> Result<Json<SoaIssue>, ApiError> {
    require_internal(&actor).map_err(ApiError)?;
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;

    let note = body.note.trim();
    if note.is_empty() {
        return Err(ApiError(CoreError::validation("resolution note must not be empty")));
    }
    let issue = find_issue(&state, case_id, issue_id).await?;
    let now = Timestamp::now();
    let resolved =
        SoaIssue { status: IssueStatus::Resolved, resolver_user_id: Some(actor.user_id), resolved_at: Some(now), ..issue };
    with_deadline(db_deadline(&state), state.store.update_issue(issue_id, resolved.clone())).await?;

    let all_issues = with_deadline(db_deadline(&state), state.store.list_issues(case_id)).await?;
    let other_issues_open = all_issues
        .iter()
        .any(|other| other.line_id == resolved.line_id && other.id != issue_id && other.status == IssueStatus::Open);
    let mut line = find_line(&state, case_id, resolved.line_id).await?;
    let next_status = line_status_after_issue_resolved(line.status, other_issues_open);
    if next_status != line.status {
        line.status = next_status;
        with_deadline(db_deadline(&state), state.store.update_line(line)).await?;
    }

    let message = system_message(case_id, format!("SOA issue {issue_id} resolved: {note}"), now);
    with_deadline(db_deadline(&state), state.store.insert_message(message)).await?;

    Ok(Json(resolved))
}

/// `POST /soa/{case}/lines/{line}/evidence` (spec.md §4.6
/// "`upload_line_evidence`: attaches evidence to the line's case via the
/// Evidence Vault"). Delegates to the same digest/upload/insert/reconcile
/// sequence the case-level evidence route uses.
pub async fn upload_line_evidence(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path((case_id, line_id)): Path<(CaseId, SoaLineId)>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Evidence>), ApiError> {
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;
    require_vendor_scope(&actor, case.vendor_id).map_err(ApiError)?;
    find_line(&state, case_id, line_id).await?;

    let evidence = crate::evidence::upload_evidence_for_case(&state, case_id, &actor, &mut multipart).await?;
    Ok((StatusCode::CREATED, Json(evidence)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_date_parses() {
        let (date, ambiguous) = parse_date_cell("2025-01-09").expect("iso date");
        assert_eq!(date.year(), 2025);
        assert!(!ambiguous);
    }

    #[test]
    fn dmon_date_parses() {
        let (date, ambiguous) = parse_date_cell("09-Jan-2025").expect("dmon date");
        assert_eq!(date.year(), 2025);
        assert!(!ambiguous);
    }

    #[test]
    fn unambiguous_slash_date_picks_day_over_twelve() {
        let (date, ambiguous) = parse_date_cell("25/03/2025").expect("slash date");
        assert_eq!(date.month(), Month::March);
        assert_eq!(date.day(), 25);
        assert!(!ambiguous);
    }

    #[test]
    fn ambiguous_slash_date_assumes_month_before_day() {
        let (date, ambiguous) = parse_date_cell("03/04/2025").expect("slash date");
        assert_eq!(date.month(), Month::March);
        assert_eq!(date.day(), 4);
        assert!(ambiguous);
    }

    #[test]
    fn parenthesized_amount_is_negative() {
        let value = parse_amount_cell("(1,250.00)").expect("amount");
        assert_eq!(value, BigDecimal::from(-1250));
    }

    #[test]
    fn plain_amount_with_thousands_separator() {
        let value = parse_amount_cell("1,250.50").expect("amount");
        assert_eq!(value, "1250.50".parse::<BigDecimal>().expect("literal"));
    }

    #[test]
    fn unrecognized_document_type_falls_back_to_other() {
        assert_eq!(parse_document_type("XYZ"), DocumentType::Other);
        assert_eq!(parse_document_type("invoice"), DocumentType::Inv);
    }
}
