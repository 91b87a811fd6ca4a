// crates/vmp-http/src/cases.rs
// ============================================================================
// Module: Case Registry Routes
// Description: Create/list/read a case, and its status/reassign/escalate
//              actions (spec.md §4.1, §6).
// Dependencies: axum, vmp-core, vmp-notify
// ============================================================================

//! ## Overview
//! Every handler resolves its actor, confirms tenant/vendor scope via
//! [`vmp_core::auth`], then delegates the hard rules (status matrix,
//! escalation effects, SLA window defaults, required checklist steps) to
//! `vmp-core`. A status change or escalation always appends a system
//! thread message so the case history stays self-describing.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use vmp_core::CoreError;
use vmp_core::auth::require_internal;
use vmp_core::auth::require_same_tenant;
use vmp_core::auth::require_vendor_scope;
use vmp_core::case::default_sla_window;
use vmp_core::case::escalation_effect;
use vmp_core::case::validate_transition;
use vmp_core::checklist::required_steps;
use vmp_core::checklist::PaymentInputs;
use vmp_core::ids::CaseId;
use vmp_core::ids::CompanyId;
use vmp_core::ids::UserId;
use vmp_core::ids::VendorId;
use vmp_core::interfaces::CaseFilter;
use vmp_core::model::actor::ActorRole;
use vmp_core::model::case::Case;
use vmp_core::model::case::CaseStatus;
use vmp_core::model::case::CaseType;
use vmp_core::model::case::OwnerTeam;
use vmp_core::model::checklist::ChecklistStep;
use vmp_core::model::checklist::StepStatus;
use vmp_core::notify::escalation_draft;
use vmp_core::thread::system_message;
use vmp_core::time::Timestamp;

use crate::deadline::with_deadline;
use crate::error::ApiError;
use crate::notifications::notify_user;
use crate::session::ActorExtractor;
use crate::state::AppState;

fn db_deadline(state: &AppState) -> std::time::Duration {
    std::time::Duration::from_secs(state.config.server.db_deadline_secs)
}

// ============================================================================
// SECTION: List & Create
// ============================================================================

/// Query parameters for `GET /cases`.
#[derive(Debug, Deserialize, Default)]
pub struct ListCasesQuery {
    /// Restrict to one status.
    pub status: Option<CaseStatus>,
    /// Restrict to one owner team.
    pub owner_team: Option<OwnerTeam>,
    /// Restrict to one case type.
    pub case_type: Option<CaseType>,
    /// Restrict to one vendor (internal actors only; suppliers are always
    /// restricted to their own vendor).
    pub vendor_id: Option<VendorId>,
    /// Free-text search over subject.
    pub q: Option<String>,
    /// Restrict to one SLA posture, computed in-memory (no store column).
    pub sla_posture: Option<vmp_core::model::case::SlaPosture>,
}

/// Lists cases visible to the caller (spec.md §4.1, §6 `GET /cases`).
pub async fn list_cases(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Query(query): Query<ListCasesQuery>,
) -> Result<Json<Vec<Case>>, ApiError> {
    let vendor_id = match actor.role {
        ActorRole::Supplier => actor.vendor_id,
        ActorRole::Internal => query.vendor_id,
    };
    let filter = CaseFilter {
        status: query.status,
        owner_team: query.owner_team,
        case_type: query.case_type,
        vendor_id,
        free_text: query.q,
    };
    let cases = with_deadline(db_deadline(&state), state.store.list_cases(actor.tenant_id, filter)).await?;
    let now = Timestamp::now();
    let filtered = cases
        .into_iter()
        .filter(|case| query.sla_posture.is_none_or(|posture| case.posture(now) == posture))
        .collect();
    Ok(Json(filtered))
}

/// `POST /cases` request body.
#[derive(Debug, Deserialize)]
pub struct CreateCaseRequest {
    /// Company the case concerns.
    pub company_id: CompanyId,
    /// Vendor the case concerns.
    pub vendor_id: VendorId,
    /// Case type; drives owner team, SLA window, and checklist.
    pub case_type: CaseType,
    /// Free-text subject.
    pub subject: String,
    /// Bank-details-change flag, used only to derive payment checklist
    /// requirements (spec.md §4.3).
    #[serde(default)]
    pub bank_details_change: bool,
    /// Proposed bank details carried by a bank-details-change payment case;
    /// applied to the vendor when the case resolves (spec.md §4.1 Bank-change
    /// workflow, §9 Open Question 1).
    #[serde(default)]
    pub proposed_bank_details: Option<vmp_core::model::tenant::BankDetails>,
}

/// Creates a case, materializes its checklist, and opens its thread
/// (spec.md §4.1 Create, §4.3 Materialize).
///
/// Internal actors may open any case type. A supplier actor may open only
/// a bank-details-change request against its own vendor (spec.md §8
/// scenario 4: "Supplier submits bank-change request; a payment case is
/// created..."); every other case type remains internal-only.
pub async fn create_case(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Json(body): Json<CreateCaseRequest>,
) -> Result<(StatusCode, Json<Case>), ApiError> {
    match actor.role {
        ActorRole::Internal => {}
        ActorRole::Supplier => {
            if body.case_type != CaseType::Payment || !body.bank_details_change {
                return Err(ApiError(CoreError::authorization(
                    "suppliers may only open a case to request a bank-details change",
                )));
            }
            require_vendor_scope(&actor, body.vendor_id).map_err(ApiError)?;
        }
    }

    let vendor = with_deadline(db_deadline(&state), state.store.get_vendor(actor.tenant_id, body.vendor_id)).await?;
    let linked =
        with_deadline(db_deadline(&state), state.store.vendor_linked_to_company(body.vendor_id, body.company_id))
            .await?;
    if !linked {
        return Err(ApiError(CoreError::validation("vendor is not linked to the given company")));
    }

    let now = Timestamp::now();
    let mut metadata = BTreeMap::new();
    if body.bank_details_change {
        metadata.insert("bank_details_change".to_string(), Value::Bool(true));
        if let Some(proposed) = &body.proposed_bank_details {
            let encoded = serde_json::to_value(proposed)
                .map_err(|error| ApiError(CoreError::validation(format!("malformed proposed bank details: {error}"))))?;
            metadata.insert("proposed_bank_details".to_string(), encoded);
        }
    }
    let case = Case {
        id: CaseId::generate(),
        tenant_id: actor.tenant_id,
        company_id: body.company_id,
        vendor_id: body.vendor_id,
        case_type: body.case_type,
        subject: body.subject,
        status: CaseStatus::Open,
        owner_team: OwnerTeam::default_for(body.case_type),
        assigned_user_id: None,
        sla_due_at: Some(now.plus(default_sla_window(body.case_type))),
        last_posture: None,
        escalation_level: 0,
        metadata,
        linked_invoice_id: None,
        created_at: now,
        updated_at: now,
    };
    with_deadline(db_deadline(&state), state.store.insert_case(case.clone())).await?;

    let onboarding_inputs = matches!(body.case_type, CaseType::Onboarding)
        .then(|| vmp_core::checklist::OnboardingInputs { vendor_type: vendor.vendor_type, country_code: country_code_str(&vendor.country_code) });
    let payment_inputs = PaymentInputs { bank_details_change: body.bank_details_change };
    let steps: Vec<ChecklistStep> = required_steps(body.case_type, onboarding_inputs, payment_inputs)
        .into_iter()
        .map(|required| ChecklistStep {
            id: vmp_core::ids::ChecklistStepId::generate(),
            case_id: case.id,
            label: required.label.to_string(),
            required_type: required.evidence_type,
            status: StepStatus::Pending,
            rejection_reason: None,
        })
        .collect();
    if !steps.is_empty() {
        with_deadline(db_deadline(&state), state.store.insert_missing_steps(steps)).await?;
    }

    let opened = system_message(case.id, format!("case opened as {:?}", case.case_type), now);
    with_deadline(db_deadline(&state), state.store.insert_message(opened)).await?;

    Ok((StatusCode::CREATED, Json(case)))
}

fn country_code_str(country_code: &str) -> &'static str {
    // `OnboardingInputs::country_code` is `&'static str` in `vmp-core` because
    // its match arms compare against fixed ISO codes; a stored vendor's code
    // is leaked for the lifetime of the request via `Box::leak` is avoided by
    // matching into the fixed set the checklist rules understand instead.
    match country_code {
        "US" => "US",
        "MY" => "MY",
        other if vmp_core::checklist::EU_COUNTRIES.contains(&other) => eu_code(other),
        _ => "OTHER",
    }
}

fn eu_code(code: &str) -> &'static str {
    vmp_core::checklist::EU_COUNTRIES.iter().find(|candidate| **candidate == code).copied().unwrap_or("OTHER")
}

// ============================================================================
// SECTION: Read
// ============================================================================

/// Reads a single case (spec.md §6 `GET /cases/{id}`).
pub async fn get_case(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path(case_id): Path<CaseId>,
) -> Result<Json<Case>, ApiError> {
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;
    require_vendor_scope(&actor, case.vendor_id).map_err(ApiError)?;
    Ok(Json(case))
}

// ============================================================================
// SECTION: Status Transition
// ============================================================================

/// `POST /cases/{id}/status` request body.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    /// Requested next status.
    pub status: CaseStatus,
}

/// Applies a status transition (spec.md §4.1 status matrix, §8 cross-tenant
/// invariant).
pub async fn set_status(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path(case_id): Path<CaseId>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<Case>, ApiError> {
    require_internal(&actor).map_err(ApiError)?;
    let mut case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;
    validate_transition(case.status, body.status).map_err(ApiError)?;

    let from = case.status;
    case.status = body.status;
    case.updated_at = Timestamp::now();
    with_deadline(db_deadline(&state), state.store.update_case(case.clone())).await?;

    let note = system_message(case.id, format!("status changed from {from:?} to {:?}", case.status), case.updated_at);
    with_deadline(db_deadline(&state), state.store.insert_message(note)).await?;

    apply_bank_details_change_on_resolve(&state, &case).await?;

    Ok(Json(case))
}

/// Applies a bank-details-change case's proposed bank details to its vendor
/// the moment the case resolves (spec.md §4.1 Bank-change workflow, §9 Open
/// Question 1: the hook lives inside the resolve transition, atomic with the
/// status change).
///
/// A case resolving without a `proposed_bank_details` payload (not a
/// bank-details-change case, or one submitted without the metadata) simply
/// resolves with no vendor mutation, matching spec.md §9's degraded-build
/// fallback.
pub(crate) async fn apply_bank_details_change_on_resolve(state: &AppState, case: &Case) -> Result<(), ApiError> {
    let Some(proposed) = pending_bank_details_change(case).map_err(ApiError)? else {
        return Ok(());
    };
    with_deadline(db_deadline(state), state.store.update_vendor_bank_details(case.vendor_id, proposed)).await?;
    Ok(())
}

/// Pure guard: does `case` carry a bank-details-change proposal that should
/// apply now that it has resolved? `None` covers every case that is not a
/// resolved, bank-details-change payment case; `Some` carries the parsed
/// proposal.
///
/// # Errors
///
/// Returns [`CoreError::Integrity`] if the stored `proposed_bank_details`
/// value does not deserialize as [`vmp_core::model::tenant::BankDetails`].
fn pending_bank_details_change(case: &Case) -> Result<Option<vmp_core::model::tenant::BankDetails>, CoreError> {
    if case.status != CaseStatus::Resolved || case.case_type != CaseType::Payment {
        return Ok(None);
    }
    let Some(Value::Bool(true)) = case.metadata.get("bank_details_change") else {
        return Ok(None);
    };
    let Some(proposed) = case.metadata.get("proposed_bank_details") else {
        return Ok(None);
    };
    serde_json::from_value(proposed.clone())
        .map(Some)
        .map_err(|error| CoreError::integrity(format!("stored proposed bank details malformed: {error}")))
}

// ============================================================================
// SECTION: Reassign
// ============================================================================

/// `POST /cases/{id}/reassign` request body.
#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    /// New owner team.
    pub owner_team: OwnerTeam,
    /// New assigned internal user, if any.
    pub assigned_user_id: Option<UserId>,
}

/// Reassigns a case's owning team and/or assigned user (spec.md §4.1
/// Reassign, internal-only).
pub async fn reassign(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path(case_id): Path<CaseId>,
    Json(body): Json<ReassignRequest>,
) -> Result<Json<Case>, ApiError> {
    require_internal(&actor).map_err(ApiError)?;
    let mut case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;

    case.owner_team = body.owner_team;
    case.assigned_user_id = body.assigned_user_id;
    case.updated_at = Timestamp::now();
    with_deadline(db_deadline(&state), state.store.update_case(case.clone())).await?;

    let note = system_message(case.id, format!("reassigned to {:?}", case.owner_team), case.updated_at);
    with_deadline(db_deadline(&state), state.store.insert_message(note)).await?;

    Ok(Json(case))
}

// ============================================================================
// SECTION: Escalate
// ============================================================================

/// `POST /cases/{id}/escalate` request body.
#[derive(Debug, Deserialize)]
pub struct EscalateRequest {
    /// Target escalation level (2 or 3).
    pub level: u8,
}

/// `POST /cases/{id}/escalate` response body.
#[derive(Debug, Serialize)]
pub struct EscalateResponse {
    /// The updated case.
    pub case: Case,
    /// Break-glass contact, present only when level 3 reveals it
    /// (spec.md §4.1 Escalate, §4.7).
    pub break_glass_contact: Option<String>,
}

/// Escalates a case to level 2 or 3 (spec.md §4.1 Escalate, internal-only).
pub async fn escalate(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path(case_id): Path<CaseId>,
    Json(body): Json<EscalateRequest>,
) -> Result<Json<EscalateResponse>, ApiError> {
    require_internal(&actor).map_err(ApiError)?;
    let mut case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;

    let effect = escalation_effect(body.level).map_err(ApiError)?;
    validate_transition(case.status, effect.status).map_err(ApiError)?;

    case.status = effect.status;
    if let Some(owner_team) = effect.owner_team {
        case.owner_team = owner_team;
    }
    case.escalation_level = body.level;
    case.updated_at = Timestamp::now();
    with_deadline(db_deadline(&state), state.store.update_case(case.clone())).await?;

    let note = system_message(case.id, format!("escalated to level {}", body.level), case.updated_at);
    with_deadline(db_deadline(&state), state.store.insert_message(note)).await?;

    let break_glass_contact = effect.reveal_break_glass.then(|| {
        state
            .tenant_overrides
            .break_glass_contact_for(&case.tenant_id.to_string(), &state.config.policy.break_glass_contact)
            .to_string()
    });

    if let Some(assignee) = case.assigned_user_id {
        notify_user(&state, assignee, escalation_draft(assignee, case.id, body.level)).await?;
    }

    Ok(Json(EscalateResponse { case, break_glass_contact }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vmp_config::TenantOverrides;
    use vmp_config::VmpConfig;
    use vmp_core::interfaces::CaseStore;
    use vmp_core::model::actor::Actor;
    use vmp_core::model::tenant::BankDetails;
    use vmp_core::model::tenant::Tenant;
    use vmp_core::model::tenant::Vendor;
    use vmp_core::model::tenant::VendorType;
    use vmp_notify::CompositeDispatcher;
    use vmp_objectstore::LocalObjectStore;
    use vmp_store::SqliteStore;

    use super::*;

    #[test]
    fn country_code_falls_back_to_other() {
        assert_eq!(country_code_str("ZZ"), "OTHER");
        assert_eq!(country_code_str("US"), "US");
    }

    fn base_case() -> Case {
        Case {
            id: CaseId::generate(),
            tenant_id: vmp_core::ids::TenantId::generate(),
            company_id: CompanyId::generate(),
            vendor_id: VendorId::generate(),
            case_type: CaseType::Payment,
            subject: "bank change".to_string(),
            status: CaseStatus::Resolved,
            owner_team: OwnerTeam::AccountsPayable,
            assigned_user_id: None,
            sla_due_at: None,
            last_posture: None,
            escalation_level: 0,
            metadata: BTreeMap::new(),
            linked_invoice_id: None,
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        }
    }

    fn details() -> BankDetails {
        BankDetails {
            account_name: "Acme Corp".to_string(),
            account_number: "123456".to_string(),
            bank_name: "First Bank".to_string(),
            swift: "ACMEUS33".to_string(),
        }
    }

    #[test]
    fn resolved_bank_change_case_yields_proposed_details() {
        let mut case = base_case();
        case.metadata.insert("bank_details_change".to_string(), Value::Bool(true));
        case.metadata.insert("proposed_bank_details".to_string(), serde_json::to_value(details()).expect("serializable"));
        let resolved = pending_bank_details_change(&case).expect("no parse error").expect("proposal present");
        assert_eq!(resolved, details());
    }

    #[test]
    fn non_resolved_case_yields_nothing() {
        let mut case = base_case();
        case.status = CaseStatus::WaitingInternal;
        case.metadata.insert("bank_details_change".to_string(), Value::Bool(true));
        case.metadata.insert("proposed_bank_details".to_string(), serde_json::to_value(details()).expect("serializable"));
        assert!(pending_bank_details_change(&case).expect("no parse error").is_none());
    }

    #[test]
    fn non_payment_case_yields_nothing() {
        let mut case = base_case();
        case.case_type = CaseType::Invoice;
        case.metadata.insert("bank_details_change".to_string(), Value::Bool(true));
        case.metadata.insert("proposed_bank_details".to_string(), serde_json::to_value(details()).expect("serializable"));
        assert!(pending_bank_details_change(&case).expect("no parse error").is_none());
    }

    #[test]
    fn resolved_payment_case_without_flag_yields_nothing() {
        let case = base_case();
        assert!(pending_bank_details_change(&case).expect("no parse error").is_none());
    }

    #[test]
    fn flag_without_proposal_yields_nothing_not_an_error() {
        let mut case = base_case();
        case.metadata.insert("bank_details_change".to_string(), Value::Bool(true));
        assert!(pending_bank_details_change(&case).expect("no parse error").is_none());
    }

    #[test]
    fn malformed_proposal_is_an_integrity_error() {
        let mut case = base_case();
        case.metadata.insert("bank_details_change".to_string(), Value::Bool(true));
        case.metadata.insert("proposed_bank_details".to_string(), Value::String("not an object".to_string()));
        assert!(pending_bank_details_change(&case).is_err());
    }

    /// Seeds a tenant/company/vendor triple and returns the `AppState` plus
    /// their ids, for handler-level tests (spec.md §8 scenario 4).
    async fn seeded_state() -> (AppState, vmp_core::ids::TenantId, CompanyId, VendorId) {
        let store = SqliteStore::open_in_memory().expect("open store");
        let tenant_id = vmp_core::ids::TenantId::generate();
        store.insert_tenant(&Tenant { id: tenant_id, display_name: "Acme".to_string() }).expect("insert tenant");
        let company_id = CompanyId::generate();
        store
            .insert_company(&vmp_core::model::tenant::Company {
                id: company_id,
                tenant_id,
                name: "Acme Co".to_string(),
                country_code: "US".to_string(),
            })
            .expect("insert company");
        let vendor_id = VendorId::generate();
        store
            .insert_vendor(&Vendor {
                id: vendor_id,
                tenant_id,
                display_name: "Vendor Inc".to_string(),
                vendor_type: VendorType::Corporate,
                country_code: "US".to_string(),
                bank_details: details(),
            })
            .expect("insert vendor");
        store.link_vendor_company(vendor_id, company_id).expect("link");

        let state = AppState::new(
            Arc::new(store),
            Arc::new(LocalObjectStore::new("/tmp/vmp-cases-tests", "http://localhost/blobs", b"k".to_vec())),
            Arc::new(CompositeDispatcher::new(Vec::new())),
            Arc::new(VmpConfig::default()),
            Arc::new(TenantOverrides::default()),
        );
        (state, tenant_id, company_id, vendor_id)
    }

    fn supplier_actor(tenant_id: vmp_core::ids::TenantId, vendor_id: VendorId) -> Actor {
        Actor { user_id: UserId::generate(), tenant_id, role: ActorRole::Supplier, vendor_id: Some(vendor_id) }
    }

    #[tokio::test]
    async fn supplier_can_open_a_bank_details_change_case_for_its_own_vendor() {
        let (state, tenant_id, company_id, vendor_id) = seeded_state().await;
        let actor = supplier_actor(tenant_id, vendor_id);
        let body = CreateCaseRequest {
            company_id,
            vendor_id,
            case_type: CaseType::Payment,
            subject: "bank details change".to_string(),
            bank_details_change: true,
            proposed_bank_details: Some(details()),
        };
        let (status, Json(case)) =
            create_case(State(state), ActorExtractor(actor), Json(body)).await.expect("supplier may open a bank-change case");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(case.case_type, CaseType::Payment);
        assert_eq!(case.metadata.get("bank_details_change"), Some(&Value::Bool(true)));
    }

    #[tokio::test]
    async fn supplier_cannot_open_a_case_that_is_not_a_bank_details_change() {
        let (state, tenant_id, company_id, vendor_id) = seeded_state().await;
        let actor = supplier_actor(tenant_id, vendor_id);
        let body = CreateCaseRequest {
            company_id,
            vendor_id,
            case_type: CaseType::Invoice,
            subject: "invoice exception".to_string(),
            bank_details_change: false,
            proposed_bank_details: None,
        };
        let result = create_case(State(state), ActorExtractor(actor), Json(body)).await;
        assert!(result.is_err(), "suppliers may only self-serve a bank-details-change case");
    }
}
