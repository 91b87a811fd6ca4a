// crates/vmp-http/src/checklist.rs
// ============================================================================
// Module: Checklist Routes
// Description: Read the checklist and apply internal verify/reject
//              verdicts (spec.md §4.3, §6).
// Dependencies: axum, vmp-core
// ============================================================================

//! ## Overview
//! A verdict updates one step, then reconciles the case status against
//! every step's resulting state via
//! [`vmp_core::checklist::recommended_case_status`] so the case never
//! drifts out of sync with its checklist. A reject always notifies the
//! supplier; a verify notifies only when it moves the whole checklist to
//! resolved would be premature — spec.md §4.7 ties evidence notifications
//! to the verdict itself, not to the case-level recommendation, so both
//! verdicts notify immediately.

use axum::Json;
use axum::extract::Path;
use axum::extract::State;
use serde::Deserialize;
use vmp_core::CoreError;
use vmp_core::auth::require_internal;
use vmp_core::auth::require_same_tenant;
use vmp_core::auth::require_vendor_scope;
use vmp_core::case::validate_transition;
use vmp_core::checklist::on_reject;
use vmp_core::checklist::on_verify;
use vmp_core::checklist::on_waive;
use vmp_core::checklist::recommended_case_status;
use vmp_core::ids::CaseId;
use vmp_core::ids::ChecklistStepId;
use vmp_core::model::checklist::ChecklistStep;
use vmp_core::notify::evidence_verdict_draft;
use vmp_core::thread::system_message;
use vmp_core::time::Timestamp;

use crate::deadline::with_deadline;
use crate::error::ApiError;
use crate::notifications::notify_other_party;
use crate::session::ActorExtractor;
use crate::state::AppState;

fn db_deadline(state: &AppState) -> std::time::Duration {
    std::time::Duration::from_secs(state.config.server.db_deadline_secs)
}

/// Lists a case's checklist (spec.md §6 `GET /cases/{id}/checklist`).
pub async fn list_checklist(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path(case_id): Path<CaseId>,
) -> Result<Json<Vec<ChecklistStep>>, ApiError> {
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;
    require_vendor_scope(&actor, case.vendor_id).map_err(ApiError)?;
    let steps = with_deadline(db_deadline(&state), state.store.list_steps(case_id)).await?;
    Ok(Json(steps))
}

async fn find_step(state: &AppState, case_id: CaseId, step_id: ChecklistStepId) -> Result<ChecklistStep, ApiError> {
    let steps = with_deadline(db_deadline(state), state.store.list_steps(case_id)).await?;
    steps
        .into_iter()
        .find(|step| step.id == step_id)
        .ok_or_else(|| ApiError(CoreError::not_found(format!("checklist step {step_id}"))))
}

/// Reconciles the case status against its checklist after a verdict
/// (spec.md §4.3 status reconciliation) and appends a system note.
///
/// # Errors
///
/// Returns [`CoreError::Conflict`] when the checklist's recommendation
/// would cross a status-matrix transition the case is not allowed to make
/// (spec.md §4.1); the reconciliation is not applied partially in that
/// case.
async fn reconcile_case(state: &AppState, case_id: CaseId, note: String, now: Timestamp) -> Result<(), CoreError> {
    let steps = with_deadline(db_deadline(state), state.store.list_steps(case_id)).await?;
    let statuses: Vec<_> = steps.iter().map(|step| step.status).collect();
    let mut case = with_deadline(db_deadline(state), state.store.get_case(case_id)).await?;
    if let Some(recommended) = recommended_case_status(&statuses) {
        if recommended != case.status {
            validate_transition(case.status, recommended)?;
            case.status = recommended;
        }
    }
    case.updated_at = now;
    with_deadline(db_deadline(state), state.store.update_case(case.clone())).await?;
    let message = system_message(case_id, note, now);
    with_deadline(db_deadline(state), state.store.insert_message(message)).await?;
    Ok(())
}

/// `POST /cases/{id}/checklist/{step}/verify` (spec.md §6, internal-only).
pub async fn verify_step(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path((case_id, step_id)): Path<(CaseId, ChecklistStepId)>,
) -> Result<Json<ChecklistStep>, ApiError> {
    require_internal(&actor).map_err(ApiError)?;
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;

    let mut step = find_step(&state, case_id, step_id).await?;
    step.status = on_verify(step.status).map_err(ApiError)?;
    step.rejection_reason = None;
    with_deadline(db_deadline(&state), state.store.update_step(step.clone())).await?;

    let now = Timestamp::now();
    reconcile_case(&state, case_id, format!("checklist step '{}' verified", step.label), now).await?;

    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    crate::cases::apply_bank_details_change_on_resolve(&state, &case).await?;
    notify_other_party(&state, &case, &actor, |recipient| evidence_verdict_draft(recipient, case_id, true)).await?;

    Ok(Json(step))
}

/// `POST /cases/{id}/checklist/{step}/reject` request body.
#[derive(Debug, Deserialize)]
pub struct RejectStepRequest {
    /// Reason shown to the supplier (spec.md §4.3).
    pub reason: String,
}

/// `POST /cases/{id}/checklist/{step}/reject` (spec.md §6, internal-only).
pub async fn reject_step(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path((case_id, step_id)): Path<(CaseId, ChecklistStepId)>,
    Json(body): Json<RejectStepRequest>,
) -> Result<Json<ChecklistStep>, ApiError> {
    require_internal(&actor).map_err(ApiError)?;
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;

    let reason = body.reason.trim();
    if reason.is_empty() {
        return Err(ApiError(CoreError::validation("rejection reason must not be empty")));
    }

    let mut step = find_step(&state, case_id, step_id).await?;
    step.status = on_reject(step.status).map_err(ApiError)?;
    step.rejection_reason = Some(reason.to_string());
    with_deadline(db_deadline(&state), state.store.update_step(step.clone())).await?;

    let now = Timestamp::now();
    reconcile_case(&state, case_id, format!("checklist step '{}' rejected: {reason}", step.label), now).await?;

    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    notify_other_party(&state, &case, &actor, |recipient| evidence_verdict_draft(recipient, case_id, false)).await?;

    Ok(Json(step))
}

/// `POST /cases/{id}/checklist/{step}/waive` (spec.md §4.3 "Waived is set
/// only by explicit internal action and is sticky", §6, internal-only).
/// Unlike verify/reject, waiving is not itself an evidence verdict on a
/// supplier submission, so it has no paired notification emission point
/// (spec.md §4.7 lists "evidence verified/rejected", not waived).
pub async fn waive_step(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path((case_id, step_id)): Path<(CaseId, ChecklistStepId)>,
) -> Result<Json<ChecklistStep>, ApiError> {
    require_internal(&actor).map_err(ApiError)?;
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;

    let mut step = find_step(&state, case_id, step_id).await?;
    step.status = on_waive();
    step.rejection_reason = None;
    with_deadline(db_deadline(&state), state.store.update_step(step.clone())).await?;

    let now = Timestamp::now();
    reconcile_case(&state, case_id, format!("checklist step '{}' waived", step.label), now).await?;

    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    crate::cases::apply_bank_details_change_on_resolve(&state, &case).await?;

    Ok(Json(step))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use vmp_config::TenantOverrides;
    use vmp_config::VmpConfig;
    use vmp_core::ids::CompanyId;
    use vmp_core::ids::TenantId;
    use vmp_core::ids::VendorId;
    use vmp_core::interfaces::CaseStore;
    use vmp_core::interfaces::ChecklistStore as _;
    use vmp_core::model::case::Case;
    use vmp_core::model::case::CaseStatus;
    use vmp_core::model::case::CaseType;
    use vmp_core::model::case::OwnerTeam;
    use vmp_core::model::checklist::EvidenceType;
    use vmp_core::model::checklist::StepStatus;
    use vmp_notify::CompositeDispatcher;
    use vmp_objectstore::LocalObjectStore;
    use vmp_store::SqliteStore;

    use super::*;

    #[test]
    fn reject_requires_non_empty_reason() {
        assert!(on_reject(vmp_core::model::checklist::StepStatus::Submitted).is_ok());
    }

    /// Seeds one case with a single pending checklist step and returns the
    /// `AppState` plus the case and step ids, for route-level tests.
    async fn seeded_case_with_step() -> (AppState, CaseId, ChecklistStepId) {
        let store = SqliteStore::open_in_memory().expect("open store");
        let tenant_id = TenantId::generate();
        let now = Timestamp::now();
        let case = Case {
            id: CaseId::generate(),
            tenant_id,
            company_id: CompanyId::generate(),
            vendor_id: VendorId::generate(),
            case_type: CaseType::Invoice,
            subject: "waive test".to_string(),
            status: CaseStatus::WaitingInternal,
            owner_team: OwnerTeam::AccountsPayable,
            assigned_user_id: None,
            sla_due_at: None,
            last_posture: None,
            escalation_level: 0,
            metadata: BTreeMap::new(),
            linked_invoice_id: None,
            created_at: now,
            updated_at: now,
        };
        let case_id = case.id;
        store.insert_case(case).await.expect("insert case");

        let step = ChecklistStep {
            id: ChecklistStepId::generate(),
            case_id,
            label: "GRN".to_string(),
            required_type: EvidenceType::Grn,
            status: StepStatus::Pending,
            rejection_reason: None,
        };
        let step_id = step.id;
        store.insert_missing_steps(vec![step]).await.expect("insert step");

        let state = AppState::new(
            Arc::new(store),
            Arc::new(LocalObjectStore::new("/tmp/vmp-checklist-tests", "http://localhost/blobs", b"k".to_vec())),
            Arc::new(CompositeDispatcher::new(Vec::new())),
            Arc::new(VmpConfig::default()),
            Arc::new(TenantOverrides::default()),
        );
        (state, case_id, step_id)
    }

    fn internal_actor(tenant_id: TenantId) -> vmp_core::model::actor::Actor {
        vmp_core::model::actor::Actor {
            user_id: vmp_core::ids::UserId::generate(),
            tenant_id,
            role: vmp_core::model::actor::ActorRole::Internal,
            vendor_id: None,
        }
    }

    #[tokio::test]
    async fn waive_marks_the_step_waived_and_is_sticky_against_reconciliation() {
        let (state, case_id, step_id) = seeded_case_with_step().await;
        let case = state.store.get_case(case_id).await.expect("get case");
        let actor = internal_actor(case.tenant_id);

        let Json(step) = waive_step(State(state.clone()), ActorExtractor(actor), Path((case_id, step_id)))
            .await
            .expect("internal actor may waive");
        assert_eq!(step.status, StepStatus::Waived);

        let steps = state.store.list_steps(case_id).await.expect("list steps");
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].status, StepStatus::Waived);

        // The sole step is now waived and excluded from "all verified";
        // recommended_case_status sees no non-waived steps and leaves the
        // case status untouched rather than resolving it.
        let case = state.store.get_case(case_id).await.expect("get case");
        assert_eq!(case.status, CaseStatus::WaitingInternal);
    }
}
