// crates/vmp-http/src/evidence.rs
// ============================================================================
// Module: Evidence Vault Routes
// Description: Multipart upload, listing with signed URLs, and checklist
//              reconciliation after an upload (spec.md §4.4, §6).
// Dependencies: axum (multipart), vmp-core, vmp-objectstore
// ============================================================================

//! ## Overview
//! Upload follows the Evidence Vault's atomicity sequence (spec.md §4.4):
//! digest, upload to the object store under create-only semantics, insert
//! the row, then reconcile the checklist. If the row insert fails after the
//! blob is already written, the blob is deleted best-effort and the failure
//! is logged, not surfaced — the orphaned blob costs nothing and a second
//! upload attempt simply gets the next version. Listing issues one signed
//! URL per evidence row concurrently: a page of evidence generates all of
//! its signed URLs as one batch of concurrent requests, not a sequential
//! loop (spec.md §5).

use axum::Json;
use axum::extract::Multipart;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use futures::future::try_join_all;
use serde::Serialize;
use vmp_core::CoreError;
use vmp_core::auth::require_same_tenant;
use vmp_core::auth::require_vendor_scope;
use vmp_core::case::validate_transition;
use vmp_core::checklist::on_evidence_uploaded;
use vmp_core::checklist::recommended_case_status;
use vmp_core::evidence::next_version;
use vmp_core::evidence::parse_evidence_type;
use vmp_core::evidence::sha256_hex;
use vmp_core::evidence::storage_key;
use vmp_core::evidence::validate_upload;
use vmp_core::ids::CaseId;
use vmp_core::ids::ChecklistStepId;
use vmp_core::ids::EvidenceId;
use vmp_core::model::actor::Actor;
use vmp_core::model::checklist::EvidenceType;
use vmp_core::model::evidence::Evidence;
use vmp_core::model::thread::SenderParty;
use vmp_core::thread::system_message;
use vmp_core::time::Timestamp;

use crate::deadline::with_deadline;
use crate::error::ApiError;
use crate::session::ActorExtractor;
use crate::state::AppState;

fn db_deadline(state: &AppState) -> std::time::Duration {
    std::time::Duration::from_secs(state.config.server.db_deadline_secs)
}

fn upload_deadline(state: &AppState) -> std::time::Duration {
    std::time::Duration::from_secs(state.config.server.upload_deadline_secs)
}

fn signed_url_deadline(state: &AppState) -> std::time::Duration {
    std::time::Duration::from_secs(state.config.server.signed_url_deadline_secs)
}

// ============================================================================
// SECTION: List
// ============================================================================

/// One evidence row paired with a time-bounded signed read URL.
#[derive(Debug, Serialize)]
pub struct EvidenceWithUrl {
    /// The evidence row.
    #[serde(flatten)]
    pub evidence: Evidence,
    /// Signed URL the caller can fetch the blob from.
    pub signed_url: String,
    /// When the signed URL expires.
    pub signed_url_expires_at: Timestamp,
}

/// `GET /cases/{id}/evidence` (spec.md §6, §4.4 Read).
pub async fn list_evidence(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path(case_id): Path<CaseId>,
) -> Result<Json<Vec<EvidenceWithUrl>>, ApiError> {
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;
    require_vendor_scope(&actor, case.vendor_id).map_err(ApiError)?;

    let rows = with_deadline(db_deadline(&state), state.store.list_evidence(case_id)).await?;
    let lifetime_secs = i64::try_from(state.config.object_store.signed_url_lifetime_secs).unwrap_or(i64::MAX);
    let lifetime = time::Duration::seconds(lifetime_secs);

    let with_urls = try_join_all(rows.into_iter().map(|evidence| {
        let state = state.clone();
        async move {
            let signed =
                with_deadline(signed_url_deadline(&state), state.objects.signed_url(&evidence.storage_path, lifetime))
                    .await?;
            Ok::<_, CoreError>(EvidenceWithUrl {
                evidence,
                signed_url: signed.url,
                signed_url_expires_at: signed.expires_at,
            })
        }
    }))
    .await?;
    Ok(Json(with_urls))
}

// ============================================================================
// SECTION: Upload
// ============================================================================

/// The fields collected out of an upload's multipart body before
/// validation; `file` carries the declared filename, content type, and
/// bytes together since all three come off the same field.
#[derive(Default)]
struct UploadFields {
    evidence_type: Option<EvidenceType>,
    checklist_step_id: Option<ChecklistStepId>,
    filename: Option<String>,
    mime_type: Option<String>,
    bytes: Option<Vec<u8>>,
}

async fn collect_upload_fields(multipart: &mut Multipart) -> Result<UploadFields, ApiError> {
    let mut fields = UploadFields::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError(CoreError::validation(format!("malformed multipart body: {error}"))))?
    {
        match field.name().unwrap_or_default() {
            "evidence_type" => {
                let text = field.text().await.map_err(|error| ApiError(CoreError::validation(error.to_string())))?;
                fields.evidence_type = Some(parse_evidence_type(text.trim()).map_err(ApiError)?);
            }
            "checklist_step_id" => {
                let text = field.text().await.map_err(|error| ApiError(CoreError::validation(error.to_string())))?;
                if !text.trim().is_empty() {
                    let parsed: ChecklistStepId = text
                        .trim()
                        .parse()
                        .map_err(|_| ApiError(CoreError::validation("malformed checklist_step_id")))?;
                    fields.checklist_step_id = Some(parsed);
                }
            }
            "file" => {
                fields.filename = field.file_name().map(str::to_string);
                fields.mime_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|error| ApiError(CoreError::validation(error.to_string())))?;
                fields.bytes = Some(data.to_vec());
            }
            _ => {}
        }
    }
    Ok(fields)
}

/// `POST /cases/{id}/evidence` (spec.md §6, §4.4 Upload).
pub async fn upload_evidence(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path(case_id): Path<CaseId>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Evidence>), ApiError> {
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;
    require_vendor_scope(&actor, case.vendor_id).map_err(ApiError)?;

    let evidence = upload_evidence_for_case(&state, case_id, &actor, &mut multipart).await?;
    Ok((StatusCode::CREATED, Json(evidence)))
}

/// Runs the digest/upload/insert/reconcile sequence (spec.md §4.4
/// Atomicity & cleanup) for a multipart body already known to belong to
/// `case_id`; the caller is responsible for tenant/vendor authorization.
/// Shared by the case-level upload route and the SOA line evidence route
/// (spec.md §4.6 `upload_line_evidence`), which attaches to the line's
/// case rather than a case looked up directly from the path.
pub(crate) async fn upload_evidence_for_case(
    state: &AppState,
    case_id: CaseId,
    actor: &Actor,
    multipart: &mut Multipart,
) -> Result<Evidence, ApiError> {
    let fields = collect_upload_fields(multipart).await?;
    let evidence_type = fields.evidence_type.ok_or_else(|| ApiError(CoreError::validation("missing evidence_type field")))?;
    let filename = fields.filename.ok_or_else(|| ApiError(CoreError::validation("missing file field")))?;
    let mime_type = fields.mime_type.ok_or_else(|| ApiError(CoreError::validation("file field carries no content type")))?;
    let bytes = fields.bytes.ok_or_else(|| ApiError(CoreError::validation("missing file field")))?;
    let size_bytes = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    validate_upload(&mime_type, size_bytes).map_err(ApiError)?;

    let existing_versions =
        with_deadline(db_deadline(state), state.store.evidence_versions(case_id, evidence_type)).await?;
    let version = next_version(&existing_versions);
    let now = Timestamp::now();
    let key = storage_key(case_id, evidence_type, now, version, &filename);

    with_deadline(upload_deadline(state), state.objects.put(&key, &mime_type, bytes.clone())).await?;

    let evidence = Evidence {
        id: EvidenceId::generate(),
        case_id,
        checklist_step_id: fields.checklist_step_id,
        evidence_type,
        version,
        original_filename: filename,
        mime_type,
        size_bytes,
        storage_path: key.clone(),
        sha256_digest: sha256_hex(&bytes),
        uploader_user_id: actor.user_id,
        uploader_party: if actor.is_internal() { SenderParty::Internal } else { SenderParty::Vendor },
        created_at: now,
    };

    if let Err(insert_error) = with_deadline(db_deadline(state), state.store.insert_evidence(evidence.clone())).await {
        if let Err(cleanup_error) = state.objects.delete(&key).await {
            tracing::warn!(error = %cleanup_error, key = %key, "best-effort object cleanup failed after evidence insert error");
        }
        return Err(ApiError(insert_error));
    }

    reconcile_after_evidence(state, case_id, evidence_type, &evidence, now).await?;

    Ok(evidence)
}

/// Applies the evidence-uploaded step transition to every step whose
/// required type matches, then reconciles the case status the same way a
/// checklist verdict does (spec.md §4.3 status reconciliation).
///
/// # Errors
///
/// Returns an error, rather than silently skipping the reconciliation, if
/// the checklist's recommended status is not a legal transition from the
/// case's current status (spec.md §4.1).
async fn reconcile_after_evidence(
    state: &AppState,
    case_id: CaseId,
    evidence_type: EvidenceType,
    evidence: &Evidence,
    now: Timestamp,
) -> Result<(), ApiError> {
    let mut steps = with_deadline(db_deadline(state), state.store.list_steps(case_id)).await?;
    let mut touched = false;
    for step in &mut steps {
        if step.required_type == evidence_type {
            step.status = on_evidence_uploaded(step.status);
            with_deadline(db_deadline(state), state.store.update_step(step.clone())).await?;
            touched = true;
        }
    }
    if !touched {
        return Ok(());
    }

    let statuses: Vec<_> = steps.iter().map(|step| step.status).collect();
    let mut case = with_deadline(db_deadline(state), state.store.get_case(case_id)).await?;
    if let Some(recommended) = recommended_case_status(&statuses) {
        if recommended != case.status {
            validate_transition(case.status, recommended).map_err(ApiError)?;
            case.status = recommended;
        }
    }
    case.updated_at = now;
    with_deadline(db_deadline(state), state.store.update_case(case.clone())).await?;
    crate::cases::apply_bank_details_change_on_resolve(state, &case).await?;

    let note = system_message(
        case_id,
        format!("evidence uploaded: {} v{}", vmp_core::evidence::evidence_type_key(evidence_type), evidence.version),
        now,
    );
    with_deadline(db_deadline(state), state.store.insert_message(note)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_conversion_never_panics_on_empty_upload() {
        assert_eq!(u64::try_from(Vec::<u8>::new().len()).unwrap_or(u64::MAX), 0);
    }
}
