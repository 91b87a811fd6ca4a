// crates/vmp-http/src/messages.rs
// ============================================================================
// Module: Thread Routes
// Description: Append/list the per-case message thread (spec.md §4.2, §6).
// Dependencies: axum, vmp-core
// ============================================================================

//! ## Overview
//! Posting a message derives the sender party from the caller, validates
//! the internal-note flag, applies the waiting-side toggle convenience
//! rule, and notifies the other party. Listing filters out internal notes
//! for supplier actors at the handler layer so the invariant holds
//! regardless of what the store returns.

use axum::Json;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use vmp_core::auth::require_same_tenant;
use vmp_core::auth::require_vendor_scope;
use vmp_core::ids::CaseId;
use vmp_core::ids::MessageId;
use vmp_core::model::case::CaseStatus;
use vmp_core::model::thread::ChannelSource;
use vmp_core::model::thread::Message;
use vmp_core::notify::new_message_draft;
use vmp_core::thread::sender_party_for;
use vmp_core::thread::validate_body;
use vmp_core::thread::validate_internal_note;
use vmp_core::thread::visible_to_supplier;
use vmp_core::thread::waiting_side_toggle;
use vmp_core::time::Timestamp;

use crate::deadline::with_deadline;
use crate::error::ApiError;
use crate::notifications::notify_other_party;
use crate::session::ActorExtractor;
use crate::state::AppState;

fn db_deadline(state: &AppState) -> std::time::Duration {
    std::time::Duration::from_secs(state.config.server.db_deadline_secs)
}

/// Lists a case's thread (spec.md §6 `GET /cases/{id}/messages`).
pub async fn list_messages(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path(case_id): Path<CaseId>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;
    require_vendor_scope(&actor, case.vendor_id).map_err(ApiError)?;

    let messages = with_deadline(db_deadline(&state), state.store.list_messages(case_id)).await?;
    let visible = messages
        .into_iter()
        .filter(|message| actor.is_internal() || visible_to_supplier(message.internal_note))
        .collect();
    Ok(Json(visible))
}

/// `POST /cases/{id}/messages` request body.
#[derive(Debug, Deserialize)]
pub struct AppendMessageRequest {
    /// Message text, trimmed and size-checked (spec.md §4.2).
    pub body: String,
    /// Internal-note flag; rejected for supplier actors.
    #[serde(default)]
    pub internal_note: bool,
}

/// Appends a message, applies the waiting-side toggle, and notifies the
/// other party (spec.md §4.2, §6 `POST /cases/{id}/messages`).
pub async fn append_message(
    State(state): State<AppState>,
    ActorExtractor(actor): ActorExtractor,
    Path(case_id): Path<CaseId>,
    Json(request): Json<AppendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let mut case = with_deadline(db_deadline(&state), state.store.get_case(case_id)).await?;
    require_same_tenant(&actor, case.tenant_id).map_err(ApiError)?;
    require_vendor_scope(&actor, case.vendor_id).map_err(ApiError)?;

    let body = validate_body(&request.body).map_err(ApiError)?;
    validate_internal_note(&actor, request.internal_note).map_err(ApiError)?;

    let now = Timestamp::now();
    let message = Message {
        id: MessageId::generate(),
        case_id,
        sender_user_id: Some(actor.user_id),
        sender_party: sender_party_for(&actor),
        channel_source: ChannelSource::Portal,
        body,
        created_at: now,
        internal_note: request.internal_note,
    };
    with_deadline(db_deadline(&state), state.store.insert_message(message.clone())).await?;

    if let Some(toggled) = waiting_side_toggle(&actor, case.status) {
        case.status = toggled;
    }
    case.updated_at = now;
    with_deadline(db_deadline(&state), state.store.update_case(case.clone())).await?;

    if !message.internal_note {
        notify_other_party(&state, &case, &actor, |recipient| new_message_draft(recipient, case_id)).await?;
    }

    Ok((StatusCode::CREATED, Json(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_side_toggle_is_none_for_same_party() {
        use vmp_core::ids::TenantId;
        use vmp_core::ids::UserId;
        use vmp_core::model::actor::Actor;
        use vmp_core::model::actor::ActorRole;

        let internal = Actor { user_id: UserId::generate(), tenant_id: TenantId::generate(), role: ActorRole::Internal, vendor_id: None };
        assert_eq!(waiting_side_toggle(&internal, CaseStatus::Open), None);
    }
}
