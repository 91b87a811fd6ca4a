// crates/vmp-http/src/notifications.rs
// ============================================================================
// Module: Notification Dispatch
// Description: Resolves the recipient(s) for a notification emission point
//              and drives insert + delivery (spec.md §4.7).
// Dependencies: vmp-core, vmp-notify
// ============================================================================

//! ## Overview
//! `vmp-core::notify` only builds drafts from an explicit recipient id; it
//! has no I/O and cannot resolve "the other party" itself. This module is
//! the resolution step: given a case and the actor who triggered the
//! emission point, it determines who should receive the notification,
//! persists a row per recipient, and hands each off to the configured
//! sink. Delivery failures are logged by the sink and never fail the
//! triggering request (spec.md §4.7 "downstream delivery... is an
//! out-of-scope transport consumer").

use vmp_core::CoreError;
use vmp_core::ids::UserId;
use vmp_core::model::actor::Actor;
use vmp_core::model::case::Case;
use vmp_core::model::notification::Notification;
use vmp_core::notify::NotificationDraft;
use vmp_core::time::Timestamp;

use crate::deadline::with_deadline;
use crate::state::AppState;

fn db_deadline(state: &AppState) -> std::time::Duration {
    std::time::Duration::from_secs(state.config.server.db_deadline_secs)
}

/// Persists and delivers one notification draft.
async fn dispatch(state: &AppState, draft: NotificationDraft) -> Result<(), CoreError> {
    let notification = Notification {
        id: vmp_core::ids::NotificationId::generate(),
        user_id: draft.user_id,
        case_id: draft.case_id,
        kind: draft.kind,
        title: draft.title,
        body: draft.body,
        read: false,
        created_at: Timestamp::now(),
    };
    with_deadline(db_deadline(state), state.store.insert_notification(notification.clone())).await?;
    if let Err(error) = state.notifier.deliver(&notification).await {
        tracing::warn!(error = %error, user_id = %notification.user_id, "notification delivery failed");
    }
    Ok(())
}

/// Resolves the recipients on the opposite side of `actor` for `case` and
/// dispatches one draft per recipient, built by `make_draft` (spec.md §4.2
/// "notify the other side", §4.7 emission points).
///
/// An internal actor's counterpart is every active portal user scoped to
/// the case's vendor; a supplier actor's counterpart is the case's
/// assigned internal user, if one is set. Neither side resolving to a
/// recipient is not an error: a vendor with no portal users yet, or a
/// case not yet assigned, simply emits nothing.
pub async fn notify_other_party<F>(state: &AppState, case: &Case, actor: &Actor, make_draft: F) -> Result<(), CoreError>
where
    F: Fn(UserId) -> NotificationDraft,
{
    let recipients: Vec<UserId> = if actor.is_internal() {
        with_deadline(db_deadline(state), state.store.list_active_users_by_vendor(case.vendor_id))
            .await?
            .into_iter()
            .map(|user| user.id)
            .collect()
    } else {
        case.assigned_user_id.into_iter().collect()
    };
    for recipient in recipients {
        dispatch(state, make_draft(recipient)).await?;
    }
    Ok(())
}

/// Dispatches a draft straight to a resolved recipient, for emission
/// points that already know who to notify (escalation, evidence verdicts,
/// SOA sign-off).
pub async fn notify_user(state: &AppState, recipient: UserId, draft: NotificationDraft) -> Result<(), CoreError> {
    debug_assert_eq!(draft.user_id, recipient);
    dispatch(state, draft).await
}
