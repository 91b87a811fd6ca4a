// crates/vmp-cli/src/ticker.rs
// ============================================================================
// Module: SLA Ticker
// Description: The periodic sweep of spec.md §4.7: scans non-terminal
//              cases in every tenant, fires a notification exactly once
//              per SLA posture transition, and records the posture it
//              last observed.
// Dependencies: tokio, vmp-core, vmp-http, vmp-config
// ============================================================================

//! ## Overview
//! `vmp_core::case::Case::posture` and `vmp_core::notify::sla_posture_draft`
//! already contain every decision this sweep needs (spec.md §9 "a
//! single, table-driven rule function"); this module is only the loop
//! that calls them once per tenant per tick and persists the result.
//! [`run`] never returns; a single tenant's or case's failure is logged
//! and the sweep continues (spec.md §7 "SLA Ticker errors on one case do
//! not abort the sweep").

use std::time::Duration;

use vmp_core::model::case::Case;
use vmp_core::notify;
use vmp_core::time::Timestamp;
use vmp_http::state::AppState;

/// Runs the SLA Ticker sweep on `state.config.policy.sla_ticker_interval_secs`
/// cadence until the process is terminated.
pub async fn run(state: AppState) -> ! {
    let interval = Duration::from_secs(state.config.policy.sla_ticker_interval_secs.max(1));
    let mut ticks = tokio::time::interval(interval);
    // The first tick fires immediately; skip it so startup doesn't race
    // a freshly-opened store before its first real interval elapses.
    ticks.tick().await;
    loop {
        ticks.tick().await;
        sweep(&state).await;
    }
}

/// Runs a single sweep across every tenant.
async fn sweep(state: &AppState) {
    let tenants = match state.store.list_tenant_ids().await {
        Ok(tenants) => tenants,
        Err(error) => {
            tracing::error!(%error, "sla ticker: listing tenants failed, skipping this tick");
            return;
        }
    };
    for tenant in tenants {
        sweep_tenant(state, tenant).await;
    }
}

/// Runs the sweep for a single tenant; one case's failure does not abort
/// the remaining cases in this tenant or the rest of the sweep.
async fn sweep_tenant(state: &AppState, tenant: vmp_core::ids::TenantId) {
    let cases = match state.store.list_non_terminal_cases(tenant).await {
        Ok(cases) => cases,
        Err(error) => {
            tracing::error!(%error, %tenant, "sla ticker: listing cases failed, skipping this tenant");
            return;
        }
    };
    let now = Timestamp::now();
    for case in cases {
        if let Err(error) = sweep_case(state, case, now).await {
            tracing::error!(%error, "sla ticker: case sweep failed, continuing sweep");
        }
    }
}

/// Recomputes one case's posture, fires a notification on a transition,
/// and persists the new posture so the next tick only fires again on a
/// further change (spec.md §4.7 "idempotent... only fires on change").
async fn sweep_case(state: &AppState, mut case: Case, now: Timestamp) -> Result<(), vmp_core::CoreError> {
    let current = case.posture(now);
    let last = case.last_posture;
    if let Some(recipient) = case.assigned_user_id {
        if let Some(draft) = notify::sla_posture_draft(recipient, case.id, last, current) {
            vmp_http::notifications::notify_user(state, recipient, draft).await?;
        }
    }
    if last != Some(current) {
        case.last_posture = Some(current);
        state.store.update_case(case).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use vmp_config::TenantOverrides;
    use vmp_config::VmpConfig;
    use vmp_core::ids::CaseId;
    use vmp_core::ids::CompanyId;
    use vmp_core::ids::TenantId;
    use vmp_core::ids::UserId;
    use vmp_core::ids::VendorId;
    use vmp_core::interfaces::CaseStore;
    use vmp_core::interfaces::IdentityStore;
    use vmp_core::interfaces::NotificationStore;
    use vmp_core::model::case::CaseStatus;
    use vmp_core::model::case::CaseType;
    use vmp_core::model::case::OwnerTeam;
    use vmp_core::model::case::SlaPosture;
    use vmp_core::model::tenant::BankDetails;
    use vmp_core::model::tenant::Company;
    use vmp_core::model::tenant::Tenant;
    use vmp_core::model::tenant::Vendor;
    use vmp_core::model::tenant::VendorType;
    use vmp_notify::CompositeDispatcher;
    use vmp_objectstore::LocalObjectStore;
    use vmp_store::SqliteStore;

    use super::*;

    async fn seeded_state() -> (AppState, CaseId) {
        let store = SqliteStore::open_in_memory().expect("open store");
        let tenant_id = TenantId::generate();
        store.insert_tenant(&Tenant { id: tenant_id, display_name: "Acme".to_string() }).expect("insert tenant");
        let company_id = CompanyId::generate();
        store
            .insert_company(&Company { id: company_id, tenant_id, name: "Acme Co".to_string(), country_code: "US".to_string() })
            .expect("insert company");
        let vendor_id = VendorId::generate();
        store
            .insert_vendor(&Vendor {
                id: vendor_id,
                tenant_id,
                display_name: "Vendor Inc".to_string(),
                vendor_type: VendorType::Corporate,
                country_code: "US".to_string(),
                bank_details: BankDetails {
                    account_name: "Vendor Inc".to_string(),
                    account_number: "123".to_string(),
                    bank_name: "First Bank".to_string(),
                    swift: "FIRBUS33".to_string(),
                },
            })
            .expect("insert vendor");
        store.link_vendor_company(vendor_id, company_id).expect("link");

        let assignee = UserId::generate();
        let now = Timestamp::now();
        let case = Case {
            id: CaseId::generate(),
            tenant_id,
            company_id,
            vendor_id,
            case_type: CaseType::Invoice,
            subject: "Overdue by construction".to_string(),
            status: CaseStatus::WaitingInternal,
            owner_team: OwnerTeam::AccountsPayable,
            assigned_user_id: Some(assignee),
            sla_due_at: Some(now.plus(time::Duration::seconds(-10))),
            last_posture: None,
            escalation_level: 0,
            metadata: BTreeMap::new(),
            linked_invoice_id: None,
            created_at: now,
            updated_at: now,
        };
        let case_id = case.id;
        store.insert_case(case).await.expect("insert case");

        let state = AppState::new(
            Arc::new(store),
            Arc::new(LocalObjectStore::new("/tmp/vmp-ticker-tests", "http://localhost/blobs", b"k".to_vec())),
            Arc::new(CompositeDispatcher::new(Vec::new())),
            Arc::new(VmpConfig::default()),
            Arc::new(TenantOverrides::default()),
        );
        (state, case_id)
    }

    #[tokio::test]
    async fn sweep_notifies_and_records_posture_on_first_tick() {
        let (state, case_id) = seeded_state().await;
        sweep(&state).await;

        let case = state.store.get_case(case_id).await.expect("get case");
        assert_eq!(case.last_posture, Some(SlaPosture::Overdue));

        let recipient = case.assigned_user_id.expect("assigned");
        let notifications = state.store.list_notifications(recipient).await.expect("list notifications");
        assert_eq!(notifications.len(), 1);
    }

    #[tokio::test]
    async fn second_tick_with_no_posture_change_does_not_renotify() {
        let (state, case_id) = seeded_state().await;
        sweep(&state).await;
        sweep(&state).await;

        let case = state.store.get_case(case_id).await.expect("get case");
        let recipient = case.assigned_user_id.expect("assigned");
        let notifications = state.store.list_notifications(recipient).await.expect("list notifications");
        assert_eq!(notifications.len(), 1, "posture held steady, ticker must not fire twice");
    }
}
