// crates/vmp-core/src/auth.rs
// ============================================================================
// Module: VMP Identity & Session Authorization
// Description: Tenant, vendor-scope, and internal-only authorization checks
//              (spec.md §4.1 Authorization, §8 cross-tenant invariant).
// Dependencies: crate::model, crate::error
// ============================================================================

//! ## Overview
//! Authorization here is a set of small, composable checks the other
//! components call before performing an effect. It never mutates state and
//! never touches a store; it only decides whether an actor's scope covers
//! a target tenant or vendor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::error::CoreError;
use crate::ids::TenantId;
use crate::ids::VendorId;
use crate::model::actor::Actor;
use crate::model::actor::ActorRole;

/// Validates that an actor's tenant matches the target tenant
/// (spec.md §8: "cross-tenant reads return empty; no operation by an
/// actor of tenant A observes or mutates an entity of tenant B").
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] (never `Authorization`) on mismatch, so
/// the caller cannot distinguish "wrong tenant" from "does not exist"
/// (spec.md §7: "user-facing text never reveals whether a tenant/vendor
/// exists").
pub fn require_same_tenant(actor: &Actor, target_tenant: TenantId) -> Result<(), CoreError> {
    if actor.tenant_id == target_tenant {
        Ok(())
    } else {
        Err(CoreError::not_found("entity not found in caller's scope"))
    }
}

/// Validates that a supplier actor's vendor scope covers the target
/// vendor. Internal actors always pass.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if a supplier actor's vendor does not
/// match.
pub fn require_vendor_scope(actor: &Actor, target_vendor: VendorId) -> Result<(), CoreError> {
    match actor.role {
        ActorRole::Internal => Ok(()),
        ActorRole::Supplier => {
            if actor.vendor_id == Some(target_vendor) {
                Ok(())
            } else {
                Err(CoreError::not_found("entity not found in caller's scope"))
            }
        }
    }
}

/// Validates that the actor is internal staff (spec.md §4.1: transitions
/// to resolved/rejected/blocked/cancelled, reassignment, evidence
/// verdicts, invoice ingest, and SOA sign-off are internal-only).
///
/// # Errors
///
/// Returns [`CoreError::Authorization`] for supplier actors.
pub fn require_internal(actor: &Actor) -> Result<(), CoreError> {
    if actor.is_internal() {
        Ok(())
    } else {
        Err(CoreError::authorization("this action requires an internal actor"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;

    fn internal_actor(tenant: TenantId) -> Actor {
        Actor { user_id: UserId::generate(), tenant_id: tenant, role: ActorRole::Internal, vendor_id: None }
    }

    fn supplier_actor(tenant: TenantId, vendor: VendorId) -> Actor {
        Actor { user_id: UserId::generate(), tenant_id: tenant, role: ActorRole::Supplier, vendor_id: Some(vendor) }
    }

    #[test]
    fn cross_tenant_is_not_found_not_authorization() {
        let actor = internal_actor(TenantId::generate());
        let other_tenant = TenantId::generate();
        let err = require_same_tenant(&actor, other_tenant).expect_err("mismatched tenant");
        assert_eq!(err.reason(), "not_found");
    }

    #[test]
    fn supplier_scoped_to_own_vendor_only() {
        let tenant = TenantId::generate();
        let vendor = VendorId::generate();
        let actor = supplier_actor(tenant, vendor);
        assert!(require_vendor_scope(&actor, vendor).is_ok());
        assert!(require_vendor_scope(&actor, VendorId::generate()).is_err());
    }

    #[test]
    fn internal_actor_bypasses_vendor_scope() {
        let actor = internal_actor(TenantId::generate());
        assert!(require_vendor_scope(&actor, VendorId::generate()).is_ok());
    }

    #[test]
    fn internal_only_gate_rejects_suppliers() {
        let tenant = TenantId::generate();
        let supplier = supplier_actor(tenant, VendorId::generate());
        assert!(require_internal(&supplier).is_err());
        assert!(require_internal(&internal_actor(tenant)).is_ok());
    }
}
