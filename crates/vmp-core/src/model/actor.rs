// crates/vmp-core/src/model/actor.rs
// ============================================================================
// Module: VMP User, Session, and Actor
// Description: Authentication-adjacent data shapes and the resolved actor.
// Purpose: Data shapes for User and Session (spec.md §3); Actor is the
//          in-memory resolution of a session into a scoped caller.
// ============================================================================

//! ## Overview
//! [`User`] and [`Session`] are persisted rows. [`Actor`] is never persisted;
//! it is the result of resolving a session (§4.1 Identity & Session) and is
//! what every other component's operations take as the acting caller.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ids::SessionId;
use crate::ids::TenantId;
use crate::ids::UserId;
use crate::ids::VendorId;
use crate::time::Timestamp;

/// An actor in the system: an internal operator, or a supplier user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier.
    pub id: UserId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Email address; unique case-insensitively within a tenant.
    pub email: String,
    /// Human display name.
    pub display_name: String,
    /// Password digest (Argon2 PHC string; see SPEC_FULL.md §4).
    pub password_digest: String,
    /// True for internal operations staff, false for supplier users.
    pub internal: bool,
    /// Whether the account can currently authenticate.
    pub active: bool,
    /// Non-null if and only if `internal` is false.
    pub vendor_id: Option<VendorId>,
}

impl User {
    /// Validates the supplier/internal vendor-scope invariant.
    #[must_use]
    pub const fn vendor_scope_is_consistent(&self) -> bool {
        self.internal == self.vendor_id.is_none()
    }
}

/// An opaque, relationally stored session (never held in process memory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Identifier, sent to the client as an opaque cookie value.
    pub id: SessionId,
    /// Owning user.
    pub user_id: UserId,
    /// Expiry timestamp.
    pub expires_at: Timestamp,
    /// Free-form session data.
    pub data: BTreeMap<String, Value>,
}

impl Session {
    /// Returns whether the session is still valid at the given instant.
    #[must_use]
    pub fn is_live_at(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }
}

/// The role set an actor carries; internal staff have no vendor scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Internal operations staff: procurement, AP, finance.
    Internal,
    /// Supplier-side user, scoped to exactly one vendor.
    Supplier,
}

/// The resolved caller behind a request: tenant, role, and (if supplier)
/// vendor scope (glossary "Actor").
///
/// # Invariants
/// - `role == Supplier` if and only if `vendor_id.is_some()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Acting user.
    pub user_id: UserId,
    /// Tenant the actor is scoped to.
    pub tenant_id: TenantId,
    /// Internal vs. supplier role.
    pub role: ActorRole,
    /// Vendor scope, present only for supplier actors.
    pub vendor_id: Option<VendorId>,
}

impl Actor {
    /// Returns whether this actor is internal operations staff.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self.role, ActorRole::Internal)
    }

    /// Builds the actor implied by a user row.
    #[must_use]
    pub const fn from_user(user: &User) -> Self {
        let role = if user.internal { ActorRole::Internal } else { ActorRole::Supplier };
        Self { user_id: user.id, tenant_id: user.tenant_id, role, vendor_id: user.vendor_id }
    }
}
