// crates/vmp-core/src/ids.rs
// ============================================================================
// Module: VMP Identifiers
// Description: Opaque, strongly typed identifiers for every persisted entity.
// Purpose: Prevent cross-entity id confusion at compile time; stable wire form.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Every persisted entity (tenant, case, message, evidence, ...) is identified
//! by a newtype wrapping a [`Uuid`]. Identifiers are opaque: callers never
//! construct one from an integer or inspect its internal bytes, only parse
//! from string or generate fresh. This keeps a case id and an evidence id
//! from being accidentally interchangeable even though both are UUIDs.
//!
//! Invariants:
//! - An identifier's wire form is always its lowercase hyphenated UUID string.
//! - `generate` never returns the nil UUID.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares an opaque UUID-backed identifier newtype with a validated
/// constructor, `Display`, and `FromStr`.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh, random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID as this identifier type.
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Root isolation unit; all other entities carry a tenant id.
    TenantId
);
uuid_id!(
    /// Legal entity within a tenant.
    CompanyId
);
uuid_id!(
    /// Supplier master record.
    VendorId
);
uuid_id!(
    /// An actor: an internal operator or a supplier-scoped user.
    UserId
);
uuid_id!(
    /// Opaque session identifier stored in the relational store, never in process memory.
    SessionId
);
uuid_id!(
    /// The central collaboration unit between a supplier and an internal team.
    CaseId
);
uuid_id!(
    /// Immutable thread entry on a case.
    MessageId
);
uuid_id!(
    /// Required evidence slot on a case.
    ChecklistStepId
);
uuid_id!(
    /// Versioned evidence blob linked to a case.
    EvidenceId
);
uuid_id!(
    /// Shadow-ledger invoice record.
    InvoiceId
);
uuid_id!(
    /// Line extracted from a vendor statement of account.
    SoaLineId
);
uuid_id!(
    /// Link between a SOA line and a shadow-ledger invoice.
    SoaMatchId
);
uuid_id!(
    /// Discrepancy raised against a SOA line.
    SoaIssueId
);
uuid_id!(
    /// Notification row delivered to a user.
    NotificationId
);

#[cfg(test)]
mod tests {
    use super::CaseId;
    use super::EvidenceId;

    #[test]
    fn generated_ids_are_not_nil() {
        let id = CaseId::generate();
        assert_ne!(id.as_uuid(), uuid::Uuid::nil());
    }

    #[test]
    fn round_trips_through_string() {
        let id = EvidenceId::generate();
        let parsed: EvidenceId = id.to_string().parse().expect("valid uuid text");
        assert_eq!(id, parsed);
    }

    #[test]
    fn distinct_id_types_do_not_compare() {
        // Compile-time property: CaseId and EvidenceId are distinct types,
        // so `CaseId::generate() == EvidenceId::generate()` would not type check.
        let case = CaseId::generate();
        let evidence = EvidenceId::generate();
        assert_ne!(case.to_string(), evidence.to_string());
    }
}
