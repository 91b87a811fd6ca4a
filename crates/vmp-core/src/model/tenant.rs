// crates/vmp-core/src/model/tenant.rs
// ============================================================================
// Module: VMP Tenant / Company / Vendor Records
// Description: Root isolation unit and the entities scoped beneath it.
// Purpose: Data shapes for Tenant, Company, Vendor, and the vendor-company
//          authorization link (spec.md §3).
// ============================================================================

//! ## Overview
//! A [`Tenant`] is the top-level isolation boundary: no operation crosses
//! tenants. [`Company`] and [`Vendor`] both carry a tenant id and are never
//! read or written across tenant scope.

use serde::Deserialize;
use serde::Serialize;

use crate::ids::CompanyId;
use crate::ids::TenantId;
use crate::ids::VendorId;

/// Root isolation unit; all other entities carry a tenant id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Identifier.
    pub id: TenantId,
    /// Human-facing display name.
    pub display_name: String,
}

/// Legal entity within a tenant.
///
/// # Invariants
/// - `(tenant_id, name)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Identifier.
    pub id: CompanyId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Legal name.
    pub name: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
}

/// Vendor classification, fixed at onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorType {
    /// A sole proprietor or natural-person supplier.
    Individual,
    /// A domestic corporate entity.
    Corporate,
    /// A vendor domiciled outside the company's home jurisdiction.
    International,
    /// A corporate vendor domiciled in the company's home jurisdiction.
    Domestic,
}

/// Bank details a vendor is paid against.
///
/// # Invariants
/// - Changes flow only through the bank-details-change case workflow
///   (§4.1); this type itself performs no workflow enforcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    /// Name on the bank account.
    pub account_name: String,
    /// Account number.
    pub account_number: String,
    /// Bank name.
    pub bank_name: String,
    /// SWIFT/BIC code.
    pub swift: String,
}

/// Supplier master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    /// Identifier.
    pub id: VendorId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub display_name: String,
    /// Vendor classification.
    pub vendor_type: VendorType,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
    /// Current bank details.
    pub bank_details: BankDetails,
}

/// Many-to-many authorization link between a vendor and a company.
///
/// # Invariants
/// - `(vendor_id, company_id)` is unique.
/// - A vendor may submit documents only for companies it is linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorCompanyLink {
    /// Linked vendor.
    pub vendor_id: VendorId,
    /// Linked company.
    pub company_id: CompanyId,
}
