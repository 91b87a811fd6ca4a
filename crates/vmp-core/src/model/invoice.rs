// crates/vmp-core/src/model/invoice.rs
// ============================================================================
// Module: VMP Invoice (shadow ledger)
// Description: Internal invoice record used as the reconciliation target
//              for SOA matching (spec.md §3, §4.6).
// ============================================================================

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde::Serialize;

use crate::ids::CompanyId;
use crate::ids::InvoiceId;
use crate::ids::TenantId;
use crate::ids::VendorId;
use crate::time::Timestamp;

/// Where an invoice entered the shadow ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceSource {
    /// Entered by hand through the API/UI.
    Manual,
    /// Synced from an external ERP.
    Erp,
}

/// Lifecycle status of a shadow-ledger invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Not yet matched to any SOA line.
    Pending,
    /// Matched to at least one SOA line.
    Matched,
    /// Paid.
    Paid,
    /// Under dispute.
    Disputed,
    /// Cancelled.
    Cancelled,
}

/// Internal record of an invoice, independent of any external ERP.
///
/// # Invariants
/// - `(vendor_id, company_id, invoice_number)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Identifier.
    pub id: InvoiceId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Company the invoice was billed to.
    pub company_id: CompanyId,
    /// Vendor that issued the invoice.
    pub vendor_id: VendorId,
    /// Invoice number as printed by the vendor.
    pub invoice_number: String,
    /// Invoice date.
    pub invoice_date: Timestamp,
    /// Invoice amount.
    pub amount: BigDecimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Purchase-order reference, if any.
    pub po_reference: Option<String>,
    /// Goods-received-note reference, if any.
    pub grn_reference: Option<String>,
    /// Lifecycle status.
    pub status: InvoiceStatus,
    /// Ingest source.
    pub source: InvoiceSource,
}
