// crates/vmp-core/src/interfaces.rs
// ============================================================================
// Module: VMP Backend Interfaces
// Description: Backend-agnostic traits for relational storage, object
//              storage, and notification dispatch.
// Purpose: Define the contract surfaces `vmp-http`/`vmp-cli` consume without
//          embedding backend-specific details (spec.md §9 "injected store
//          handle").
// Dependencies: crate::model, crate::error, async-trait
// ============================================================================

//! ## Overview
//! `vmp-core` never performs I/O. Every persistence or delivery concern is a
//! trait here, implemented by `vmp-store` (relational), `vmp-objectstore`
//! (evidence blobs), and `vmp-notify` (notification sinks). Each trait is
//! one component's persistence surface, not one grab-bag interface, so a
//! caller that only needs evidence storage does not depend on SOA-matching
//! methods.
//!
//! Security posture: implementations consume untrusted inputs resolved
//! from HTTP requests; they must fail closed on missing or malformed data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::CoreError;
use crate::ids::CaseId;
use crate::ids::CompanyId;
use crate::ids::EvidenceId;
use crate::ids::SessionId;
use crate::ids::SoaIssueId;
use crate::ids::SoaLineId;
use crate::ids::TenantId;
use crate::ids::UserId;
use crate::ids::VendorId;
use crate::model::actor::Session;
use crate::model::actor::User;
use crate::model::case::Case;
use crate::model::case::CaseStatus;
use crate::model::case::CaseType;
use crate::model::case::OwnerTeam;
use crate::model::checklist::ChecklistStep;
use crate::model::checklist::EvidenceType;
use crate::model::evidence::Evidence;
use crate::model::invoice::Invoice;
use crate::model::notification::Notification;
use crate::model::soa::SoaIssue;
use crate::model::soa::SoaLine;
use crate::model::soa::SoaMatch;
use crate::model::tenant::BankDetails;
use crate::model::tenant::Company;
use crate::model::tenant::Vendor;

// ============================================================================
// SECTION: Identity & Session Store
// ============================================================================

/// Filter applied to `enumerate_cases` (spec.md §4.1).
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    /// Restrict to one status, if set.
    pub status: Option<CaseStatus>,
    /// Restrict to one owner team, if set.
    pub owner_team: Option<OwnerTeam>,
    /// Restrict to one case type, if set.
    pub case_type: Option<CaseType>,
    /// Restrict to cases owned by this vendor (applied for supplier
    /// actors regardless of the caller's other filters).
    pub vendor_id: Option<VendorId>,
    /// Free-text search over subject.
    pub free_text: Option<String>,
}

/// Persists and resolves tenants, companies, vendors, users, and sessions.
///
/// # Invariants
/// - Implementations never return an entity whose tenant does not match
///   the tenant id passed to the query (spec.md §8 cross-tenant
///   invariant); the HTTP boundary relies on this, not on a second check.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Lists every known tenant id, for the SLA ticker's per-tenant sweep
    /// (spec.md §4.7 "scans non-terminal cases within each tenant").
    async fn list_tenant_ids(&self) -> Result<Vec<TenantId>, CoreError>;

    /// Looks up a company within a tenant.
    async fn get_company(&self, tenant: TenantId, id: CompanyId) -> Result<Company, CoreError>;

    /// Looks up a vendor within a tenant.
    async fn get_vendor(&self, tenant: TenantId, id: VendorId) -> Result<Vendor, CoreError>;

    /// Returns whether a vendor-company authorization link exists.
    async fn vendor_linked_to_company(&self, vendor: VendorId, company: CompanyId) -> Result<bool, CoreError>;

    /// Applies a bank-details update to a vendor (spec.md §4.1 bank-change
    /// workflow, SPEC_FULL.md §4).
    async fn update_vendor_bank_details(&self, vendor: VendorId, details: BankDetails) -> Result<(), CoreError>;

    /// Looks up a user by case-insensitive email within a tenant.
    async fn get_user_by_email(&self, tenant: TenantId, email: &str) -> Result<User, CoreError>;

    /// Looks up a user by id.
    async fn get_user(&self, id: UserId) -> Result<User, CoreError>;

    /// Lists active users scoped to a vendor, for notification fan-out to
    /// the supplier side of a case (spec.md §4.2/§4.7 notification
    /// emission). Implementations return an empty vector, never an error,
    /// when the vendor has no active portal users.
    async fn list_active_users_by_vendor(&self, vendor: VendorId) -> Result<Vec<User>, CoreError>;

    /// Creates a session row.
    async fn create_session(&self, session: Session) -> Result<(), CoreError>;

    /// Looks up a session by id.
    async fn get_session(&self, id: SessionId) -> Result<Session, CoreError>;

    /// Deletes a session (logout).
    async fn delete_session(&self, id: SessionId) -> Result<(), CoreError>;
}

// ============================================================================
// SECTION: Case Store
// ============================================================================

/// Persists and queries cases (spec.md §4.1).
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Inserts a newly created case.
    async fn insert_case(&self, case: Case) -> Result<(), CoreError>;

    /// Looks up a case by id.
    async fn get_case(&self, id: CaseId) -> Result<Case, CoreError>;

    /// Lists cases matching a filter, ordered by `updated_at` descending.
    async fn list_cases(&self, tenant: TenantId, filter: CaseFilter) -> Result<Vec<Case>, CoreError>;

    /// Persists an in-place update to a case (status, owner, escalation,
    /// posture, metadata).
    async fn update_case(&self, case: Case) -> Result<(), CoreError>;

    /// Lists every non-terminal case in a tenant, for the SLA ticker.
    async fn list_non_terminal_cases(&self, tenant: TenantId) -> Result<Vec<Case>, CoreError>;
}

// ============================================================================
// SECTION: Thread Store
// ============================================================================

/// Persists and lists the append-only message thread (spec.md §4.2).
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Appends a message. Implementations must assign strictly increasing
    /// ordering per case (spec.md §8).
    async fn insert_message(&self, message: crate::model::thread::Message) -> Result<(), CoreError>;

    /// Lists messages for a case in ascending creation order.
    async fn list_messages(&self, case: CaseId) -> Result<Vec<crate::model::thread::Message>, CoreError>;
}

// ============================================================================
// SECTION: Checklist Store
// ============================================================================

/// Persists and queries checklist steps (spec.md §4.3).
#[async_trait]
pub trait ChecklistStore: Send + Sync {
    /// Inserts steps that do not already exist for the case (idempotent
    /// materialization); implementations must not duplicate on
    /// `(case_id, required_type)`.
    async fn insert_missing_steps(&self, steps: Vec<ChecklistStep>) -> Result<(), CoreError>;

    /// Lists all steps for a case.
    async fn list_steps(&self, case: CaseId) -> Result<Vec<ChecklistStep>, CoreError>;

    /// Persists an in-place update to a step (status, rejection reason).
    async fn update_step(&self, step: ChecklistStep) -> Result<(), CoreError>;
}

// ============================================================================
// SECTION: Evidence Store
// ============================================================================

/// Persists and queries evidence rows (spec.md §4.4). Blob bytes live in
/// the object store ([`ObjectStore`]); this trait only owns the row.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Inserts a new evidence row.
    async fn insert_evidence(&self, evidence: Evidence) -> Result<(), CoreError>;

    /// Looks up an evidence row by id.
    async fn get_evidence(&self, id: EvidenceId) -> Result<Evidence, CoreError>;

    /// Lists evidence for a case.
    async fn list_evidence(&self, case: CaseId) -> Result<Vec<Evidence>, CoreError>;

    /// Lists existing versions for a (case, evidence type) pair, used to
    /// compute the next version (spec.md §3, §4.4).
    async fn evidence_versions(&self, case: CaseId, evidence_type: EvidenceType) -> Result<Vec<u32>, CoreError>;

    /// Deletes an evidence row, used only for the best-effort cleanup path
    /// when an insert fails after the blob has already been uploaded
    /// (spec.md §4.4 Atomicity & cleanup); never called on a committed row.
    async fn delete_evidence(&self, id: EvidenceId) -> Result<(), CoreError>;
}

// ============================================================================
// SECTION: Invoice (Shadow Ledger) Store
// ============================================================================

/// Persists and queries the shadow-ledger invoices (spec.md §3, §4.6).
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Inserts an invoice.
    async fn insert_invoice(&self, invoice: Invoice) -> Result<(), CoreError>;

    /// Updates an invoice's mutable fields (status).
    async fn update_invoice(&self, invoice: Invoice) -> Result<(), CoreError>;

    /// Finds the invoice candidate set for a vendor/company pair, used by
    /// the matcher.
    async fn find_invoices(&self, vendor: VendorId, company: CompanyId) -> Result<Vec<Invoice>, CoreError>;
}

// ============================================================================
// SECTION: SOA Store
// ============================================================================

/// Persists and queries SOA lines, matches, and issues (spec.md §4.6).
#[async_trait]
pub trait SoaStore: Send + Sync {
    /// Finds an existing SOA case for the same vendor/company/period, if
    /// one exists (spec.md §4.6: "reused for the same vendor/period").
    async fn find_soa_case(
        &self,
        vendor: VendorId,
        company: CompanyId,
        period_start: crate::time::Timestamp,
        period_end: crate::time::Timestamp,
    ) -> Result<Option<CaseId>, CoreError>;

    /// Lists the document numbers already ingested for a case, used to
    /// make re-ingesting the identical CSV a no-op (spec.md §8
    /// idempotence).
    async fn existing_document_numbers(&self, case: CaseId) -> Result<Vec<String>, CoreError>;

    /// Inserts newly parsed lines.
    async fn insert_lines(&self, lines: Vec<SoaLine>) -> Result<(), CoreError>;

    /// Lists lines for a case.
    async fn list_lines(&self, case: CaseId) -> Result<Vec<SoaLine>, CoreError>;

    /// Updates a line's mutable fields (status).
    async fn update_line(&self, line: SoaLine) -> Result<(), CoreError>;

    /// Inserts a match record.
    async fn insert_match(&self, line_match: SoaMatch) -> Result<(), CoreError>;

    /// Lists matches for a line.
    async fn list_matches(&self, line: SoaLineId) -> Result<Vec<SoaMatch>, CoreError>;

    /// Inserts an issue record.
    async fn insert_issue(&self, issue: SoaIssue) -> Result<(), CoreError>;

    /// Lists issues for a case (joined across its lines).
    async fn list_issues(&self, case: CaseId) -> Result<Vec<SoaIssue>, CoreError>;

    /// Updates an issue's mutable fields (status, resolver, timestamp).
    async fn update_issue(&self, issue_id: SoaIssueId, issue: SoaIssue) -> Result<(), CoreError>;
}

// ============================================================================
// SECTION: Notification Store
// ============================================================================

/// Persists notification rows (spec.md §4.7). Delivery to a downstream
/// transport is [`crate::interfaces::NotificationSink`]'s responsibility.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Inserts a notification row.
    async fn insert_notification(&self, notification: Notification) -> Result<(), CoreError>;

    /// Lists notifications for a user.
    async fn list_notifications(&self, user: UserId) -> Result<Vec<Notification>, CoreError>;
}

/// The aggregate storage surface `vmp-http` and `vmp-cli` depend on.
/// `vmp-store` implements every supertrait on a single connection-backed
/// type.
pub trait Store:
    IdentityStore + CaseStore + ThreadStore + ChecklistStore + EvidenceStore + InvoiceStore + SoaStore + NotificationStore
{
}

impl<T> Store for T where
    T: IdentityStore + CaseStore + ThreadStore + ChecklistStore + EvidenceStore + InvoiceStore + SoaStore + NotificationStore
{
}

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// A signed, time-bounded read URL for an evidence blob (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    /// The URL itself.
    pub url: String,
    /// Expiry timestamp.
    pub expires_at: crate::time::Timestamp,
}

/// Evidence blob storage (spec.md §4.4, §6 "Object-store layout").
///
/// # Invariants
/// - `put` uses create-only semantics; it refuses to overwrite an
///   existing key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads a blob under `key` with create-only semantics.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Conflict`] if `key` already exists.
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<(), CoreError>;

    /// Issues a signed, time-bounded read URL for `key`.
    async fn signed_url(&self, key: &str, lifetime: time::Duration) -> Result<SignedUrl, CoreError>;

    /// Deletes a blob, used for the best-effort cleanup path on evidence
    /// insert failure (spec.md §4.4).
    async fn delete(&self, key: &str) -> Result<(), CoreError>;
}

// ============================================================================
// SECTION: Notification Sink
// ============================================================================

/// A downstream notification transport (email/push/webhook; spec.md §1
/// "out of scope... notification delivery transport").
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers a notification that has already been persisted.
    async fn deliver(&self, notification: &Notification) -> Result<(), CoreError>;
}
