// crates/vmp-core/src/model/evidence.rs
// ============================================================================
// Module: VMP Evidence
// Description: A versioned file linked to a case (spec.md §3, §4.4).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::ids::CaseId;
use crate::ids::ChecklistStepId;
use crate::ids::EvidenceId;
use crate::ids::UserId;
use crate::model::checklist::EvidenceType;
use crate::model::thread::SenderParty;
use crate::time::Timestamp;

/// A versioned evidence blob attached to a case.
///
/// # Invariants
/// - `(case_id, evidence_type, version)` is unique.
/// - `version` equals `1 + max(existing version for the same case/type)`,
///   or `1` if none exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Identifier.
    pub id: EvidenceId,
    /// Owning case.
    pub case_id: CaseId,
    /// Linked checklist step, if any.
    pub checklist_step_id: Option<ChecklistStepId>,
    /// Evidence type.
    pub evidence_type: EvidenceType,
    /// Monotonically increasing version for this (case, type) pair.
    pub version: u32,
    /// Original filename as uploaded.
    pub original_filename: String,
    /// MIME type as declared by the uploader.
    pub mime_type: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Object-store key the blob is stored under.
    pub storage_path: String,
    /// Hex-encoded SHA-256 digest of the blob.
    pub sha256_digest: String,
    /// Uploading user.
    pub uploader_user_id: UserId,
    /// Which side uploaded the evidence.
    pub uploader_party: SenderParty,
    /// Creation timestamp.
    pub created_at: Timestamp,
}
