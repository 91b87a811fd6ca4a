// crates/vmp-core/src/evidence.rs
// ============================================================================
// Module: VMP Evidence Vault
// Description: Upload validation, versioning, and storage-key derivation
//              (spec.md §4.4).
// Dependencies: crate::model, crate::error, sha2
// ============================================================================

//! ## Overview
//! Pure logic for the Evidence Vault: the MIME allow-list and size limit,
//! the next-version computation, the canonical storage key, and filename
//! sanitization. Object-store I/O lives in `vmp-objectstore`; row
//! persistence in `vmp-store`. The upload orchestration sequence (digest,
//! then upload, then insert, then reconcile) is the caller's
//! responsibility but is shaped around these primitives.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;

use crate::error::CoreError;
use crate::ids::CaseId;
use crate::model::checklist::EvidenceType;
use crate::time::Timestamp;

/// Maximum evidence upload size: 50 MiB (spec.md §4.4, §8).
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Allowed upload MIME types (spec.md §4.4).
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

/// Validates an incoming upload's declared MIME type and size.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if the MIME type is not allow-listed
/// or the size exceeds [`MAX_UPLOAD_BYTES`].
pub fn validate_upload(mime_type: &str, size_bytes: u64) -> Result<(), CoreError> {
    if !ALLOWED_MIME_TYPES.contains(&mime_type) {
        return Err(CoreError::validation(format!("mime type {mime_type} is not allowed")));
    }
    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(CoreError::validation(format!(
            "upload of {size_bytes} bytes exceeds the {MAX_UPLOAD_BYTES} byte limit"
        )));
    }
    Ok(())
}

/// Computes the next version for a (case, evidence type) pair.
///
/// # Invariants
/// - Returns `1 + max(existing_versions)`, or `1` if `existing_versions`
///   is empty (spec.md §3, §4.4).
#[must_use]
pub fn next_version(existing_versions: &[u32]) -> u32 {
    existing_versions.iter().copied().max().map_or(1, |max| max + 1)
}

/// Replaces any character outside `[A-Za-z0-9._-]` with `_`
/// (spec.md §4.4).
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// Builds the canonical object-store key for an evidence upload
/// (spec.md §4.4): `{case id}/{evidence type}/{YYYY-MM-DD}/v{version}_{sanitized filename}`.
#[must_use]
pub fn storage_key(
    case_id: CaseId,
    evidence_type: EvidenceType,
    uploaded_at: Timestamp,
    version: u32,
    original_filename: &str,
) -> String {
    let type_key = evidence_type_key(evidence_type);
    let sanitized = sanitize_filename(original_filename);
    format!("{case_id}/{type_key}/{}/v{version}_{sanitized}", uploaded_at.date_stamp())
}

/// Stable, lowercase, underscore-joined key fragment for an evidence type.
#[must_use]
pub const fn evidence_type_key(evidence_type: EvidenceType) -> &'static str {
    match evidence_type {
        EvidenceType::InvoicePdf => "invoice_pdf",
        EvidenceType::PoNumber => "po_number",
        EvidenceType::Grn => "grn",
        EvidenceType::BankLetter => "bank_letter",
        EvidenceType::TaxId => "tax_id",
        EvidenceType::VatCertificate => "vat_certificate",
        EvidenceType::EinCertificate => "ein_certificate",
        EvidenceType::W9Form => "w9_form",
        EvidenceType::TradeLicense => "trade_license",
        EvidenceType::ImportExportPermit => "import_export_permit",
        EvidenceType::Remittance => "remittance",
        EvidenceType::BankStatement => "bank_statement",
        EvidenceType::CompanyRegistration => "company_registration",
        EvidenceType::SoaDocument => "soa_document",
        EvidenceType::Reconciliation => "reconciliation",
        EvidenceType::TaxCertificate => "tax_certificate",
        EvidenceType::SupportingDocumentation => "supporting_documentation",
    }
}

/// Parses the stable key fragment produced by [`evidence_type_key`] back
/// into an [`EvidenceType`], used at the HTTP boundary where the type
/// arrives as an untyped multipart field (spec.md §4.4, §6).
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if `key` is not one of the known
/// fragments.
pub fn parse_evidence_type(key: &str) -> Result<EvidenceType, CoreError> {
    match key {
        "invoice_pdf" => Ok(EvidenceType::InvoicePdf),
        "po_number" => Ok(EvidenceType::PoNumber),
        "grn" => Ok(EvidenceType::Grn),
        "bank_letter" => Ok(EvidenceType::BankLetter),
        "tax_id" => Ok(EvidenceType::TaxId),
        "vat_certificate" => Ok(EvidenceType::VatCertificate),
        "ein_certificate" => Ok(EvidenceType::EinCertificate),
        "w9_form" => Ok(EvidenceType::W9Form),
        "trade_license" => Ok(EvidenceType::TradeLicense),
        "import_export_permit" => Ok(EvidenceType::ImportExportPermit),
        "remittance" => Ok(EvidenceType::Remittance),
        "bank_statement" => Ok(EvidenceType::BankStatement),
        "company_registration" => Ok(EvidenceType::CompanyRegistration),
        "soa_document" => Ok(EvidenceType::SoaDocument),
        "reconciliation" => Ok(EvidenceType::Reconciliation),
        "tax_certificate" => Ok(EvidenceType::TaxCertificate),
        "supporting_documentation" => Ok(EvidenceType::SupportingDocumentation),
        other => Err(CoreError::validation(format!("unknown evidence type '{other}'"))),
    }
}

/// Computes the hex-encoded SHA-256 digest of a byte slice
/// (spec.md §4.4 Integrity).
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Verifies that `bytes` matches an expected hex-encoded SHA-256 digest.
///
/// # Errors
///
/// Returns [`CoreError::Integrity`] on mismatch (spec.md §8 invariant:
/// "its digest equals the SHA-256 of the blob at its storage path").
pub fn verify_digest(bytes: &[u8], expected_hex: &str) -> Result<(), CoreError> {
    let actual = sha256_hex(bytes);
    if actual == expected_hex {
        Ok(())
    } else {
        Err(CoreError::integrity(format!("digest mismatch: expected {expected_hex}, got {actual}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_version_is_one() {
        assert_eq!(next_version(&[]), 1);
    }

    #[test]
    fn version_increments_past_max() {
        assert_eq!(next_version(&[1, 2, 5]), 6);
    }

    #[test]
    fn filename_sanitization_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("invoice (final)!.pdf"), "invoice__final__.pdf");
    }

    #[test]
    fn disallowed_mime_type_is_rejected() {
        assert!(validate_upload("application/x-msdownload", 10).is_err());
    }

    #[test]
    fn oversized_upload_is_rejected() {
        assert!(validate_upload("application/pdf", MAX_UPLOAD_BYTES + 1).is_err());
    }

    #[test]
    fn boundary_size_is_accepted() {
        assert!(validate_upload("application/pdf", MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn storage_key_matches_canonical_shape() {
        let case_id = CaseId::generate();
        let ts = Timestamp::now();
        let key = storage_key(case_id, EvidenceType::InvoicePdf, ts, 1, "invoice.pdf");
        assert!(key.starts_with(&format!("{case_id}/invoice_pdf/{}/v1_invoice.pdf", ts.date_stamp())));
    }

    #[test]
    fn evidence_type_key_round_trips_through_parse() {
        for evidence_type in [
            EvidenceType::InvoicePdf,
            EvidenceType::BankLetter,
            EvidenceType::VatCertificate,
            EvidenceType::SupportingDocumentation,
        ] {
            let key = evidence_type_key(evidence_type);
            assert_eq!(parse_evidence_type(key).expect("known key"), evidence_type);
        }
        assert!(parse_evidence_type("not_a_real_type").is_err());
    }

    #[test]
    fn identical_content_yields_identical_digest() {
        let digest_a = sha256_hex(b"hello world");
        let digest_b = sha256_hex(b"hello world");
        assert_eq!(digest_a, digest_b);
        assert!(verify_digest(b"hello world", &digest_a).is_ok());
        assert!(verify_digest(b"tampered", &digest_a).is_err());
    }
}
