// crates/vmp-store/src/store.rs
// ============================================================================
// Module: VMP SQLite Store
// Description: rusqlite-backed implementation of every vmp-core storage
//              trait (spec.md §3, §9 "injected store handle").
// Purpose: Own schema creation/migration and translate rusqlite failures
//          into `CoreError` without leaking SQLite detail to callers.
// Dependencies: rusqlite (bundled), serde_json, bigdecimal, time, thiserror,
//               async-trait, vmp-core
// ============================================================================

//! ## Overview
//! [`SqliteStore`] holds one synchronous `rusqlite::Connection` behind a
//! `Mutex`, opened in WAL mode. VMP's write volume is human-interaction
//! paced (one message, evidence upload, or status change at a time), so a
//! single serialized write connection is sufficient; there is no writer
//! queue or batching here. Every trait method locks the connection for the
//! duration of its own statement(s) and releases it before returning.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use vmp_core::CoreError;
use vmp_core::ids::CaseId;
use vmp_core::ids::ChecklistStepId;
use vmp_core::ids::CompanyId;
use vmp_core::ids::EvidenceId;
use vmp_core::ids::InvoiceId;
use vmp_core::ids::MessageId;
use vmp_core::ids::NotificationId;
use vmp_core::ids::SessionId;
use vmp_core::ids::SoaIssueId;
use vmp_core::ids::SoaLineId;
use vmp_core::ids::SoaMatchId;
use vmp_core::ids::TenantId;
use vmp_core::ids::UserId;
use vmp_core::ids::VendorId;
use vmp_core::interfaces::CaseFilter;
use vmp_core::interfaces::CaseStore;
use vmp_core::interfaces::ChecklistStore;
use vmp_core::interfaces::EvidenceStore;
use vmp_core::interfaces::IdentityStore;
use vmp_core::interfaces::InvoiceStore;
use vmp_core::interfaces::NotificationStore;
use vmp_core::interfaces::SoaStore;
use vmp_core::interfaces::ThreadStore;
use vmp_core::model::actor::Session;
use vmp_core::model::actor::User;
use vmp_core::model::case::Case;
use vmp_core::model::case::CaseStatus;
use vmp_core::model::case::CaseType;
use vmp_core::model::case::OwnerTeam;
use vmp_core::model::case::SlaPosture;
use vmp_core::model::checklist::ChecklistStep;
use vmp_core::model::checklist::EvidenceType;
use vmp_core::model::evidence::Evidence;
use vmp_core::model::invoice::Invoice;
use vmp_core::model::invoice::InvoiceSource;
use vmp_core::model::invoice::InvoiceStatus;
use vmp_core::model::notification::Notification;
use vmp_core::model::notification::NotificationKind;
use vmp_core::model::soa::DocumentType;
use vmp_core::model::soa::IssueStatus;
use vmp_core::model::soa::IssueType;
use vmp_core::model::soa::LineStatus;
use vmp_core::model::soa::MatchPass;
use vmp_core::model::soa::SoaIssue;
use vmp_core::model::soa::SoaLine;
use vmp_core::model::soa::SoaMatch;
use vmp_core::model::tenant::BankDetails;
use vmp_core::model::tenant::Company;
use vmp_core::model::tenant::Vendor;
use vmp_core::model::tenant::VendorType;
use vmp_core::model::thread::ChannelSource;
use vmp_core::model::thread::Message;
use vmp_core::model::thread::SenderParty;
use vmp_core::time::Timestamp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Narrow failure surface for this crate, converted to [`CoreError`] at
/// every trait boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQLite call failed.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A row existed but could not be decoded into its domain type.
    #[error("decoding stored row: {0}")]
    Decode(String),

    /// The referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique-key violation or disallowed duplicate.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A row's stored hash does not match its own contents (spec.md §9
    /// "fail closed on corruption").
    #[error("row integrity check failed: {0}")]
    Corrupt(String),
}

impl From<StoreError> for CoreError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(detail) => Self::not_found(detail),
            StoreError::Conflict(detail) => Self::conflict(detail),
            StoreError::Decode(detail) => Self::Internal(detail),
            StoreError::Corrupt(detail) => Self::integrity(detail),
            StoreError::Sqlite(source) => match source {
                rusqlite::Error::SqliteFailure(ref inner, _)
                    if inner.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Self::conflict(source.to_string())
                }
                rusqlite::Error::QueryReturnedNoRows => Self::not_found("row not found"),
                other => Self::Internal(other.to_string()),
            },
        }
    }
}

// ============================================================================
// SECTION: Encoding Helpers
// ============================================================================

fn enum_to_text<T: Serialize>(value: &T) -> Result<String, StoreError> {
    match serde_json::to_value(value).map_err(|err| StoreError::Decode(err.to_string()))? {
        Value::String(text) => Ok(text),
        other => Err(StoreError::Decode(format!("expected string-encoded enum, got {other}"))),
    }
}

fn text_to_enum<T: DeserializeOwned>(text: &str) -> Result<T, StoreError> {
    serde_json::from_value(Value::String(text.to_string())).map_err(|err| StoreError::Decode(err.to_string()))
}

fn ts_to_text(value: Timestamp) -> String {
    value.to_string()
}

fn text_to_ts(text: &str) -> Result<Timestamp, StoreError> {
    let parsed = OffsetDateTime::parse(text, &Rfc3339).map_err(|err| StoreError::Decode(err.to_string()))?;
    Ok(Timestamp::from_offset(parsed))
}

fn opt_ts_to_text(value: Option<Timestamp>) -> Option<String> {
    value.map(ts_to_text)
}

fn opt_text_to_ts(text: Option<String>) -> Result<Option<Timestamp>, StoreError> {
    text.map(|value| text_to_ts(&value)).transpose()
}

fn id_to_text<T: ToString>(id: T) -> String {
    id.to_string()
}

fn text_to_id<T: FromStr>(text: &str) -> Result<T, StoreError> {
    text.parse().map_err(|_| StoreError::Decode(format!("invalid identifier: {text}")))
}

fn opt_id_to_text<T: ToString>(id: Option<T>) -> Option<String> {
    id.map(|value| value.to_string())
}

fn opt_text_to_id<T: FromStr>(text: Option<String>) -> Result<Option<T>, StoreError> {
    text.map(|value| text_to_id(&value)).transpose()
}

fn metadata_to_text(value: &BTreeMap<String, Value>) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|err| StoreError::Decode(err.to_string()))
}

fn text_to_metadata(text: &str) -> Result<BTreeMap<String, Value>, StoreError> {
    serde_json::from_str(text).map_err(|err| StoreError::Decode(err.to_string()))
}

fn amount_to_text(value: &BigDecimal) -> String {
    value.to_string()
}

fn text_to_amount(text: &str) -> Result<BigDecimal, StoreError> {
    BigDecimal::from_str(text).map_err(|err| StoreError::Decode(err.to_string()))
}

// ============================================================================
// SECTION: Row Hashing
// ============================================================================

/// Hashes a row's decoded domain value so corruption or an out-of-band edit
/// of its SQLite row is detectable on the next load. Hashes the struct
/// itself rather than its raw column text, so field order is fixed by the
/// Rust type (and `BTreeMap` fields, like `Case::metadata`, are already
/// key-sorted) without needing RFC 8785 canonicalization for arbitrary JSON.
fn row_hash<T: Serialize>(value: &T) -> Result<String, StoreError> {
    let bytes = serde_json::to_vec(value).map_err(|err| StoreError::Decode(err.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex_encode(&hasher.finalize()))
}

/// Recomputes `value`'s hash and compares it against the hash stored
/// alongside its row, failing closed on a mismatch (spec.md §9).
fn verify_row_hash<T: Serialize>(value: &T, stored: &str, context: &str) -> Result<(), StoreError> {
    let expected = row_hash(value)?;
    if expected != stored {
        return Err(StoreError::Corrupt(format!("{context}: stored hash does not match row contents")));
    }
    Ok(())
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

// ============================================================================
// SECTION: Schema
// ============================================================================

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS tenants (
    id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS companies (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    name TEXT NOT NULL,
    country_code TEXT NOT NULL,
    UNIQUE (tenant_id, name)
);

CREATE TABLE IF NOT EXISTS vendors (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    display_name TEXT NOT NULL,
    vendor_type TEXT NOT NULL,
    country_code TEXT NOT NULL,
    bank_account_name TEXT NOT NULL,
    bank_account_number TEXT NOT NULL,
    bank_name TEXT NOT NULL,
    bank_swift TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS vendor_company_links (
    vendor_id TEXT NOT NULL,
    company_id TEXT NOT NULL,
    PRIMARY KEY (vendor_id, company_id)
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    email TEXT NOT NULL,
    display_name TEXT NOT NULL,
    password_digest TEXT NOT NULL,
    internal INTEGER NOT NULL,
    active INTEGER NOT NULL,
    vendor_id TEXT,
    UNIQUE (tenant_id, email)
);

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cases (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    company_id TEXT NOT NULL,
    vendor_id TEXT NOT NULL,
    case_type TEXT NOT NULL,
    subject TEXT NOT NULL,
    status TEXT NOT NULL,
    owner_team TEXT NOT NULL,
    assigned_user_id TEXT,
    sla_due_at TEXT,
    last_posture TEXT,
    escalation_level INTEGER NOT NULL,
    metadata TEXT NOT NULL,
    linked_invoice_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    row_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cases_tenant ON cases (tenant_id);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    case_id TEXT NOT NULL,
    sender_user_id TEXT,
    sender_party TEXT NOT NULL,
    channel_source TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    internal_note INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_case ON messages (case_id, created_at);

CREATE TABLE IF NOT EXISTS checklist_steps (
    id TEXT PRIMARY KEY,
    case_id TEXT NOT NULL,
    label TEXT NOT NULL,
    required_type TEXT NOT NULL,
    status TEXT NOT NULL,
    rejection_reason TEXT,
    row_hash TEXT NOT NULL,
    UNIQUE (case_id, required_type)
);

CREATE TABLE IF NOT EXISTS evidence (
    id TEXT PRIMARY KEY,
    case_id TEXT NOT NULL,
    checklist_step_id TEXT,
    evidence_type TEXT NOT NULL,
    version INTEGER NOT NULL,
    original_filename TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    storage_path TEXT NOT NULL,
    sha256_digest TEXT NOT NULL,
    uploader_user_id TEXT NOT NULL,
    uploader_party TEXT NOT NULL,
    created_at TEXT NOT NULL,
    row_hash TEXT NOT NULL,
    UNIQUE (case_id, evidence_type, version)
);

CREATE TABLE IF NOT EXISTS invoices (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    company_id TEXT NOT NULL,
    vendor_id TEXT NOT NULL,
    invoice_number TEXT NOT NULL,
    invoice_date TEXT NOT NULL,
    amount TEXT NOT NULL,
    currency TEXT NOT NULL,
    po_reference TEXT,
    grn_reference TEXT,
    status TEXT NOT NULL,
    source TEXT NOT NULL,
    UNIQUE (vendor_id, company_id, invoice_number)
);

CREATE TABLE IF NOT EXISTS soa_lines (
    id TEXT PRIMARY KEY,
    case_id TEXT NOT NULL,
    document_number TEXT NOT NULL,
    document_date TEXT NOT NULL,
    amount TEXT NOT NULL,
    currency TEXT NOT NULL,
    document_type TEXT NOT NULL,
    status TEXT NOT NULL,
    row_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_soa_lines_case ON soa_lines (case_id);

CREATE TABLE IF NOT EXISTS soa_matches (
    id TEXT PRIMARY KEY,
    line_id TEXT NOT NULL,
    invoice_id TEXT NOT NULL,
    pass TEXT NOT NULL,
    is_exact INTEGER NOT NULL,
    amount_delta TEXT NOT NULL,
    days_delta INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    row_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_soa_matches_line ON soa_matches (line_id);

CREATE TABLE IF NOT EXISTS soa_issues (
    id TEXT PRIMARY KEY,
    line_id TEXT NOT NULL,
    issue_type TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    resolver_user_id TEXT,
    resolved_at TEXT,
    row_hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    case_id TEXT,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    read INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications (user_id);
";

// ============================================================================
// SECTION: SqliteStore
// ============================================================================

/// A SQLite-backed implementation of every vmp-core storage trait.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if necessary) a WAL-mode SQLite database at `path`
    /// and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the file cannot be opened or the
    /// schema cannot be applied.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory database, used by tests.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Fixture/bootstrap helpers. None of these are part of a vmp-core
    // trait: tenant/company/vendor/user provisioning is an administrative
    // concern outside the case-collaboration surface, so it is exposed as
    // plain inherent methods rather than widening `IdentityStore`.
    // ------------------------------------------------------------------

    /// Inserts a tenant row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on constraint violation or I/O failure.
    pub fn insert_tenant(&self, tenant: &vmp_core::model::tenant::Tenant) -> Result<(), StoreError> {
        self.lock()
            .execute(
                "INSERT INTO tenants (id, display_name) VALUES (?1, ?2)",
                params![id_to_text(tenant.id), tenant.display_name],
            )
            .map(|_| ())
            .map_err(Into::into)
    }

    /// Inserts a company row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on constraint violation or I/O failure.
    pub fn insert_company(&self, company: &Company) -> Result<(), StoreError> {
        self.lock()
            .execute(
                "INSERT INTO companies (id, tenant_id, name, country_code) VALUES (?1, ?2, ?3, ?4)",
                params![id_to_text(company.id), id_to_text(company.tenant_id), company.name, company.country_code],
            )
            .map(|_| ())
            .map_err(Into::into)
    }

    /// Inserts a vendor row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on constraint violation or I/O failure.
    pub fn insert_vendor(&self, vendor: &Vendor) -> Result<(), StoreError> {
        let vendor_type = enum_to_text(&vendor.vendor_type)?;
        self.lock()
            .execute(
                "INSERT INTO vendors (id, tenant_id, display_name, vendor_type, country_code, \
                 bank_account_name, bank_account_number, bank_name, bank_swift) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id_to_text(vendor.id),
                    id_to_text(vendor.tenant_id),
                    vendor.display_name,
                    vendor_type,
                    vendor.country_code,
                    vendor.bank_details.account_name,
                    vendor.bank_details.account_number,
                    vendor.bank_details.bank_name,
                    vendor.bank_details.swift,
                ],
            )
            .map(|_| ())
            .map_err(Into::into)
    }

    /// Links a vendor to a company, authorizing document exchange between
    /// them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on constraint violation or I/O failure.
    pub fn link_vendor_company(&self, vendor: VendorId, company: CompanyId) -> Result<(), StoreError> {
        self.lock()
            .execute(
                "INSERT INTO vendor_company_links (vendor_id, company_id) VALUES (?1, ?2)",
                params![id_to_text(vendor), id_to_text(company)],
            )
            .map(|_| ())
            .map_err(Into::into)
    }

    /// Inserts a user row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on constraint violation or I/O failure.
    pub fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.lock()
            .execute(
                "INSERT INTO users (id, tenant_id, email, display_name, password_digest, internal, active, vendor_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id_to_text(user.id),
                    id_to_text(user.tenant_id),
                    user.email,
                    user.display_name,
                    user.password_digest,
                    i64::from(user.internal),
                    i64::from(user.active),
                    opt_id_to_text(user.vendor_id),
                ],
            )
            .map(|_| ())
            .map_err(Into::into)
    }
}

fn row_to_company(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

// ============================================================================
// SECTION: IdentityStore
// ============================================================================

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn list_tenant_ids(&self) -> Result<Vec<TenantId>, CoreError> {
        let conn = self.lock();
        let mut statement = conn.prepare("SELECT id FROM tenants").map_err(StoreError::from)?;
        let rows = statement
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        rows.iter().map(|text| text_to_id(text)).collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    async fn get_company(&self, tenant: TenantId, id: CompanyId) -> Result<Company, CoreError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, tenant_id, name, country_code FROM companies WHERE id = ?1 AND tenant_id = ?2",
                params![id_to_text(id), id_to_text(tenant)],
                row_to_company,
            )
            .optional()
            .map_err(StoreError::from)?;
        let (id_text, tenant_text, name, country_code) =
            row.ok_or_else(|| StoreError::NotFound(format!("company {id}")))?;
        Ok(Company {
            id: text_to_id(&id_text)?,
            tenant_id: text_to_id(&tenant_text)?,
            name,
            country_code,
        })
    }

    async fn get_vendor(&self, tenant: TenantId, id: VendorId) -> Result<Vendor, CoreError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, tenant_id, display_name, vendor_type, country_code, bank_account_name, \
                 bank_account_number, bank_name, bank_swift FROM vendors WHERE id = ?1 AND tenant_id = ?2",
                params![id_to_text(id), id_to_text(tenant)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                },
            )
            .optional()
            .map_err(StoreError::from)?;
        let (id_text, tenant_text, display_name, vendor_type, country_code, account_name, account_number, bank_name, swift) =
            row.ok_or_else(|| StoreError::NotFound(format!("vendor {id}")))?;
        Ok(Vendor {
            id: text_to_id(&id_text)?,
            tenant_id: text_to_id(&tenant_text)?,
            display_name,
            vendor_type: text_to_enum::<VendorType>(&vendor_type)?,
            country_code,
            bank_details: BankDetails { account_name, account_number, bank_name, swift },
        })
    }

    async fn vendor_linked_to_company(&self, vendor: VendorId, company: CompanyId) -> Result<bool, CoreError> {
        let conn = self.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM vendor_company_links WHERE vendor_id = ?1 AND company_id = ?2",
                params![id_to_text(vendor), id_to_text(company)],
                |row| row.get(0),
            )
            .map_err(StoreError::from)?;
        Ok(count > 0)
    }

    async fn update_vendor_bank_details(&self, vendor: VendorId, details: BankDetails) -> Result<(), CoreError> {
        let conn = self.lock();
        let changed = conn
            .execute(
                "UPDATE vendors SET bank_account_name = ?1, bank_account_number = ?2, bank_name = ?3, \
                 bank_swift = ?4 WHERE id = ?5",
                params![details.account_name, details.account_number, details.bank_name, details.swift, id_to_text(vendor)],
            )
            .map_err(StoreError::from)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("vendor {vendor}")).into());
        }
        Ok(())
    }

    async fn get_user_by_email(&self, tenant: TenantId, email: &str) -> Result<User, CoreError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, tenant_id, email, display_name, password_digest, internal, active, vendor_id \
                 FROM users WHERE tenant_id = ?1 AND email = ?2 COLLATE NOCASE",
                params![id_to_text(tenant), email],
                user_row,
            )
            .optional()
            .map_err(StoreError::from)?;
        let raw = row.ok_or_else(|| StoreError::NotFound(format!("user with email {email}")))?;
        Ok(decode_user(raw)?)
    }

    async fn get_user(&self, id: UserId) -> Result<User, CoreError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, tenant_id, email, display_name, password_digest, internal, active, vendor_id \
                 FROM users WHERE id = ?1",
                params![id_to_text(id)],
                user_row,
            )
            .optional()
            .map_err(StoreError::from)?;
        let raw = row.ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        Ok(decode_user(raw)?)
    }

    async fn list_active_users_by_vendor(&self, vendor: VendorId) -> Result<Vec<User>, CoreError> {
        let conn = self.lock();
        let mut statement = conn
            .prepare(
                "SELECT id, tenant_id, email, display_name, password_digest, internal, active, vendor_id \
                 FROM users WHERE vendor_id = ?1 AND active = 1",
            )
            .map_err(StoreError::from)?;
        let rows = statement
            .query_map(params![id_to_text(vendor)], user_row)
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        rows.into_iter().map(decode_user).collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    async fn create_session(&self, session: Session) -> Result<(), CoreError> {
        let data = metadata_to_text(&session.data)?;
        self.lock()
            .execute(
                "INSERT INTO sessions (id, user_id, expires_at, data) VALUES (?1, ?2, ?3, ?4)",
                params![id_to_text(session.id), id_to_text(session.user_id), ts_to_text(session.expires_at), data],
            )
            .map(|_| ())
            .map_err(StoreError::from)
            .map_err(Into::into)
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, CoreError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, user_id, expires_at, data FROM sessions WHERE id = ?1",
                params![id_to_text(id)],
                |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?, row.get::<_, String>(3)?))
                },
            )
            .optional()
            .map_err(StoreError::from)?;
        let (id_text, user_id_text, expires_text, data_text) =
            row.ok_or_else(|| StoreError::NotFound(format!("session {id}")))?;
        Ok(Session {
            id: text_to_id(&id_text)?,
            user_id: text_to_id(&user_id_text)?,
            expires_at: text_to_ts(&expires_text)?,
            data: text_to_metadata(&data_text)?,
        })
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), CoreError> {
        self.lock()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id_to_text(id)])
            .map(|_| ())
            .map_err(StoreError::from)
            .map_err(Into::into)
    }
}

type UserRow = (String, String, String, String, String, i64, i64, Option<String>);

fn user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn decode_user(raw: UserRow) -> Result<User, StoreError> {
    let (id, tenant_id, email, display_name, password_digest, internal, active, vendor_id) = raw;
    Ok(User {
        id: text_to_id(&id)?,
        tenant_id: text_to_id(&tenant_id)?,
        email,
        display_name,
        password_digest,
        internal: internal != 0,
        active: active != 0,
        vendor_id: opt_text_to_id(vendor_id)?,
    })
}

// ============================================================================
// SECTION: CaseStore
// ============================================================================

type CaseRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
    String,
    Option<String>,
    String,
    String,
    String,
);

fn case_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CaseRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
        row.get(13)?,
        row.get(14)?,
        row.get(15)?,
        row.get(16)?,
    ))
}

fn decode_case(raw: CaseRow) -> Result<Case, StoreError> {
    let (
        id,
        tenant_id,
        company_id,
        vendor_id,
        case_type,
        subject,
        status,
        owner_team,
        assigned_user_id,
        sla_due_at,
        last_posture,
        escalation_level,
        metadata,
        linked_invoice_id,
        created_at,
        updated_at,
        stored_hash,
    ) = raw;
    let case = Case {
        id: text_to_id(&id)?,
        tenant_id: text_to_id(&tenant_id)?,
        company_id: text_to_id(&company_id)?,
        vendor_id: text_to_id(&vendor_id)?,
        case_type: text_to_enum::<CaseType>(&case_type)?,
        subject,
        status: text_to_enum::<CaseStatus>(&status)?,
        owner_team: text_to_enum::<OwnerTeam>(&owner_team)?,
        assigned_user_id: opt_text_to_id(assigned_user_id)?,
        sla_due_at: opt_text_to_ts(sla_due_at)?,
        last_posture: last_posture.map(|text| text_to_enum::<SlaPosture>(&text)).transpose()?,
        escalation_level: u8::try_from(escalation_level).map_err(|err| StoreError::Decode(err.to_string()))?,
        metadata: text_to_metadata(&metadata)?,
        linked_invoice_id: opt_text_to_id(linked_invoice_id)?,
        created_at: text_to_ts(&created_at)?,
        updated_at: text_to_ts(&updated_at)?,
    };
    verify_row_hash(&case, &stored_hash, &format!("case {}", case.id))?;
    Ok(case)
}

const CASE_COLUMNS: &str = "id, tenant_id, company_id, vendor_id, case_type, subject, status, owner_team, \
     assigned_user_id, sla_due_at, last_posture, escalation_level, metadata, linked_invoice_id, created_at, updated_at, row_hash";

#[async_trait]
impl CaseStore for SqliteStore {
    async fn insert_case(&self, case: Case) -> Result<(), CoreError> {
        let case_type = enum_to_text(&case.case_type)?;
        let status = enum_to_text(&case.status)?;
        let owner_team = enum_to_text(&case.owner_team)?;
        let last_posture = case.last_posture.map(|posture| enum_to_text(&posture)).transpose()?;
        let metadata = metadata_to_text(&case.metadata)?;
        let hash = row_hash(&case)?;
        self.lock()
            .execute(
                &format!(
                    "INSERT INTO cases ({CASE_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)"
                ),
                params![
                    id_to_text(case.id),
                    id_to_text(case.tenant_id),
                    id_to_text(case.company_id),
                    id_to_text(case.vendor_id),
                    case_type,
                    case.subject,
                    status,
                    owner_team,
                    opt_id_to_text(case.assigned_user_id),
                    opt_ts_to_text(case.sla_due_at),
                    last_posture,
                    i64::from(case.escalation_level),
                    metadata,
                    opt_id_to_text(case.linked_invoice_id),
                    ts_to_text(case.created_at),
                    ts_to_text(case.updated_at),
                    hash,
                ],
            )
            .map(|_| ())
            .map_err(StoreError::from)
            .map_err(Into::into)
    }

    async fn get_case(&self, id: CaseId) -> Result<Case, CoreError> {
        let conn = self.lock();
        let row = conn
            .query_row(&format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = ?1"), params![id_to_text(id)], case_row)
            .optional()
            .map_err(StoreError::from)?;
        let raw = row.ok_or_else(|| StoreError::NotFound(format!("case {id}")))?;
        Ok(decode_case(raw)?)
    }

    async fn list_cases(&self, tenant: TenantId, filter: CaseFilter) -> Result<Vec<Case>, CoreError> {
        let conn = self.lock();
        let mut sql = format!("SELECT {CASE_COLUMNS} FROM cases WHERE tenant_id = ?1");
        let mut bound: Vec<String> = vec![id_to_text(tenant)];
        if let Some(status) = filter.status {
            bound.push(enum_to_text(&status)?);
            sql.push_str(&format!(" AND status = ?{}", bound.len()));
        }
        if let Some(owner_team) = filter.owner_team {
            bound.push(enum_to_text(&owner_team)?);
            sql.push_str(&format!(" AND owner_team = ?{}", bound.len()));
        }
        if let Some(case_type) = filter.case_type {
            bound.push(enum_to_text(&case_type)?);
            sql.push_str(&format!(" AND case_type = ?{}", bound.len()));
        }
        if let Some(vendor_id) = filter.vendor_id {
            bound.push(id_to_text(vendor_id));
            sql.push_str(&format!(" AND vendor_id = ?{}", bound.len()));
        }
        if let Some(free_text) = &filter.free_text {
            bound.push(format!("%{free_text}%"));
            sql.push_str(&format!(" AND subject LIKE ?{}", bound.len()));
        }
        sql.push_str(" ORDER BY updated_at DESC");
        let mut statement = conn.prepare(&sql).map_err(StoreError::from)?;
        let params: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|value| value as &dyn rusqlite::ToSql).collect();
        let rows = statement
            .query_map(params.as_slice(), case_row)
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        rows.into_iter().map(|raw| decode_case(raw).map_err(Into::into)).collect()
    }

    async fn update_case(&self, case: Case) -> Result<(), CoreError> {
        let status = enum_to_text(&case.status)?;
        let owner_team = enum_to_text(&case.owner_team)?;
        let last_posture = case.last_posture.map(|posture| enum_to_text(&posture)).transpose()?;
        let metadata = metadata_to_text(&case.metadata)?;
        let hash = row_hash(&case)?;
        let changed = self
            .lock()
            .execute(
                "UPDATE cases SET status = ?1, owner_team = ?2, assigned_user_id = ?3, sla_due_at = ?4, \
                 last_posture = ?5, escalation_level = ?6, metadata = ?7, linked_invoice_id = ?8, updated_at = ?9, \
                 row_hash = ?10 WHERE id = ?11",
                params![
                    status,
                    owner_team,
                    opt_id_to_text(case.assigned_user_id),
                    opt_ts_to_text(case.sla_due_at),
                    last_posture,
                    i64::from(case.escalation_level),
                    metadata,
                    opt_id_to_text(case.linked_invoice_id),
                    ts_to_text(case.updated_at),
                    hash,
                    id_to_text(case.id),
                ],
            )
            .map_err(StoreError::from)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("case {}", case.id)).into());
        }
        Ok(())
    }

    async fn list_non_terminal_cases(&self, tenant: TenantId) -> Result<Vec<Case>, CoreError> {
        let conn = self.lock();
        let resolved = enum_to_text(&CaseStatus::Resolved)?;
        let cancelled = enum_to_text(&CaseStatus::Cancelled)?;
        let mut statement = conn
            .prepare(&format!(
                "SELECT {CASE_COLUMNS} FROM cases WHERE tenant_id = ?1 AND status != ?2 AND status != ?3"
            ))
            .map_err(StoreError::from)?;
        let rows = statement
            .query_map(params![id_to_text(tenant), resolved, cancelled], case_row)
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        rows.into_iter().map(|raw| decode_case(raw).map_err(Into::into)).collect()
    }
}

// ============================================================================
// SECTION: ThreadStore
// ============================================================================

#[async_trait]
impl ThreadStore for SqliteStore {
    async fn insert_message(&self, message: Message) -> Result<(), CoreError> {
        let sender_party = enum_to_text(&message.sender_party)?;
        let channel_source = enum_to_text(&message.channel_source)?;
        self.lock()
            .execute(
                "INSERT INTO messages (id, case_id, sender_user_id, sender_party, channel_source, body, \
                 created_at, internal_note) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                params![
                    id_to_text(message.id),
                    id_to_text(message.case_id),
                    opt_id_to_text(message.sender_user_id),
                    sender_party,
                    channel_source,
                    message.body,
                    ts_to_text(message.created_at),
                    i64::from(message.internal_note),
                ],
            )
            .map(|_| ())
            .map_err(StoreError::from)
            .map_err(Into::into)
    }

    async fn list_messages(&self, case: CaseId) -> Result<Vec<Message>, CoreError> {
        let conn = self.lock();
        let mut statement = conn
            .prepare(
                "SELECT id, case_id, sender_user_id, sender_party, channel_source, body, created_at, internal_note \
                 FROM messages WHERE case_id = ?1 ORDER BY created_at ASC, id ASC",
            )
            .map_err(StoreError::from)?;
        let rows = statement
            .query_map(params![id_to_text(case)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, i64>(7)?,
                ))
            })
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        rows.into_iter()
            .map(|(id, case_id, sender_user_id, sender_party, channel_source, body, created_at, internal_note)| {
                Ok(Message {
                    id: text_to_id(&id)?,
                    case_id: text_to_id(&case_id)?,
                    sender_user_id: opt_text_to_id(sender_user_id)?,
                    sender_party: text_to_enum::<SenderParty>(&sender_party)?,
                    channel_source: text_to_enum::<ChannelSource>(&channel_source)?,
                    body,
                    created_at: text_to_ts(&created_at)?,
                    internal_note: internal_note != 0,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()
            .map_err(Into::into)
    }
}

// ============================================================================
// SECTION: ChecklistStore
// ============================================================================

#[async_trait]
impl ChecklistStore for SqliteStore {
    async fn insert_missing_steps(&self, steps: Vec<ChecklistStep>) -> Result<(), CoreError> {
        let conn = self.lock();
        for step in steps {
            let required_type = enum_to_text(&step.required_type)?;
            let status = enum_to_text(&step.status)?;
            let hash = row_hash(&step)?;
            conn.execute(
                "INSERT OR IGNORE INTO checklist_steps (id, case_id, label, required_type, status, \
                 rejection_reason, row_hash) VALUES (?1,?2,?3,?4,?5,?6,?7)",
                params![
                    id_to_text(step.id),
                    id_to_text(step.case_id),
                    step.label,
                    required_type,
                    status,
                    step.rejection_reason,
                    hash,
                ],
            )
            .map_err(StoreError::from)?;
        }
        Ok(())
    }

    async fn list_steps(&self, case: CaseId) -> Result<Vec<ChecklistStep>, CoreError> {
        let conn = self.lock();
        let mut statement = conn
            .prepare(
                "SELECT id, case_id, label, required_type, status, rejection_reason, row_hash \
                 FROM checklist_steps WHERE case_id = ?1",
            )
            .map_err(StoreError::from)?;
        let rows = statement
            .query_map(params![id_to_text(case)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        rows.into_iter()
            .map(|(id, case_id, label, required_type, status, rejection_reason, stored_hash)| {
                let step = ChecklistStep {
                    id: text_to_id(&id)?,
                    case_id: text_to_id(&case_id)?,
                    label,
                    required_type: text_to_enum::<EvidenceType>(&required_type)?,
                    status: text_to_enum::<vmp_core::model::checklist::StepStatus>(&status)?,
                    rejection_reason,
                };
                verify_row_hash(&step, &stored_hash, &format!("checklist step {}", step.id))?;
                Ok(step)
            })
            .collect::<Result<Vec<_>, StoreError>>()
            .map_err(Into::into)
    }

    async fn update_step(&self, step: ChecklistStep) -> Result<(), CoreError> {
        let status = enum_to_text(&step.status)?;
        let hash = row_hash(&step)?;
        let changed = self
            .lock()
            .execute(
                "UPDATE checklist_steps SET status = ?1, rejection_reason = ?2, row_hash = ?3 WHERE id = ?4",
                params![status, step.rejection_reason, hash, id_to_text(step.id)],
            )
            .map_err(StoreError::from)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("checklist step {}", step.id)).into());
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: EvidenceStore
// ============================================================================

#[async_trait]
impl EvidenceStore for SqliteStore {
    async fn insert_evidence(&self, evidence: Evidence) -> Result<(), CoreError> {
        let evidence_type = enum_to_text(&evidence.evidence_type)?;
        let uploader_party = enum_to_text(&evidence.uploader_party)?;
        let hash = row_hash(&evidence)?;
        self.lock()
            .execute(
                "INSERT INTO evidence (id, case_id, checklist_step_id, evidence_type, version, \
                 original_filename, mime_type, size_bytes, storage_path, sha256_digest, uploader_user_id, \
                 uploader_party, created_at, row_hash) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
                params![
                    id_to_text(evidence.id),
                    id_to_text(evidence.case_id),
                    opt_id_to_text(evidence.checklist_step_id),
                    evidence_type,
                    i64::from(evidence.version),
                    evidence.original_filename,
                    evidence.mime_type,
                    i64::try_from(evidence.size_bytes).map_err(|err| StoreError::Decode(err.to_string()))?,
                    evidence.storage_path,
                    evidence.sha256_digest,
                    id_to_text(evidence.uploader_user_id),
                    uploader_party,
                    ts_to_text(evidence.created_at),
                    hash,
                ],
            )
            .map(|_| ())
            .map_err(StoreError::from)
            .map_err(Into::into)
    }

    async fn get_evidence(&self, id: EvidenceId) -> Result<Evidence, CoreError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, case_id, checklist_step_id, evidence_type, version, original_filename, \
                 mime_type, size_bytes, storage_path, sha256_digest, uploader_user_id, uploader_party, \
                 created_at, row_hash FROM evidence WHERE id = ?1",
                params![id_to_text(id)],
                evidence_row,
            )
            .optional()
            .map_err(StoreError::from)?;
        let raw = row.ok_or_else(|| StoreError::NotFound(format!("evidence {id}")))?;
        Ok(decode_evidence(raw)?)
    }

    async fn list_evidence(&self, case: CaseId) -> Result<Vec<Evidence>, CoreError> {
        let conn = self.lock();
        let mut statement = conn
            .prepare(
                "SELECT id, case_id, checklist_step_id, evidence_type, version, original_filename, \
                 mime_type, size_bytes, storage_path, sha256_digest, uploader_user_id, uploader_party, \
                 created_at, row_hash FROM evidence WHERE case_id = ?1 ORDER BY created_at ASC",
            )
            .map_err(StoreError::from)?;
        let rows = statement
            .query_map(params![id_to_text(case)], evidence_row)
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        rows.into_iter().map(|raw| decode_evidence(raw).map_err(Into::into)).collect()
    }

    async fn evidence_versions(&self, case: CaseId, evidence_type: EvidenceType) -> Result<Vec<u32>, CoreError> {
        let conn = self.lock();
        let type_text = enum_to_text(&evidence_type)?;
        let mut statement = conn
            .prepare("SELECT version FROM evidence WHERE case_id = ?1 AND evidence_type = ?2")
            .map_err(StoreError::from)?;
        let rows = statement
            .query_map(params![id_to_text(case), type_text], |row| row.get::<_, i64>(0))
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        rows.into_iter()
            .map(|value| u32::try_from(value).map_err(|err| StoreError::Decode(err.to_string()).into()))
            .collect()
    }

    async fn delete_evidence(&self, id: EvidenceId) -> Result<(), CoreError> {
        self.lock()
            .execute("DELETE FROM evidence WHERE id = ?1", params![id_to_text(id)])
            .map(|_| ())
            .map_err(StoreError::from)
            .map_err(Into::into)
    }
}

type EvidenceRow =
    (String, String, Option<String>, String, i64, String, String, i64, String, String, String, String, String, String);

fn evidence_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EvidenceRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
        row.get(13)?,
    ))
}

fn decode_evidence(raw: EvidenceRow) -> Result<Evidence, StoreError> {
    let (
        id,
        case_id,
        checklist_step_id,
        evidence_type,
        version,
        original_filename,
        mime_type,
        size_bytes,
        storage_path,
        sha256_digest,
        uploader_user_id,
        uploader_party,
        created_at,
        stored_hash,
    ) = raw;
    let evidence = Evidence {
        id: text_to_id(&id)?,
        case_id: text_to_id(&case_id)?,
        checklist_step_id: opt_text_to_id(checklist_step_id)?,
        evidence_type: text_to_enum::<EvidenceType>(&evidence_type)?,
        version: u32::try_from(version).map_err(|err| StoreError::Decode(err.to_string()))?,
        original_filename,
        mime_type,
        size_bytes: u64::try_from(size_bytes).map_err(|err| StoreError::Decode(err.to_string()))?,
        storage_path,
        sha256_digest,
        uploader_user_id: text_to_id(&uploader_user_id)?,
        uploader_party: text_to_enum(&uploader_party)?,
        created_at: text_to_ts(&created_at)?,
    };
    verify_row_hash(&evidence, &stored_hash, &format!("evidence {}", evidence.id))?;
    Ok(evidence)
}

// ============================================================================
// SECTION: InvoiceStore
// ============================================================================

#[async_trait]
impl InvoiceStore for SqliteStore {
    async fn insert_invoice(&self, invoice: Invoice) -> Result<(), CoreError> {
        let status = enum_to_text(&invoice.status)?;
        let source = enum_to_text(&invoice.source)?;
        self.lock()
            .execute(
                "INSERT INTO invoices (id, tenant_id, company_id, vendor_id, invoice_number, invoice_date, \
                 amount, currency, po_reference, grn_reference, status, source) \
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
                params![
                    id_to_text(invoice.id),
                    id_to_text(invoice.tenant_id),
                    id_to_text(invoice.company_id),
                    id_to_text(invoice.vendor_id),
                    invoice.invoice_number,
                    ts_to_text(invoice.invoice_date),
                    amount_to_text(&invoice.amount),
                    invoice.currency,
                    invoice.po_reference,
                    invoice.grn_reference,
                    status,
                    source,
                ],
            )
            .map(|_| ())
            .map_err(StoreError::from)
            .map_err(Into::into)
    }

    async fn update_invoice(&self, invoice: Invoice) -> Result<(), CoreError> {
        let status = enum_to_text(&invoice.status)?;
        let changed = self
            .lock()
            .execute("UPDATE invoices SET status = ?1 WHERE id = ?2", params![status, id_to_text(invoice.id)])
            .map_err(StoreError::from)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("invoice {}", invoice.id)).into());
        }
        Ok(())
    }

    async fn find_invoices(&self, vendor: VendorId, company: CompanyId) -> Result<Vec<Invoice>, CoreError> {
        let conn = self.lock();
        let mut statement = conn
            .prepare(
                "SELECT id, tenant_id, company_id, vendor_id, invoice_number, invoice_date, amount, currency, \
                 po_reference, grn_reference, status, source FROM invoices WHERE vendor_id = ?1 AND company_id = ?2",
            )
            .map_err(StoreError::from)?;
        let rows = statement
            .query_map(params![id_to_text(vendor), id_to_text(company)], invoice_row)
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        rows.into_iter().map(|raw| decode_invoice(raw).map_err(Into::into)).collect()
    }
}

type InvoiceRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
);

fn invoice_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<InvoiceRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
    ))
}

fn decode_invoice(raw: InvoiceRow) -> Result<Invoice, StoreError> {
    let (id, tenant_id, company_id, vendor_id, invoice_number, invoice_date, amount, currency, po_reference, grn_reference, status, source) =
        raw;
    Ok(Invoice {
        id: text_to_id(&id)?,
        tenant_id: text_to_id(&tenant_id)?,
        company_id: text_to_id(&company_id)?,
        vendor_id: text_to_id(&vendor_id)?,
        invoice_number,
        invoice_date: text_to_ts(&invoice_date)?,
        amount: text_to_amount(&amount)?,
        currency,
        po_reference,
        grn_reference,
        status: text_to_enum::<InvoiceStatus>(&status)?,
        source: text_to_enum::<InvoiceSource>(&source)?,
    })
}

// ============================================================================
// SECTION: SoaStore
// ============================================================================

#[async_trait]
impl SoaStore for SqliteStore {
    async fn find_soa_case(
        &self,
        vendor: VendorId,
        company: CompanyId,
        period_start: Timestamp,
        period_end: Timestamp,
    ) -> Result<Option<CaseId>, CoreError> {
        let conn = self.lock();
        let soa_type = enum_to_text(&CaseType::Soa)?;
        let mut statement = conn
            .prepare(&format!("SELECT {CASE_COLUMNS} FROM cases WHERE vendor_id = ?1 AND company_id = ?2 AND case_type = ?3"))
            .map_err(StoreError::from)?;
        let rows = statement
            .query_map(params![id_to_text(vendor), id_to_text(company), soa_type], case_row)
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        for raw in rows {
            let case = decode_case(raw)?;
            let start = case.metadata.get("soa_period_start").and_then(|value| value.as_str());
            let end = case.metadata.get("soa_period_end").and_then(|value| value.as_str());
            if let (Some(start), Some(end)) = (start, end)
                && start == ts_to_text(period_start)
                && end == ts_to_text(period_end)
            {
                return Ok(Some(case.id));
            }
        }
        Ok(None)
    }

    async fn existing_document_numbers(&self, case: CaseId) -> Result<Vec<String>, CoreError> {
        let conn = self.lock();
        let mut statement =
            conn.prepare("SELECT document_number FROM soa_lines WHERE case_id = ?1").map_err(StoreError::from)?;
        let rows = statement
            .query_map(params![id_to_text(case)], |row| row.get::<_, String>(0))
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        Ok(rows)
    }

    async fn insert_lines(&self, lines: Vec<SoaLine>) -> Result<(), CoreError> {
        let conn = self.lock();
        for line in lines {
            let document_type = enum_to_text(&line.document_type)?;
            let status = enum_to_text(&line.status)?;
            let hash = row_hash(&line)?;
            conn.execute(
                "INSERT INTO soa_lines (id, case_id, document_number, document_date, amount, currency, \
                 document_type, status, row_hash) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
                params![
                    id_to_text(line.id),
                    id_to_text(line.case_id),
                    line.document_number,
                    ts_to_text(line.document_date),
                    amount_to_text(&line.amount),
                    line.currency,
                    document_type,
                    status,
                    hash,
                ],
            )
            .map_err(StoreError::from)?;
        }
        Ok(())
    }

    async fn list_lines(&self, case: CaseId) -> Result<Vec<SoaLine>, CoreError> {
        let conn = self.lock();
        let mut statement = conn
            .prepare(
                "SELECT id, case_id, document_number, document_date, amount, currency, document_type, status, \
                 row_hash FROM soa_lines WHERE case_id = ?1",
            )
            .map_err(StoreError::from)?;
        let rows = statement
            .query_map(params![id_to_text(case)], soa_line_row)
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        rows.into_iter().map(|raw| decode_soa_line(raw).map_err(Into::into)).collect()
    }

    async fn update_line(&self, line: SoaLine) -> Result<(), CoreError> {
        let status = enum_to_text(&line.status)?;
        let hash = row_hash(&line)?;
        let changed = self
            .lock()
            .execute(
                "UPDATE soa_lines SET status = ?1, row_hash = ?2 WHERE id = ?3",
                params![status, hash, id_to_text(line.id)],
            )
            .map_err(StoreError::from)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("soa line {}", line.id)).into());
        }
        Ok(())
    }

    async fn insert_match(&self, line_match: SoaMatch) -> Result<(), CoreError> {
        let pass = enum_to_text(&line_match.pass)?;
        let hash = row_hash(&line_match)?;
        self.lock()
            .execute(
                "INSERT INTO soa_matches (id, line_id, invoice_id, pass, is_exact, amount_delta, days_delta, \
                 created_at, row_hash) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
                params![
                    id_to_text(line_match.id),
                    id_to_text(line_match.line_id),
                    id_to_text(line_match.invoice_id),
                    pass,
                    i64::from(line_match.is_exact),
                    amount_to_text(&line_match.amount_delta),
                    line_match.days_delta,
                    ts_to_text(line_match.created_at),
                    hash,
                ],
            )
            .map(|_| ())
            .map_err(StoreError::from)
            .map_err(Into::into)
    }

    async fn list_matches(&self, line: SoaLineId) -> Result<Vec<SoaMatch>, CoreError> {
        let conn = self.lock();
        let mut statement = conn
            .prepare(
                "SELECT id, line_id, invoice_id, pass, is_exact, amount_delta, days_delta, created_at, \
                 row_hash FROM soa_matches WHERE line_id = ?1",
            )
            .map_err(StoreError::from)?;
        let rows = statement
            .query_map(params![id_to_text(line)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        rows.into_iter()
            .map(|(id, line_id, invoice_id, pass, is_exact, amount_delta, days_delta, created_at, stored_hash)| {
                let line_match = SoaMatch {
                    id: text_to_id(&id)?,
                    line_id: text_to_id(&line_id)?,
                    invoice_id: text_to_id(&invoice_id)?,
                    pass: text_to_enum::<MatchPass>(&pass)?,
                    is_exact: is_exact != 0,
                    amount_delta: text_to_amount(&amount_delta)?,
                    days_delta,
                    created_at: text_to_ts(&created_at)?,
                };
                verify_row_hash(&line_match, &stored_hash, &format!("soa match {}", line_match.id))?;
                Ok(line_match)
            })
            .collect::<Result<Vec<_>, StoreError>>()
            .map_err(Into::into)
    }

    async fn insert_issue(&self, issue: SoaIssue) -> Result<(), CoreError> {
        let issue_type = enum_to_text(&issue.issue_type)?;
        let status = enum_to_text(&issue.status)?;
        let hash = row_hash(&issue)?;
        self.lock()
            .execute(
                "INSERT INTO soa_issues (id, line_id, issue_type, description, status, resolver_user_id, \
                 resolved_at, row_hash) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                params![
                    id_to_text(issue.id),
                    id_to_text(issue.line_id),
                    issue_type,
                    issue.description,
                    status,
                    opt_id_to_text(issue.resolver_user_id),
                    opt_ts_to_text(issue.resolved_at),
                    hash,
                ],
            )
            .map(|_| ())
            .map_err(StoreError::from)
            .map_err(Into::into)
    }

    async fn list_issues(&self, case: CaseId) -> Result<Vec<SoaIssue>, CoreError> {
        let conn = self.lock();
        let mut statement = conn
            .prepare(
                "SELECT soa_issues.id, soa_issues.line_id, soa_issues.issue_type, soa_issues.description, \
                 soa_issues.status, soa_issues.resolver_user_id, soa_issues.resolved_at, soa_issues.row_hash \
                 FROM soa_issues JOIN soa_lines ON soa_lines.id = soa_issues.line_id WHERE soa_lines.case_id = ?1",
            )
            .map_err(StoreError::from)?;
        let rows = statement
            .query_map(params![id_to_text(case)], soa_issue_row)
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        rows.into_iter().map(|raw| decode_soa_issue(raw).map_err(Into::into)).collect()
    }

    async fn update_issue(&self, issue_id: SoaIssueId, issue: SoaIssue) -> Result<(), CoreError> {
        let status = enum_to_text(&issue.status)?;
        let hash = row_hash(&issue)?;
        let changed = self
            .lock()
            .execute(
                "UPDATE soa_issues SET status = ?1, resolver_user_id = ?2, resolved_at = ?3, row_hash = ?4 \
                 WHERE id = ?5",
                params![
                    status,
                    opt_id_to_text(issue.resolver_user_id),
                    opt_ts_to_text(issue.resolved_at),
                    hash,
                    id_to_text(issue_id),
                ],
            )
            .map_err(StoreError::from)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("soa issue {issue_id}")).into());
        }
        Ok(())
    }
}

type SoaLineRow = (String, String, String, String, String, String, String, String, String);

fn soa_line_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SoaLineRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn decode_soa_line(raw: SoaLineRow) -> Result<SoaLine, StoreError> {
    let (id, case_id, document_number, document_date, amount, currency, document_type, status, stored_hash) = raw;
    let line = SoaLine {
        id: text_to_id(&id)?,
        case_id: text_to_id(&case_id)?,
        document_number,
        document_date: text_to_ts(&document_date)?,
        amount: text_to_amount(&amount)?,
        currency,
        document_type: text_to_enum::<DocumentType>(&document_type)?,
        status: text_to_enum::<LineStatus>(&status)?,
    };
    verify_row_hash(&line, &stored_hash, &format!("soa line {}", line.id))?;
    Ok(line)
}

type SoaIssueRow = (String, String, String, String, String, Option<String>, Option<String>, String);

fn soa_issue_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SoaIssueRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?))
}

fn decode_soa_issue(raw: SoaIssueRow) -> Result<SoaIssue, StoreError> {
    let (id, line_id, issue_type, description, status, resolver_user_id, resolved_at, stored_hash) = raw;
    let issue = SoaIssue {
        id: text_to_id(&id)?,
        line_id: text_to_id(&line_id)?,
        issue_type: text_to_enum::<IssueType>(&issue_type)?,
        description,
        status: text_to_enum::<IssueStatus>(&status)?,
        resolver_user_id: opt_text_to_id(resolver_user_id)?,
        resolved_at: opt_text_to_ts(resolved_at)?,
    };
    verify_row_hash(&issue, &stored_hash, &format!("soa issue {}", issue.id))?;
    Ok(issue)
}

// ============================================================================
// SECTION: NotificationStore
// ============================================================================

#[async_trait]
impl NotificationStore for SqliteStore {
    async fn insert_notification(&self, notification: Notification) -> Result<(), CoreError> {
        let kind = enum_to_text(&notification.kind)?;
        self.lock()
            .execute(
                "INSERT INTO notifications (id, user_id, case_id, kind, title, body, read, created_at) \
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                params![
                    id_to_text(notification.id),
                    id_to_text(notification.user_id),
                    opt_id_to_text(notification.case_id),
                    kind,
                    notification.title,
                    notification.body,
                    i64::from(notification.read),
                    ts_to_text(notification.created_at),
                ],
            )
            .map(|_| ())
            .map_err(StoreError::from)
            .map_err(Into::into)
    }

    async fn list_notifications(&self, user: UserId) -> Result<Vec<Notification>, CoreError> {
        let conn = self.lock();
        let mut statement = conn
            .prepare(
                "SELECT id, user_id, case_id, kind, title, body, read, created_at FROM notifications \
                 WHERE user_id = ?1 ORDER BY created_at DESC",
            )
            .map_err(StoreError::from)?;
        let rows = statement
            .query_map(params![id_to_text(user)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        rows.into_iter()
            .map(|(id, user_id, case_id, kind, title, body, read, created_at)| {
                Ok(Notification {
                    id: text_to_id(&id)?,
                    user_id: text_to_id(&user_id)?,
                    case_id: opt_text_to_id(case_id)?,
                    kind: text_to_enum::<NotificationKind>(&kind)?,
                    title,
                    body,
                    read: read != 0,
                    created_at: text_to_ts(&created_at)?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()
            .map_err(Into::into)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use vmp_core::model::tenant::Tenant;

    use super::*;

    fn seeded_store() -> (SqliteStore, TenantId, CompanyId, VendorId) {
        let store = SqliteStore::open_in_memory().expect("open");
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
        (store, tenant_id, company_id, vendor_id)
    }

    fn sample_case(tenant_id: TenantId, company_id: CompanyId, vendor_id: VendorId) -> Case {
        let now = Timestamp::now();
        Case {
            id: CaseId::generate(),
            tenant_id,
            company_id,
            vendor_id,
            case_type: CaseType::Invoice,
            subject: "Invoice discrepancy".to_string(),
            status: CaseStatus::Open,
            owner_team: OwnerTeam::AccountsPayable,
            assigned_user_id: None,
            sla_due_at: Some(now.plus(time::Duration::days(3))),
            last_posture: None,
            escalation_level: 0,
            metadata: BTreeMap::new(),
            linked_invoice_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn round_trips_a_case() {
        let (store, tenant_id, company_id, vendor_id) = seeded_store();
        let case = sample_case(tenant_id, company_id, vendor_id);
        store.insert_case(case.clone()).await.expect("insert");
        let loaded = store.get_case(case.id).await.expect("get");
        assert_eq!(loaded, case);
    }

    #[tokio::test]
    async fn get_case_missing_is_not_found() {
        let store = SqliteStore::open_in_memory().expect("open");
        let err = store.get_case(CaseId::generate()).await.expect_err("missing");
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_cases_filters_by_status() {
        let (store, tenant_id, company_id, vendor_id) = seeded_store();
        let mut open_case = sample_case(tenant_id, company_id, vendor_id);
        open_case.status = CaseStatus::Open;
        let mut resolved_case = sample_case(tenant_id, company_id, vendor_id);
        resolved_case.status = CaseStatus::Resolved;
        store.insert_case(open_case.clone()).await.expect("insert open");
        store.insert_case(resolved_case).await.expect("insert resolved");

        let filter = CaseFilter { status: Some(CaseStatus::Open), ..CaseFilter::default() };
        let results = store.list_cases(tenant_id, filter).await.expect("list");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, open_case.id);
    }

    #[tokio::test]
    async fn cross_tenant_lookup_is_not_found() {
        let (store, _tenant_id, _company_id, _vendor_id) = seeded_store();
        let other_tenant = TenantId::generate();
        let company_id = CompanyId::generate();
        let err = store.get_company(other_tenant, company_id).await.expect_err("not found");
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn messages_are_ordered_ascending() {
        let (store, tenant_id, company_id, vendor_id) = seeded_store();
        let case = sample_case(tenant_id, company_id, vendor_id);
        store.insert_case(case.clone()).await.expect("insert case");

        let first = Message {
            id: MessageId::generate(),
            case_id: case.id,
            sender_user_id: None,
            sender_party: SenderParty::System,
            channel_source: ChannelSource::System,
            body: "first".to_string(),
            created_at: Timestamp::now(),
            internal_note: false,
        };
        let second = Message {
            id: MessageId::generate(),
            case_id: case.id,
            sender_user_id: None,
            sender_party: SenderParty::System,
            channel_source: ChannelSource::System,
            body: "second".to_string(),
            created_at: first.created_at.plus(time::Duration::seconds(1)),
            internal_note: false,
        };
        store.insert_message(second.clone()).await.expect("insert second");
        store.insert_message(first.clone()).await.expect("insert first");

        let messages = store.list_messages(case.id).await.expect("list");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body, "first");
        assert_eq!(messages[1].body, "second");
    }

    #[tokio::test]
    async fn checklist_steps_are_not_duplicated() {
        let (store, tenant_id, company_id, vendor_id) = seeded_store();
        let case = sample_case(tenant_id, company_id, vendor_id);
        store.insert_case(case.clone()).await.expect("insert case");

        let step = ChecklistStep {
            id: ChecklistStepId::generate(),
            case_id: case.id,
            label: "Invoice PDF".to_string(),
            required_type: EvidenceType::InvoicePdf,
            status: vmp_core::model::checklist::StepStatus::Pending,
            rejection_reason: None,
        };
        store.insert_missing_steps(vec![step.clone()]).await.expect("insert once");
        let mut duplicate = step.clone();
        duplicate.id = ChecklistStepId::generate();
        store.insert_missing_steps(vec![duplicate]).await.expect("insert ignored");

        let steps = store.list_steps(case.id).await.expect("list");
        assert_eq!(steps.len(), 1);
    }

    #[tokio::test]
    async fn evidence_versions_reports_existing_versions() {
        let (store, tenant_id, company_id, vendor_id) = seeded_store();
        let case = sample_case(tenant_id, company_id, vendor_id);
        store.insert_case(case.clone()).await.expect("insert case");
        let user = UserId::generate();

        for version in [1_u32, 2] {
            store
                .insert_evidence(Evidence {
                    id: EvidenceId::generate(),
                    case_id: case.id,
                    checklist_step_id: None,
                    evidence_type: EvidenceType::InvoicePdf,
                    version,
                    original_filename: "invoice.pdf".to_string(),
                    mime_type: "application/pdf".to_string(),
                    size_bytes: 10,
                    storage_path: format!("{}/invoice_pdf/v{version}", case.id),
                    sha256_digest: "deadbeef".to_string(),
                    uploader_user_id: user,
                    uploader_party: SenderParty::Internal,
                    created_at: Timestamp::now(),
                })
                .await
                .expect("insert evidence");
        }

        let versions = store.evidence_versions(case.id, EvidenceType::InvoicePdf).await.expect("versions");
        assert_eq!(versions, vec![1, 2]);
    }

    #[tokio::test]
    async fn soa_issue_resolution_round_trips() {
        let (store, tenant_id, company_id, vendor_id) = seeded_store();
        let mut case = sample_case(tenant_id, company_id, vendor_id);
        case.case_type = CaseType::Soa;
        store.insert_case(case.clone()).await.expect("insert case");

        let line = SoaLine {
            id: SoaLineId::generate(),
            case_id: case.id,
            document_number: "INV-1".to_string(),
            document_date: Timestamp::now(),
            amount: BigDecimal::from_str("100.00").expect("amount"),
            currency: "USD".to_string(),
            document_type: DocumentType::Inv,
            status: LineStatus::Discrepancy,
        };
        store.insert_lines(vec![line.clone()]).await.expect("insert line");

        let issue = SoaIssue {
            id: SoaIssueId::generate(),
            line_id: line.id,
            issue_type: IssueType::Unmatched,
            description: "no candidate invoice".to_string(),
            status: IssueStatus::Open,
            resolver_user_id: None,
            resolved_at: None,
        };
        store.insert_issue(issue.clone()).await.expect("insert issue");

        let resolver = UserId::generate();
        let resolved_at = Timestamp::now();
        let resolved = SoaIssue { status: IssueStatus::Resolved, resolver_user_id: Some(resolver), resolved_at: Some(resolved_at), ..issue.clone() };
        store.update_issue(issue.id, resolved).await.expect("update issue");

        let issues = store.list_issues(case.id).await.expect("list issues");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].status, IssueStatus::Resolved);
        assert_eq!(issues[0].resolver_user_id, Some(resolver));
    }
}
