// crates/vmp-config/src/lib.rs
// ============================================================================
// Crate: vmp-config
// Description: Typed configuration model for the Vendor Management Portal
//              core, loaded from TOML plus `VMP_`-prefixed environment
//              overrides, with fail-closed validation.
// Purpose: Own every value spec.md §6 "Environment inputs" and §9 call out
//          as policy rather than a compiled-in constant: store/object-store
//          locations and credentials, signed-URL and cookie secrets,
//          notification sink endpoints, the SLA-ticker interval, per-case
//          -type SLA windows, and the SOA Pass-B date tolerance.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! [`VmpConfig`] is loaded once at process startup by `vmp-cli` and handed
//! to `vmp-http`/`vmp-store`/`vmp-objectstore`/`vmp-notify` as plain data;
//! nothing in this crate performs I/O beyond reading the TOML file itself
//! and the process environment. Loading is two steps, mirroring the
//! teacher's load-then-validate-fail-closed shape: [`VmpConfig::load`]
//! parses TOML and applies environment overrides, then
//! [`VmpConfig::validate`] rejects any value that would let a later
//! component start in an inconsistent state (an empty signing key, a
//! negative SLA window, a notification endpoint that isn't a URL).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure loading or validating [`VmpConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("reading config file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file's TOML was malformed.
    #[error("parsing config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override value could not be parsed into its field's type.
    #[error("environment variable {name} has an invalid value: {detail}")]
    InvalidEnv {
        /// Offending variable name.
        name: &'static str,
        /// Human-readable detail.
        detail: String,
    },

    /// A loaded configuration value failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: SLA Windows
// ============================================================================

/// Per-case-type SLA windows in whole days (spec.md §4.1, §9: "expose them
/// as configuration, not as constants baked into code").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SlaWindowDays {
    /// Onboarding case SLA window. Default 5.
    pub onboarding: u32,
    /// Invoice case SLA window. Default 3.
    pub invoice: u32,
    /// Payment case SLA window. Default 2.
    pub payment: u32,
    /// SOA case SLA window. Default 7.
    pub soa: u32,
    /// Contract and general case SLA window. Default 5.
    pub other: u32,
}

impl Default for SlaWindowDays {
    fn default() -> Self {
        Self { onboarding: 5, invoice: 3, payment: 2, soa: 7, other: 5 }
    }
}

// ============================================================================
// SECTION: Store Configuration
// ============================================================================

/// Relational store connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file path (or `:memory:`).
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { url: "vmp.sqlite3".to_string() }
    }
}

// ============================================================================
// SECTION: Object Store Configuration
// ============================================================================

/// Evidence blob storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStoreBackend {
    /// Local filesystem directory (tests/dev; spec.md §9 "injected store
    /// handle" applies equally to a local dev backend).
    LocalFilesystem,
    /// Amazon S3 or an S3-compatible endpoint.
    S3,
}

/// Object-store connection configuration (spec.md §6 "Object-store
/// layout": bucket `vmp-evidence`, private access, short-lived signed
/// URLs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Which backend to construct.
    pub backend: ObjectStoreBackend,
    /// Bucket name (spec.md §6 default `vmp-evidence`).
    pub bucket: String,
    /// S3-compatible endpoint URL; ignored for the local-filesystem backend.
    pub endpoint: Option<String>,
    /// AWS region; ignored for the local-filesystem backend.
    pub region: Option<String>,
    /// Local filesystem root; only read by the local-filesystem backend.
    pub local_root: Option<String>,
    /// HMAC key used to sign time-bounded read URLs (spec.md §4.4 Read).
    pub signing_key: String,
    /// Default signed-URL lifetime in seconds (spec.md §4.4 default 1 hour).
    pub signed_url_lifetime_secs: u64,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            backend: ObjectStoreBackend::LocalFilesystem,
            bucket: "vmp-evidence".to_string(),
            endpoint: None,
            region: None,
            local_root: Some("./vmp-evidence".to_string()),
            signing_key: String::new(),
            signed_url_lifetime_secs: 3600,
        }
    }
}

// ============================================================================
// SECTION: Notification Configuration
// ============================================================================

/// Notification delivery configuration (spec.md §1 "out of scope...
/// notification delivery transport"; this crate only configures the sink
/// the core pushes persisted rows to, never the transport's own policy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NotifyConfig {
    /// Optional HTTP webhook endpoint a notification is POSTed to, in
    /// addition to the always-present log sink.
    pub webhook_endpoint: Option<String>,
}

// ============================================================================
// SECTION: Session Configuration
// ============================================================================

/// Session cookie signing configuration (SPEC_FULL.md §4 "Session cookie
/// signing").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HMAC-SHA256 key used to sign the session-id cookie value.
    pub cookie_secret: String,
    /// Session lifetime in seconds from creation.
    pub lifetime_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { cookie_secret: String::new(), lifetime_secs: 12 * 3600 }
    }
}

// ============================================================================
// SECTION: HTTP Server Configuration
// ============================================================================

/// HTTP server bind and deadline configuration (spec.md §5 "Timeouts").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. `127.0.0.1:8080`.
    pub bind_addr: String,
    /// Global per-request deadline in seconds (spec.md §5 default 30).
    pub request_deadline_secs: u64,
    /// Per-database-operation deadline in seconds (spec.md §5 default 10).
    pub db_deadline_secs: u64,
    /// Object-store upload deadline in seconds (spec.md §5 default 30).
    pub upload_deadline_secs: u64,
    /// Object-store signed-URL creation deadline in seconds (spec.md §5
    /// default 5).
    pub signed_url_deadline_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            request_deadline_secs: 30,
            db_deadline_secs: 10,
            upload_deadline_secs: 30,
            signed_url_deadline_secs: 5,
        }
    }
}

// ============================================================================
// SECTION: Policy Configuration
// ============================================================================

/// Policy inputs spec.md §9 calls out as "not physics": the SOA Pass-B
/// date tolerance, the SLA-ticker interval, and the break-glass contact
/// revealed on level-3 escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Per-case-type SLA windows.
    pub sla_window_days: SlaWindowDays,
    /// SOA Pass-B date tolerance in days (spec.md §4.6 default 7).
    pub soa_date_tolerance_days: i64,
    /// SLA Ticker sweep interval in seconds (spec.md §4.7 default 15 min).
    pub sla_ticker_interval_secs: u64,
    /// Contact revealed to the supplier UI on level-3 escalation
    /// (spec.md §4.1, glossary "Break-glass"); tenant overrides are a
    /// `vmp-store` concern, this is the process-wide fallback.
    pub break_glass_contact: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            sla_window_days: SlaWindowDays::default(),
            soa_date_tolerance_days: 7,
            sla_ticker_interval_secs: 15 * 60,
            break_glass_contact: "escalations@vmp.invalid".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Top-Level Configuration
// ============================================================================

/// The complete process configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VmpConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Relational store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Object-store settings.
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    /// Notification sink settings.
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Session cookie settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Policy settings.
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl VmpConfig {
    /// Loads configuration from a TOML file, applies `VMP_`-prefixed
    /// environment overrides, then validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is malformed TOML, [`ConfigError::InvalidEnv`]
    /// if an override cannot be parsed, or [`ConfigError::Invalid`] if the
    /// resulting configuration fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        let mut config: Self = toml::from_str(&text)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Builds configuration from defaults plus environment overrides only,
    /// used by tests and by `vmp-cli` when no config file is supplied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] or [`ConfigError::Invalid`] under
    /// the same conditions as [`Self::load`].
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies every recognized `VMP_`-prefixed environment variable.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = env_var("VMP_BIND_ADDR") {
            self.server.bind_addr = value;
        }
        if let Some(value) = env_u64("VMP_REQUEST_DEADLINE_SECS")? {
            self.server.request_deadline_secs = value;
        }
        if let Some(value) = env_var("VMP_STORE_URL") {
            self.store.url = value;
        }
        if let Some(value) = env_var("VMP_OBJECT_STORE_BACKEND") {
            self.object_store.backend = match value.as_str() {
                "local_filesystem" => ObjectStoreBackend::LocalFilesystem,
                "s3" => ObjectStoreBackend::S3,
                other => {
                    return Err(ConfigError::InvalidEnv {
                        name: "VMP_OBJECT_STORE_BACKEND",
                        detail: format!("unrecognized backend {other}"),
                    });
                }
            };
        }
        if let Some(value) = env_var("VMP_OBJECT_STORE_BUCKET") {
            self.object_store.bucket = value;
        }
        if let Some(value) = env_var("VMP_OBJECT_STORE_ENDPOINT") {
            self.object_store.endpoint = Some(value);
        }
        if let Some(value) = env_var("VMP_OBJECT_STORE_REGION") {
            self.object_store.region = Some(value);
        }
        if let Some(value) = env_var("VMP_OBJECT_STORE_LOCAL_ROOT") {
            self.object_store.local_root = Some(value);
        }
        if let Some(value) = env_var("VMP_SIGNING_KEY") {
            self.object_store.signing_key = value;
        }
        if let Some(value) = env_var("VMP_COOKIE_SECRET") {
            self.session.cookie_secret = value;
        }
        if let Some(value) = env_var("VMP_NOTIFY_WEBHOOK_ENDPOINT") {
            self.notify.webhook_endpoint = Some(value);
        }
        if let Some(value) = env_u64("VMP_SLA_TICKER_INTERVAL_SECS")? {
            self.policy.sla_ticker_interval_secs = value;
        }
        if let Some(value) = env_i64("VMP_SOA_DATE_TOLERANCE_DAYS")? {
            self.policy.soa_date_tolerance_days = value;
        }
        if let Some(value) = env_var("VMP_BREAK_GLASS_CONTACT") {
            self.policy.break_glass_contact = value;
        }
        Ok(())
    }

    /// Validates the configuration, failing closed on anything that would
    /// let a downstream component start inconsistently.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] with a human-readable reason for
    /// the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.object_store.signing_key.trim().is_empty() {
            return Err(ConfigError::Invalid("object_store.signing_key must not be empty".to_string()));
        }
        if self.session.cookie_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("session.cookie_secret must not be empty".to_string()));
        }
        if self.object_store.backend == ObjectStoreBackend::S3 && self.object_store.region.is_none() {
            return Err(ConfigError::Invalid("object_store.region is required for the s3 backend".to_string()));
        }
        if self.object_store.backend == ObjectStoreBackend::LocalFilesystem
            && self.object_store.local_root.is_none()
        {
            return Err(ConfigError::Invalid(
                "object_store.local_root is required for the local_filesystem backend".to_string(),
            ));
        }
        if self.policy.soa_date_tolerance_days < 0 {
            return Err(ConfigError::Invalid("policy.soa_date_tolerance_days must not be negative".to_string()));
        }
        if self.policy.sla_ticker_interval_secs == 0 {
            return Err(ConfigError::Invalid("policy.sla_ticker_interval_secs must be positive".to_string()));
        }
        if let Some(endpoint) = &self.notify.webhook_endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::Invalid(
                    "notify.webhook_endpoint must be an http(s) URL".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Returns the configured SLA window, in whole days, for a symbolic
    /// case-type key (`"onboarding"`, `"invoice"`, `"payment"`, `"soa"`, or
    /// any other value, which falls back to `other`).
    #[must_use]
    pub fn sla_window_days_for(&self, case_type: &str) -> u32 {
        match case_type {
            "onboarding" => self.policy.sla_window_days.onboarding,
            "invoice" => self.policy.sla_window_days.invoice,
            "payment" => self.policy.sla_window_days.payment,
            "soa" => self.policy.sla_window_days.soa,
            _ => self.policy.sla_window_days.other,
        }
    }
}

/// Per-tenant configuration overlays, keyed by tenant display name or id
/// string; currently only the break-glass contact is tenant-overridable
/// (spec.md §4.1 escalation level 3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TenantOverrides {
    /// Tenant key to break-glass contact override.
    pub break_glass_contacts: BTreeMap<String, String>,
}

impl TenantOverrides {
    /// Resolves the break-glass contact for a tenant, falling back to the
    /// process-wide default.
    #[must_use]
    pub fn break_glass_contact_for<'a>(&'a self, tenant_key: &str, default: &'a str) -> &'a str {
        self.break_glass_contacts.get(tenant_key).map_or(default, String::as_str)
    }
}

// ============================================================================
// SECTION: Environment Helpers
// ============================================================================

fn env_var(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn env_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env_var(name) {
        None => Ok(None),
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|err| ConfigError::InvalidEnv { name, detail: err.to_string() }),
    }
}

fn env_i64(name: &'static str) -> Result<Option<i64>, ConfigError> {
    match env_var(name) {
        None => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|err| ConfigError::InvalidEnv { name, detail: err.to_string() }),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn minimal_valid_toml() -> &'static str {
        r#"
        [object_store]
        backend = "local_filesystem"
        bucket = "vmp-evidence"
        signing_key = "test-signing-key"

        [session]
        cookie_secret = "test-cookie-secret"
        "#
    }

    #[test]
    fn loads_defaults_for_omitted_sections() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(file, "{}", minimal_valid_toml()).expect("write");
        let config = VmpConfig::load(file.path()).expect("valid config");
        assert_eq!(config.policy.sla_window_days, SlaWindowDays::default());
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn empty_signing_key_fails_closed() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(file, "[session]\ncookie_secret = \"x\"\n").expect("write");
        let err = VmpConfig::load(file.path()).expect_err("missing signing key");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = VmpConfig::load(Path::new("/nonexistent/vmp.toml")).expect_err("missing file");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(file, "this is not valid toml = = =").expect("write");
        let err = VmpConfig::load(file.path()).expect_err("malformed toml");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn s3_backend_requires_region() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"
            [object_store]
            backend = "s3"
            bucket = "vmp-evidence"
            signing_key = "k"

            [session]
            cookie_secret = "s"
            "#
        )
        .expect("write");
        let err = VmpConfig::load(file.path()).expect_err("s3 without region");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn invalid_webhook_scheme_is_rejected() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"
            [object_store]
            backend = "local_filesystem"
            bucket = "vmp-evidence"
            signing_key = "k"

            [session]
            cookie_secret = "s"

            [notify]
            webhook_endpoint = "ftp://example.invalid/hook"
            "#
        )
        .expect("write");
        let err = VmpConfig::load(file.path()).expect_err("bad scheme");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn sla_window_lookup_falls_back_to_other() {
        let config = VmpConfig::default();
        assert_eq!(config.sla_window_days_for("invoice"), 3);
        assert_eq!(config.sla_window_days_for("contract"), 5);
        assert_eq!(config.sla_window_days_for("unknown"), 5);
    }

    #[test]
    fn tenant_override_falls_back_to_default() {
        let mut overrides = TenantOverrides::default();
        overrides.break_glass_contacts.insert("tenant-a".to_string(), "a@escalation.invalid".to_string());
        assert_eq!(overrides.break_glass_contact_for("tenant-a", "default@x"), "a@escalation.invalid");
        assert_eq!(overrides.break_glass_contact_for("tenant-b", "default@x"), "default@x");
    }
}
