// crates/vmp-core/src/lib.rs
// ============================================================================
// Crate: vmp-core
// Description: Domain model and pure business logic for the Vendor
//              Management Portal: supplier case lifecycle, message thread,
//              conditional checklist engine, evidence vault, and SOA
//              reconciliation engine.
// ============================================================================

//! ## Overview
//! `vmp-core` holds every type and decision function the Vendor Management
//! Portal needs, with no I/O. Storage, object storage, and notification
//! delivery are trait seams in [`interfaces`]; `vmp-store`, `vmp-objectstore`,
//! and `vmp-notify` implement them, and `vmp-http`/`vmp-cli` wire the
//! implementations to the HTTP surface and the SLA ticker.
//!
//! Module map:
//! - [`ids`] opaque identifiers for every entity
//! - [`time`] UTC wall-clock timestamps
//! - [`error`] the single `CoreError` surfaced at the HTTP boundary
//! - [`model`] entity data types, grouped by component
//! - [`case`] case status machine, SLA defaults, escalation
//! - [`thread`] message-thread rules
//! - [`checklist`] conditional checklist rule table and step transitions
//! - [`evidence`] evidence vault versioning, keys, and digests
//! - [`soa`] SOA statement matcher and sign-off gate
//! - [`notify`] notification drafts and SLA-posture transition detection
//! - [`auth`] tenant/vendor/internal authorization checks
//! - [`interfaces`] backend trait seams

pub mod auth;
pub mod case;
pub mod checklist;
pub mod error;
pub mod evidence;
pub mod ids;
pub mod interfaces;
pub mod model;
pub mod notify;
pub mod soa;
pub mod thread;
pub mod time;

pub use error::CoreError;
pub use error::CoreResult;
