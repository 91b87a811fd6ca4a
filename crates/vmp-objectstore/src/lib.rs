// crates/vmp-objectstore/src/lib.rs
// ============================================================================
// Crate: vmp-objectstore
// Description: Evidence blob storage backends implementing
//              `vmp_core::interfaces::ObjectStore`: a local-filesystem
//              backend for dev/test and an S3 backend for production.
// ============================================================================

//! ## Overview
//! Evidence bytes never pass through the relational store (spec.md §4.4,
//! §6 "Object-store layout"). Both backends here honor the same two
//! invariants the trait demands: `put` is create-only (refuses to
//! overwrite an existing key) and `signed_url` issues a time-bounded read
//! URL without handing out standing credentials.
//!
//! - [`local`] filesystem-backed store for dev and integration tests,
//!   signing URLs with an HMAC-SHA256 token since the filesystem has no
//!   native presigning.
//! - [`s3`] S3-backed store for production, using native presigned GET
//!   and a conditional-put emulation (S3's `If-None-Match: *` support is
//!   not universal across providers, so create-only is enforced with a
//!   existence check before the put; see `s3::S3ObjectStore::put`).
//! - [`signing`] shared HMAC token helpers used by the local backend.

pub mod local;
pub mod s3;
pub mod signing;

pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;
