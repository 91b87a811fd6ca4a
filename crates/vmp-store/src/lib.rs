// crates/vmp-store/src/lib.rs
// ============================================================================
// Crate: vmp-store
// Description: rusqlite-backed implementation of every vmp-core storage
//              trait, behind a single `SqliteStore` type.
// ============================================================================

//! ## Overview
//! `vmp-store` is the only crate that knows SQL exists. It implements
//! [`vmp_core::interfaces::Store`] on [`store::SqliteStore`] and translates
//! every SQLite failure into [`vmp_core::CoreError`] at the trait boundary
//! (`store::StoreError`'s `From` impl); nothing downstream ever matches on
//! `rusqlite::Error`.

pub mod store;

pub use store::SqliteStore;
pub use store::StoreError;
