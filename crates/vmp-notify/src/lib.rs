// crates/vmp-notify/src/lib.rs
// ============================================================================
// Crate: vmp-notify
// Description: Notification delivery: `NotificationSink` implementations
//              and a fan-out dispatcher wiring them together.
// ============================================================================

//! ## Overview
//! `vmp-core` only decides *whether* and *what* to notify ([`vmp_core::notify`]);
//! delivery transport is explicitly out of scope there (spec.md §1). This
//! crate supplies the transport: a log sink that is always wired in, and
//! an optional HTTP webhook sink, fanned out by [`CompositeDispatcher`].
//!
//! - [`sink::log`] structured-log sink, always present.
//! - [`sink::webhook`] best-effort HTTP POST sink.
//! - [`dispatch`] fan-out dispatcher implementing
//!   `vmp_core::interfaces::NotificationSink`.

pub mod dispatch;
pub mod sink;

pub use dispatch::CompositeDispatcher;
pub use sink::log::LogSink;
pub use sink::webhook::WebhookSink;
