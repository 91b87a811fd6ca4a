// crates/vmp-http/src/state.rs
// ============================================================================
// Module: Application State
// Description: The shared, cloneable handle every handler extracts
//              (spec.md §9 "injected store handle").
// Dependencies: vmp-core, vmp-config
// ============================================================================

//! ## Overview
//! `AppState` is the one object a handler needs: the store, the object
//! store, the notification sink, and the loaded configuration, all behind
//! `Arc` so cloning the state per-request is cheap.

use std::sync::Arc;

use vmp_config::TenantOverrides;
use vmp_config::VmpConfig;
use vmp_core::interfaces::NotificationSink;
use vmp_core::interfaces::ObjectStore;
use vmp_core::interfaces::Store;

/// Shared application state, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Relational storage handle.
    pub store: Arc<dyn Store>,
    /// Evidence blob storage handle.
    pub objects: Arc<dyn ObjectStore>,
    /// Notification delivery handle.
    pub notifier: Arc<dyn NotificationSink>,
    /// Loaded process configuration.
    pub config: Arc<VmpConfig>,
    /// Per-tenant break-glass contact overlays (spec.md §4.1 escalation
    /// level 3).
    pub tenant_overrides: Arc<TenantOverrides>,
}

impl AppState {
    /// Builds application state from its components.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        objects: Arc<dyn ObjectStore>,
        notifier: Arc<dyn NotificationSink>,
        config: Arc<VmpConfig>,
        tenant_overrides: Arc<TenantOverrides>,
    ) -> Self {
        Self { store, objects, notifier, config, tenant_overrides }
    }
}
