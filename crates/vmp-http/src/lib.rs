// crates/vmp-http/src/lib.rs
// ============================================================================
// Crate: vmp-http
// Description: The axum router implementing the portal's endpoint surface
//              (spec.md §6).
// Dependencies: axum, tower, tower-http, vmp-core
// ============================================================================

//! ## Overview
//! `router` wires every handler in this crate onto its path and method;
//! `serve` binds a listener and runs the router to completion, honoring a
//! graceful shutdown on SIGINT/SIGTERM. Every route except `/login` goes
//! through [`session::ActorExtractor`] for actor resolution; authorization
//! beyond that (tenant scope, vendor scope, internal-only) is each
//! handler's own responsibility via `vmp_core::auth`.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod cases;
pub mod checklist;
pub mod cookie;
pub mod deadline;
pub mod error;
pub mod evidence;
pub mod messages;
pub mod notifications;
pub mod session;
pub mod soa;
pub mod state;

use state::AppState;

/// Builds the application router, every route bound to `state`
/// (spec.md §6).
#[must_use]
pub fn router(state: AppState) -> Router {
    let request_deadline = Duration::from_secs(state.config.server.request_deadline_secs);

    Router::new()
        .route("/login", post(session::login))
        .route("/logout", post(session::logout))
        .route("/cases", get(cases::list_cases).post(cases::create_case))
        .route("/cases/{id}", get(cases::get_case))
        .route("/cases/{id}/status", post(cases::set_status))
        .route("/cases/{id}/reassign", post(cases::reassign))
        .route("/cases/{id}/escalate", post(cases::escalate))
        .route("/cases/{id}/messages", get(messages::list_messages).post(messages::append_message))
        .route("/cases/{id}/checklist", get(checklist::list_checklist))
        .route("/cases/{id}/checklist/{step}/verify", post(checklist::verify_step))
        .route("/cases/{id}/checklist/{step}/reject", post(checklist::reject_step))
        .route("/cases/{id}/checklist/{step}/waive", post(checklist::waive_step))
        .route("/cases/{id}/evidence", get(evidence::list_evidence).post(evidence::upload_evidence))
        .route("/soa/ingest", post(soa::ingest))
        .route("/soa/{case}/lines", get(soa::list_lines))
        .route("/soa/{case}/recompute", post(soa::recompute))
        .route("/soa/{case}/signoff", post(soa::signoff))
        .route("/soa/{case}/lines/{line}/match", post(soa::match_line_manually))
        .route("/soa/{case}/lines/{line}/dispute", post(soa::dispute_line))
        .route("/soa/{case}/lines/{line}/evidence", post(soa::upload_line_evidence))
        .route("/soa/{case}/issues/{issue}/resolve", post(soa::resolve_issue))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(TimeoutLayer::new(request_deadline)))
        .with_state(state)
}

/// Serves the router on `bind_addr` until a shutdown signal arrives
/// (SPEC_FULL.md §3 ambient stack; spec.md §9 "the host process owns
/// binding, TLS termination, and graceful shutdown").
///
/// # Errors
///
/// Returns an I/O error if the listener cannot bind, or if the server
/// exits abnormally.
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let addr: SocketAddr = state
        .config
        .server
        .bind_addr
        .parse()
        .map_err(|error| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("invalid bind address: {error}")))?;
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "vmp-http listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            return;
        };
        signal.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("vmp-http shutting down");
}
