// crates/vmp-cli/src/main.rs
// ============================================================================
// Module: VMP CLI Entry Point
// Description: Command dispatcher for the Vendor Management Portal process:
//              `serve` runs the axum HTTP surface, `ticker` runs the SLA
//              Ticker sweep standalone (spec.md §4.7, §5).
// Dependencies: clap, tokio, tracing, vmp-config, vmp-core, vmp-http,
//               vmp-notify, vmp-objectstore, vmp-store
// ============================================================================

//! ## Overview
//! Both subcommands load the same [`vmp_config::VmpConfig`] and wire the
//! same backend implementations (`vmp-store`'s `SqliteStore`, one of
//! `vmp-objectstore`'s two `ObjectStore` backends, `vmp-notify`'s
//! `CompositeDispatcher`); `serve` hands the result to
//! [`vmp_http::serve`], `ticker` hands it to [`ticker::run`]. Running both
//! as separate processes lets the ticker's 15-minute sweep and the
//! request-serving loop scale independently (spec.md §5 "the SLA Ticker is
//! a long-running background task on its own scheduling slot").

mod ticker;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;
use vmp_config::ConfigError;
use vmp_config::ObjectStoreBackend;
use vmp_config::TenantOverrides;
use vmp_config::VmpConfig;
use vmp_core::interfaces::NotificationSink;
use vmp_core::interfaces::ObjectStore;
use vmp_core::interfaces::Store;
use vmp_notify::CompositeDispatcher;
use vmp_notify::WebhookSink;
use vmp_objectstore::LocalObjectStore;
use vmp_objectstore::S3ObjectStore;
use vmp_store::SqliteStore;
use vmp_store::StoreError;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "vmp", disable_help_subcommand = true, arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the portal's HTTP surface (spec.md §6).
    Serve(ServeArgs),
    /// Run the SLA Ticker sweep standalone, in its own process
    /// (spec.md §4.7, §5).
    Ticker(TickerArgs),
}

/// Shared process-wiring arguments for both subcommands.
#[derive(Args, Debug)]
struct CommonArgs {
    /// Path to a TOML config file. When omitted, configuration comes from
    /// `VMP_`-prefixed environment variables and built-in defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Path to a TOML file of per-tenant break-glass contact overrides
    /// (spec.md §4.1 escalation level 3). Omitted ⇒ no overrides.
    #[arg(long, value_name = "PATH")]
    tenant_overrides: Option<PathBuf>,
}

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    common: CommonArgs,
}

/// Arguments for the `ticker` command.
#[derive(Args, Debug)]
struct TickerArgs {
    #[command(flatten)]
    common: CommonArgs,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Top-level CLI error, covering every failure mode before the selected
/// subcommand's own loop takes over.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration could not be loaded or failed validation.
    #[error("loading configuration: {0}")]
    Config(#[from] ConfigError),
    /// The tenant-overrides file could not be read or parsed.
    #[error("loading tenant overrides: {0}")]
    TenantOverrides(String),
    /// The relational store could not be opened.
    #[error("opening store: {0}")]
    Store(#[from] StoreError),
    /// The HTTP server failed to bind or exited abnormally.
    #[error("serving: {0}")]
    Serve(#[from] std::io::Error),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "vmp exited with an error");
            ExitCode::FAILURE
        }
    }
}

/// Dispatches the selected subcommand.
async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => {
            let state = build_state(&args.common).await?;
            vmp_http::serve(state).await.map_err(CliError::from)
        }
        Commands::Ticker(args) => {
            let state = build_state(&args.common).await?;
            ticker::run(state).await;
            Ok(())
        }
    }
}

// ============================================================================
// SECTION: Process Wiring
// ============================================================================

/// Loads configuration and constructs [`vmp_http::state::AppState`] from
/// it, selecting the object-store backend per
/// `config.object_store.backend` (spec.md §9 "injected store handle").
async fn build_state(common: &CommonArgs) -> Result<vmp_http::state::AppState, CliError> {
    let config = load_config(common.config.as_deref())?;
    let tenant_overrides = load_tenant_overrides(common.tenant_overrides.as_deref())?;

    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&config.store.url)?);
    let objects: Arc<dyn ObjectStore> = build_object_store(&config).await;
    let notifier: Arc<dyn NotificationSink> = build_notifier(&config);

    Ok(vmp_http::state::AppState::new(store, objects, notifier, Arc::new(config), Arc::new(tenant_overrides)))
}

/// Loads [`VmpConfig`] from a file if one was given, otherwise from the
/// environment and defaults alone.
fn load_config(path: Option<&std::path::Path>) -> Result<VmpConfig, ConfigError> {
    match path {
        Some(path) => VmpConfig::load(path),
        None => VmpConfig::load_from_env(),
    }
}

/// Loads [`TenantOverrides`] from a file if one was given, otherwise the
/// empty default (no tenant-specific break-glass contacts).
fn load_tenant_overrides(path: Option<&std::path::Path>) -> Result<TenantOverrides, CliError> {
    let Some(path) = path else {
        return Ok(TenantOverrides::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|error| CliError::TenantOverrides(format!("reading {}: {error}", path.display())))?;
    toml::from_str(&text).map_err(|error| CliError::TenantOverrides(format!("parsing {}: {error}", path.display())))
}

/// Constructs the configured [`ObjectStore`] backend.
async fn build_object_store(config: &VmpConfig) -> Arc<dyn ObjectStore> {
    match config.object_store.backend {
        ObjectStoreBackend::LocalFilesystem => {
            let root = config.object_store.local_root.clone().unwrap_or_else(|| "./vmp-evidence".to_string());
            let base_url = format!("http://{}/evidence/blobs", config.server.bind_addr);
            Arc::new(LocalObjectStore::new(root, base_url, config.object_store.signing_key.as_bytes().to_vec()))
        }
        ObjectStoreBackend::S3 => {
            // `from_env` resolves region/credentials through the standard
            // AWS SDK provider chain; `vmp-config` validates at load time
            // that a region is present for this backend.
            let store = S3ObjectStore::from_env(config.object_store.bucket.clone(), config.object_store.endpoint.as_deref()).await;
            Arc::new(store)
        }
    }
}

/// Constructs the configured [`NotificationSink`]: the log sink always,
/// plus an HTTP webhook sink when `config.notify.webhook_endpoint` is set
/// (spec.md §4.7).
fn build_notifier(config: &VmpConfig) -> Arc<dyn NotificationSink> {
    let mut additional: Vec<Arc<dyn NotificationSink>> = Vec::new();
    if let Some(endpoint) = &config.notify.webhook_endpoint {
        additional.push(Arc::new(WebhookSink::new(endpoint.clone())));
    }
    Arc::new(CompositeDispatcher::new(additional))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_parses_with_no_arguments() {
        let cli = Cli::parse_from(["vmp", "serve"]);
        assert!(matches!(cli.command, Commands::Serve(_)));
    }

    #[test]
    fn ticker_accepts_a_config_path() {
        let cli = Cli::parse_from(["vmp", "ticker", "--config", "vmp.toml"]);
        let Commands::Ticker(args) = cli.command else {
            panic!("expected ticker command");
        };
        assert_eq!(args.common.config, Some(PathBuf::from("vmp.toml")));
    }

    #[test]
    fn missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["vmp"]).is_err());
    }
}
