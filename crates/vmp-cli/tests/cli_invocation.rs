// crates/vmp-cli/tests/cli_invocation.rs
// ============================================================================
// Module: CLI Invocation Tests
// Description: Process-level tests for the `vmp` binary's config handling.
// Dependencies: vmp-cli binary
// ============================================================================

//! ## Overview
//! Exercises the CLI as an external process rather than through its
//! internal functions, the way the teacher's own `serve_command.rs`
//! validated its binary's startup behavior.

#![allow(clippy::unwrap_used, reason = "Test-only process assertions.")]

use std::path::PathBuf;
use std::process::Command;

fn vmp_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_vmp"))
}

#[test]
fn serve_with_malformed_config_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("vmp.toml");
    std::fs::write(&config_path, "this is not valid toml = = =").unwrap();

    let output =
        Command::new(vmp_bin()).args(["serve", "--config", config_path.to_string_lossy().as_ref()]).output().unwrap();

    assert!(!output.status.success());
}

#[test]
fn serve_with_missing_required_fields_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("vmp.toml");
    // No [object_store].signing_key or [session].cookie_secret: both are
    // required for VmpConfig::validate to pass (spec.md §6 "Environment
    // inputs").
    std::fs::write(&config_path, "[server]\nbind_addr = \"127.0.0.1:0\"\n").unwrap();

    let output =
        Command::new(vmp_bin()).args(["serve", "--config", config_path.to_string_lossy().as_ref()]).output().unwrap();

    assert!(!output.status.success());
}

#[test]
fn no_subcommand_prints_help_and_fails() {
    let output = Command::new(vmp_bin()).output().unwrap();
    assert!(!output.status.success());
}
