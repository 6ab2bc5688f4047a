// crates/ragpoint-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing, log filters, and user add.
// Purpose: Ensure the binary defaults to serving and offline commands fail closed.
// Dependencies: ragpoint-cli main helpers
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use clap::Parser;
use ragpoint_config::LoggingConfig;
use ragpoint_config::RagpointConfig;
use ragpoint_core::Username;
use ragpoint_core::verify_password;
use ragpoint_server::build_catalog;
use tracing_subscriber::filter::LevelFilter;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::UserCommand;
use super::add_user;
use super::log_filter;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn sqlite_config(dir: &tempfile::TempDir) -> RagpointConfig {
    let toml = format!("[catalog]\ntype = \"sqlite\"\npath = {:?}\n", dir.path().join("catalog.db"));
    RagpointConfig::from_toml(&toml).unwrap()
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn bare_invocation_has_no_subcommand() {
    let cli = Cli::try_parse_from(["ragpoint"]).unwrap();
    assert!(cli.command.is_none());
    assert!(!cli.show_version);
}

#[test]
fn version_flag_is_global() {
    let cli = Cli::try_parse_from(["ragpoint", "serve", "--version"]).unwrap();
    assert!(cli.show_version);
}

#[test]
fn user_add_parses_all_flags() {
    let cli = Cli::try_parse_from([
        "ragpoint",
        "user",
        "add",
        "--username",
        "root",
        "--password-env",
        "ROOT_PASSWORD",
        "--admin",
        "--config",
        "ragpoint.toml",
    ])
    .unwrap();
    let Some(Commands::User {
        command: UserCommand::Add(command),
    }) = cli.command
    else {
        panic!("expected user add");
    };
    assert_eq!(command.username, "root");
    assert_eq!(command.password_env, "ROOT_PASSWORD");
    assert!(command.admin);
    assert_eq!(command.config.unwrap().to_str(), Some("ragpoint.toml"));
}

#[test]
fn config_validate_accepts_path() {
    let cli = Cli::try_parse_from(["ragpoint", "config", "validate", "--config", "x.toml"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Config {
            command: ConfigCommand::Validate(_)
        })
    ));
}

#[test]
fn user_add_requires_password_env() {
    assert!(Cli::try_parse_from(["ragpoint", "user", "add", "--username", "root"]).is_err());
}

// ============================================================================
// SECTION: Logging
// ============================================================================

#[test]
fn log_filter_prefers_rust_log() {
    let logging = LoggingConfig {
        level: "WARN".to_string(),
    };
    let from_config = log_filter(None, &logging).unwrap();
    assert_eq!(from_config.max_level_hint(), Some(LevelFilter::WARN));
    let from_env = log_filter(Some("debug"), &logging).unwrap();
    assert_eq!(from_env.max_level_hint(), Some(LevelFilter::DEBUG));
    let blank_env = log_filter(Some("  "), &logging).unwrap();
    assert_eq!(blank_env.max_level_hint(), Some(LevelFilter::WARN));
}

// ============================================================================
// SECTION: User Add
// ============================================================================

#[test]
fn add_user_persists_to_sqlite_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(&dir);
    let user = add_user(&config, Username::parse("root").unwrap(), "hunter2", true).unwrap();
    assert!(user.is_admin);

    let catalog = build_catalog(&config.catalog).unwrap();
    let stored = catalog.get_user(&user.username).unwrap().unwrap();
    assert!(verify_password("hunter2", &stored.password_hash));

    let duplicate = add_user(&config, Username::parse("root").unwrap(), "other", false);
    assert!(duplicate.unwrap_err().to_string().starts_with("user add failed"));
}

#[test]
fn add_user_rejects_memory_catalog() {
    let config = RagpointConfig::from_toml("[catalog]\ntype = \"memory\"\n").unwrap();
    let err = add_user(&config, Username::parse("root").unwrap(), "pw", false).unwrap_err();
    assert!(err.to_string().contains("sqlite catalog"));
}
