// crates/ragpoint-cli/src/main.rs
// ============================================================================
// Module: Ragpoint CLI Entry Point
// Description: Command dispatcher for serving and administering Ragpoint.
// Purpose: Start the REST server and manage configuration and users offline.
// Dependencies: clap, ragpoint-config, ragpoint-core, ragpoint-server, tokio,
//               tracing-subscriber
// ============================================================================

//! ## Overview
//! The `ragpoint` binary loads configuration, initializes logging, and runs
//! the REST server. Without a subcommand it serves with default settings so
//! container images can start it without arguments. Offline commands validate
//! configuration and add users directly to the `SQLite` catalog.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use ragpoint_config::CatalogKind;
use ragpoint_config::LoggingConfig;
use ragpoint_config::RagpointConfig;
use ragpoint_config::config_toml_example;
use ragpoint_core::NewUser;
use ragpoint_core::UserRecord;
use ragpoint_core::Username;
use ragpoint_core::hash_password;
use ragpoint_server::RagpointServer;
use ragpoint_server::ServerError;
use ragpoint_server::build_catalog;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding an explicit tracing filter.
const RUST_LOG_ENV: &str = "RUST_LOG";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "ragpoint", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand; serves with defaults when absent.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Ragpoint REST server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// User administration utilities.
    User {
        /// Selected user subcommand.
        #[command(subcommand)]
        command: UserCommand,
    },
}

/// Configuration for the `serve` command.
#[derive(Args, Debug, Default)]
struct ServeCommand {
    /// Optional config file path (defaults to ragpoint.toml or `RAGPOINT_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigValidateCommand),
    /// Print an annotated example configuration.
    Example,
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// User subcommands.
#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Add a user to the catalog.
    Add(UserAddCommand),
}

/// Arguments for `user add`.
#[derive(Args, Debug)]
struct UserAddCommand {
    /// Optional config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Username to create.
    #[arg(long, value_name = "NAME")]
    username: String,
    /// Environment variable holding the password.
    #[arg(long = "password-env", value_name = "VAR")]
    password_env: String,
    /// Grant administrator rights.
    #[arg(long, action = ArgAction::SetTrue)]
    admin: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("ragpoint {version}"))?;
        return Ok(ExitCode::SUCCESS);
    }

    match cli.command.unwrap_or_else(|| Commands::Serve(ServeCommand::default())) {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::User {
            command,
        } => command_user(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    init_logging(&config.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting ragpoint");

    let server = tokio::task::spawn_blocking(move || {
        let server = RagpointServer::from_config(config)?;
        server.bootstrap_admin(|key| std::env::var(key).ok())?;
        Ok::<_, ServerError>(server)
    })
    .await
    .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
    .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;

    Ok(ExitCode::SUCCESS)
}

/// Installs the stderr tracing subscriber.
fn init_logging(logging: &LoggingConfig) -> CliResult<()> {
    let rust_log = std::env::var(RUST_LOG_ENV).ok();
    let filter = log_filter(rust_log.as_deref(), logging)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init()
        .map_err(|err| CliError::new(format!("logging init failed: {err}")))
}

/// Builds the log filter; `RUST_LOG` takes precedence over `logging.level`.
fn log_filter(rust_log: Option<&str>, logging: &LoggingConfig) -> CliResult<EnvFilter> {
    let directive = rust_log
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| logging.directive(), str::to_string);
    EnvFilter::try_new(&directive)
        .map_err(|err| CliError::new(format!("invalid log filter {directive}: {err}")))
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => {
            load_config(command.config.as_deref())?;
            write_stdout_line("config valid")?;
        }
        ConfigCommand::Example => write_stdout_line(&config_toml_example())?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Loads and validates configuration with environment overrides.
fn load_config(path: Option<&Path>) -> CliResult<RagpointConfig> {
    RagpointConfig::load(path).map_err(|err| CliError::new(format!("config load failed: {err}")))
}

// ============================================================================
// SECTION: User Commands
// ============================================================================

/// Dispatches user subcommands.
fn command_user(command: UserCommand) -> CliResult<ExitCode> {
    match command {
        UserCommand::Add(command) => {
            let config = load_config(command.config.as_deref())?;
            let username = Username::parse(&command.username)
                .map_err(|err| CliError::new(format!("invalid username: {err}")))?;
            let password = std::env::var(&command.password_env).map_err(|_| {
                CliError::new(format!("password variable {} is not set", command.password_env))
            })?;
            let user = add_user(&config, username, &password, command.admin)?;
            write_stdout_line(&format!(
                "user {} created{}",
                user.username,
                if user.is_admin { " (admin)" } else { "" }
            ))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Creates a user in the configured persistent catalog.
fn add_user(
    config: &RagpointConfig,
    username: Username,
    password: &str,
    is_admin: bool,
) -> CliResult<UserRecord> {
    if config.catalog.kind == CatalogKind::Memory {
        return Err(CliError::new(
            "user add requires a sqlite catalog; memory catalogs do not persist".to_string(),
        ));
    }
    let catalog = build_catalog(&config.catalog)
        .map_err(|err| CliError::new(format!("catalog open failed: {err}")))?;
    let password_hash = hash_password(password)
        .map_err(|err| CliError::new(format!("password rejected: {err}")))?;
    catalog
        .create_user(NewUser {
            username,
            password_hash,
            is_admin,
        })
        .map_err(|err| CliError::new(format!("user add failed: {err}")))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
