// crates/tool-bridge-cli/src/main.rs
// ============================================================================
// Module: Tool Bridge CLI
// Description: Command-line entry point for the Tool Bridge MCP server.
// Purpose: Serve the sample host over MCP and inspect its tool catalog.
// Dependencies: clap, tokio, tool-bridge-{cli,config,core,mcp}
// ============================================================================

//! ## Overview
//! The `tool-bridge` binary offers three commands:
//! - `serve`: loads configuration, builds the sample host registry, and
//!   serves it over the configured MCP transport.
//! - `catalog`: prints the tool catalog as JSON, optionally filtered to what
//!   a caller at a given role would see.
//! - `config validate`: loads and validates configuration.
//!
//! Security posture: CLI inputs are untrusted; configuration is validated
//! before any server state is built.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;
use tool_bridge_cli::build_registry;
use tool_bridge_cli::catalog_entries;
use tool_bridge_cli::users::UserStore;
use tool_bridge_config::ServerTransport;
use tool_bridge_config::ToolBridgeConfig;
use tool_bridge_core::RoleLevel;
use tool_bridge_mcp::McpServer;

// ============================================================================
// SECTION: CLI Definitions
// ============================================================================

/// Tool Bridge command-line interface.
#[derive(Parser, Debug)]
#[command(name = "tool-bridge", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print the binary version and exit.
    #[arg(long = "version", short = 'V')]
    show_version: bool,
    /// Selected subcommand.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the sample host over MCP.
    Serve(ServeCommand),
    /// Print the tool catalog as JSON.
    Catalog(CatalogCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `serve`.
#[derive(clap::Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to tool-bridge.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `catalog`.
#[derive(clap::Args, Debug)]
struct CatalogCommand {
    /// Optional config file path (defaults to tool-bridge.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Show only the tools visible to this role (Viewer, Member, Manager, Admin).
    #[arg(long, value_name = "ROLE")]
    role: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(clap::Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to tool-bridge.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI failures.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration could not be loaded.
    #[error("failed to load config: {0}")]
    Config(String),
    /// The registry could not be built.
    #[error("failed to build tool registry: {0}")]
    Registry(String),
    /// Command-line input was rejected.
    #[error("invalid argument: {0}")]
    Input(String),
    /// The server failed to start or stopped with an error.
    #[error("server failed: {0}")]
    Server(String),
    /// Writing to stdout or stderr failed.
    #[error("failed to write {stream}: {error}")]
    Output {
        /// Stream label.
        stream: &'static str,
        /// I/O error text.
        error: String,
    },
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
        write_stdout_line(&format!("tool-bridge {}", env!("CARGO_PKG_VERSION")))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };
    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Catalog(command) => command_catalog(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let store = Arc::new(UserStore::seeded());
    let registry =
        build_registry(&config, &store).map_err(|err| CliError::Registry(err.to_string()))?;
    if config.server.transport == ServerTransport::Http {
        let bind = config.server.bind_addr().map_err(|err| CliError::Config(err.to_string()))?;
        write_stderr_line(&format!(
            "tool-bridge: serving {} tools over http at {bind}{}",
            registry.len(),
            config.server.endpoint_path
        ))?;
    }
    let server =
        McpServer::from_config(config, registry).map_err(|err| CliError::Server(err.to_string()))?;
    server.serve().await.map_err(|err| CliError::Server(err.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Catalog Command
// ============================================================================

/// Executes the `catalog` command.
fn command_catalog(command: &CatalogCommand) -> CliResult<ExitCode> {
    let role = command.role.as_deref().map(parse_role).transpose()?;
    let config = load_config(command.config.as_deref())?;
    let store = Arc::new(UserStore::seeded());
    let registry =
        build_registry(&config, &store).map_err(|err| CliError::Registry(err.to_string()))?;
    let entries = catalog_entries(&registry, role);
    let rendered = serde_json::to_string_pretty(&entries).map_err(|err| CliError::Output {
        stream: "stdout",
        error: err.to_string(),
    })?;
    write_stdout_line(&rendered)?;
    Ok(ExitCode::SUCCESS)
}

/// Parses a role level name.
fn parse_role(value: &str) -> CliResult<RoleLevel> {
    value.parse::<RoleLevel>().map_err(|err| CliError::Input(err.to_string()))
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = load_config(command.config.as_deref())?;
    write_stdout_line("config ok")?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads configuration using the default resolution rules.
fn load_config(path: Option<&std::path::Path>) -> CliResult<ToolBridgeConfig> {
    ToolBridgeConfig::load(path).map_err(|err| CliError::Config(err.to_string()))
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| output_error("stdout", &err))?;
    write_stdout_line("")
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| output_error("stdout", &err))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}").map_err(|err| output_error("stderr", &err))
}

/// Builds an output error.
fn output_error(stream: &'static str, error: &std::io::Error) -> CliError {
    CliError::Output {
        stream,
        error: error.to_string(),
    }
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
    ExitCode::FAILURE
}
