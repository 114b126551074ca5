//! TileFarm CLI - split render jobs into tiles and reassemble the results.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tilefarm::config::{ConfigFile, ConfigKey};
use tilefarm::logging::{init_logging, LogConfig};

use commands::assemble::AssembleArgs;
use commands::config::ConfigCommands;
use commands::plan::PlanArgs;
use commands::submit::SubmitArgs;
use commands::validate::ValidateArgs;

#[derive(Debug, Parser)]
#[command(
    name = "tilefarm",
    version,
    about = "Split render jobs into tiles for distributed rendering, then reassemble the results"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); overrides --log-level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log level: trace, debug, info, warn, error, off
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Also write logs to daily files in this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Preview the tile grid and task list for a job
    Plan(PlanArgs),

    /// Build and write a job bundle for the render farm
    Submit(SubmitArgs),

    /// Watch for rendered tiles and stitch them into frames
    Assemble(AssembleArgs),

    /// Compare rendered output against a reference directory
    Validate(ValidateArgs),

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = ConfigFile::load().unwrap_or_default();

    // The guard must outlive all commands or file logging stops early.
    let _guard = match init_logging(&resolve_log_config(&cli, &config)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        command = command_name(&cli.command),
        "tilefarm starting"
    );

    let result = match cli.command {
        Commands::Plan(args) => commands::plan::run(args),
        Commands::Submit(args) => commands::submit::run(args),
        Commands::Assemble(args) => commands::assemble::run(args),
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Plan(_) => "plan",
        Commands::Submit(_) => "submit",
        Commands::Assemble(_) => "assemble",
        Commands::Validate(_) => "validate",
        Commands::Config { .. } => "config",
    }
}

/// Log configuration: CLI flags take precedence over the config file.
fn resolve_log_config(cli: &Cli, config: &ConfigFile) -> LogConfig {
    let mut log_config = LogConfig::new();

    let level = match cli.verbose {
        0 => cli
            .log_level
            .clone()
            .unwrap_or_else(|| ConfigKey::LoggingLevel.get(config)),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    if !level.is_empty() {
        log_config = log_config.with_level(level);
    }

    let directory = cli.log_dir.clone().or_else(|| {
        let configured = ConfigKey::LoggingDirectory.get(config);
        (!configured.is_empty()).then(|| PathBuf::from(configured))
    });
    if let Some(dir) = directory {
        log_config = log_config.with_directory(dir);
    }

    log_config
}
