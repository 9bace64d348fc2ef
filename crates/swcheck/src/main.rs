//! swcheck command-line launcher
//!
//! - `check`/`pdi`: one-off checks, exit code 0 (OK), 1 (NOK), 2 (no verdict)
//! - `watch`: folder watch pipeline until Ctrl-C
//! - `history`, `status`, `config`, `smac`: inspection and utilities

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use swcheck::config::CheckerConfig;
use swcheck_logging::LogConfig;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "swcheck", version, about = "Software identifier checker")]
struct Cli {
    /// Configuration file (default: <swcheck home>/config.toml)
    #[arg(long, global = true, env = "SWCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the newest report for a code, or a given report file
    Check(cli::check::CheckArgs),

    /// Compare spreadsheet (PDI) values against the settings record
    Pdi(cli::pdi::PdiArgs),

    /// Watch the reports folder and check every new report
    Watch(cli::watch::WatchArgs),

    /// Show the results history
    History(cli::history::HistoryArgs),

    /// Write a SMAC JSON document for a set of settings ids
    Smac(cli::smac::SmacArgs),

    /// Show whether the configured folders are usable
    Status(cli::status::StatusArgs),

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        command: cli::config::ConfigCommand,
    },
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Check(args) => args.json,
        Commands::Pdi(args) => args.json,
        Commands::History(args) => args.json,
        Commands::Status(args) => args.json,
        Commands::Config {
            command: cli::config::ConfigCommand::Show { json },
        } => *json,
        Commands::Watch(_) | Commands::Smac(_) | Commands::Config { .. } => false,
    }
}

fn run_command(cli: Cli) -> Result<ExitCode> {
    let config_path = match cli.config {
        Some(path) => path,
        None => CheckerConfig::default_path()?,
    };
    let config = CheckerConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    match cli.command {
        Commands::Check(args) => cli::check::run(&config, args),
        Commands::Pdi(args) => cli::pdi::run(&config, args),
        Commands::Watch(args) => {
            cli::watch::run(&config, &config_path, args).map(|()| ExitCode::SUCCESS)
        }
        Commands::History(args) => cli::history::run(&config, args).map(|()| ExitCode::SUCCESS),
        Commands::Smac(args) => cli::smac::run(args).map(|()| ExitCode::SUCCESS),
        Commands::Status(args) => {
            cli::status::run(&config, &config_path, args).map(|()| ExitCode::SUCCESS)
        }
        Commands::Config { command } => {
            cli::config::run(&config, &config_path, command).map(|()| ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = command_wants_json(&cli.command);

    if let Err(err) = swcheck_logging::init_logging(LogConfig {
        app_name: "swcheck",
        verbose: cli.verbose,
        log_dir: None,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli) {
        Ok(code) => code,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprintln!("{:?}", err);
            }
            ExitCode::from(cli::EXIT_CHECK_FAILED)
        }
    }
}
