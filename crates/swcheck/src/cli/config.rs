//! `swcheck config` - show or create the configuration file

use anyhow::{bail, Context, Result};
use std::path::Path;

use swcheck::config::CheckerConfig;

#[derive(Debug, clap::Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show {
        /// Output as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(config: &CheckerConfig, config_path: &Path, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("# {}", config_path.display());
                print!("{}", toml::to_string_pretty(config)?);
            }
        }
        ConfigCommand::Init { force } => {
            if config_path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            CheckerConfig::default()
                .save(config_path)
                .with_context(|| format!("Failed to write {}", config_path.display()))?;
            println!("Wrote {}", config_path.display());
        }
    }
    Ok(())
}
