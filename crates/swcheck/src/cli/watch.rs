//! `swcheck watch` - run the folder watch pipeline until Ctrl-C

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use super::error::HelpfulError;
use super::start_bus;
use swcheck::config::CheckerConfig;
use swcheck::watch::{start_watching, CancellationToken};

#[derive(Debug, clap::Args)]
pub struct WatchArgs {}

pub fn run(config: &CheckerConfig, config_path: &Path, _args: WatchArgs) -> Result<()> {
    let status = config.status();
    if !status.is_ready() {
        return Err(HelpfulError::setup_required(&status, config_path).into());
    }

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        info!("Received Ctrl+C, stopping watch...");
        handler_token.cancel();
    })
    .context("Failed to install Ctrl+C handler")?;

    let bus = start_bus(config)?;
    let handle = start_watching(config, bus.publisher(), cancel.clone())?;

    if let Some(reports) = &config.reports_folder {
        println!("Watching {} (Ctrl+C to stop)", reports.display());
    }
    while !cancel.sleep(Duration::from_secs(1)) {}

    handle.join();
    bus.shutdown();
    println!("Watch stopped.");
    Ok(())
}
