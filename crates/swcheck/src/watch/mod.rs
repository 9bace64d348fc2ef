//! Locating reports and feeding them to the match engine, either from
//! folder events under the reports root or from an operator request.

pub mod layout;
pub mod manual;
pub mod pipeline;
pub mod source;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::warn;

use crate::check::MatchEngine;
use crate::config::CheckerConfig;
use crate::sinks::OutcomePublisher;

pub use layout::{code_for_report, find_report_for_code, is_timestamp_folder, newest_report_in};
pub use manual::{run_manual_check, run_pdi_check, run_report_check, ManualCheckError};
pub use pipeline::{
    FolderDisposition, FolderLedger, FolderWatchPipeline, SkipReason, WatchOptions, WatchedFolder,
};
pub use source::{CancellationToken, FolderEvent, PollingFolderSource};

/// Running watch threads. Cancel the token, then [`WatchHandle::join`].
pub struct WatchHandle {
    source: JoinHandle<()>,
    events: JoinHandle<()>,
}

impl WatchHandle {
    /// Wait for the poller and the event loop to stop. Folder workers and
    /// matches already in flight finish on their own.
    pub fn join(self) {
        if self.source.join().is_err() {
            warn!("Folder poller panicked");
        }
        if self.events.join().is_err() {
            warn!("Watch event loop panicked");
        }
    }
}

/// Start watching the configured reports folder.
pub fn start_watching(
    config: &CheckerConfig,
    publisher: OutcomePublisher,
    cancel: CancellationToken,
) -> Result<WatchHandle> {
    let settings = config
        .settings_folder
        .as_ref()
        .filter(|p| p.is_dir())
        .context("Settings folder is not configured or not a directory")?;
    let reports = config
        .reports_folder
        .as_ref()
        .filter(|p| p.is_dir())
        .context("Reports folder is not configured or not a directory")?;

    let source = PollingFolderSource::new(
        reports,
        Duration::from_millis(config.watch.poll_interval_ms),
        cancel,
    );
    let (events, source) = source
        .start()
        .with_context(|| format!("Failed to watch {}", reports.display()))?;

    let pipeline = Arc::new(FolderWatchPipeline::new(
        reports,
        Arc::new(MatchEngine::new(settings)),
        WatchOptions::from_config(config),
        publisher,
    ));
    let events = pipeline
        .spawn(events)
        .context("Failed to start watch event loop")?;

    Ok(WatchHandle { source, events })
}
