//! Folder watch pipeline
//!
//! Each new folder under the reports root goes through
//! settle delay → report lookup → claim → match. The match runs on its own
//! thread and publishes its outcome; the pipeline never waits for it.
//!
//! A folder is settled at most once per pipeline lifetime: either dispatched
//! or skipped for lack of a usable report, never retried. The
//! already-processed check at event time only avoids a pointless settle
//! delay; the guarantee comes from [`FolderLedger::claim`] and
//! [`FolderLedger::mark_skipped`], which check and mark in one critical
//! section.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::layout::{newest_report_in, ReportLookup};
use super::source::FolderEvent;
use crate::check::MatchEngine;
use crate::config::CheckerConfig;
use crate::sinks::{CheckEvent, OutcomePublisher, Trigger};

/// Why a folder event did not lead to a match.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    #[error("no timestamp folder")]
    NoTimestampFolder,
    #[error("no report file in the newest timestamp folder")]
    NoReportFile,
    #[error("report file is empty")]
    EmptyReport,
    #[error("folder already processed")]
    AlreadyProcessed,
    #[error("not a direct child of the reports root")]
    OutsideRoot,
}

impl From<ReportLookup> for SkipReason {
    fn from(lookup: ReportLookup) -> Self {
        match lookup {
            ReportLookup::NoTimestampFolder => SkipReason::NoTimestampFolder,
            ReportLookup::NoReportFile => SkipReason::NoReportFile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderDisposition {
    /// A match was started for this report.
    Dispatched(PathBuf),
    Skipped(SkipReason),
}

#[derive(Debug, Clone)]
pub struct WatchedFolder {
    pub path: PathBuf,
    pub first_seen_at: DateTime<Local>,
    pub processed: bool,
    /// Set when the folder was settled without a match.
    pub skipped: Option<SkipReason>,
}

impl WatchedFolder {
    fn first_seen(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            first_seen_at: Local::now(),
            processed: false,
            skipped: None,
        }
    }
}

/// Folders seen by a pipeline. Entries are never evicted, so a processed
/// folder, dispatched or skipped, stays processed until the process exits.
#[derive(Debug, Default)]
pub struct FolderLedger {
    folders: Mutex<HashMap<PathBuf, WatchedFolder>>,
}

impl FolderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, WatchedFolder>> {
        self.folders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that an event was seen for `path`. Returns whether the folder
    /// has already been processed.
    pub fn observe(&self, path: &Path) -> bool {
        self.lock()
            .entry(path.to_path_buf())
            .or_insert_with(|| WatchedFolder::first_seen(path))
            .processed
    }

    /// Mark `path` processed for dispatch. Returns `false` if another caller
    /// already settled it.
    pub fn claim(&self, path: &Path) -> bool {
        self.settle(path, None)
    }

    /// Mark `path` processed without a match. Returns `false` if another
    /// caller already settled it.
    pub fn mark_skipped(&self, path: &Path, reason: SkipReason) -> bool {
        self.settle(path, Some(reason))
    }

    fn settle(&self, path: &Path, skipped: Option<SkipReason>) -> bool {
        let mut folders = self.lock();
        let entry = folders
            .entry(path.to_path_buf())
            .or_insert_with(|| WatchedFolder::first_seen(path));
        if entry.processed {
            return false;
        }
        entry.processed = true;
        entry.skipped = skipped;
        true
    }

    pub fn get(&self, path: &Path) -> Option<WatchedFolder> {
        self.lock().get(path).cloned()
    }

    pub fn processed_count(&self) -> usize {
        self.lock().values().filter(|f| f.processed).count()
    }

    pub fn dispatched_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|f| f.processed && f.skipped.is_none())
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub settle_delay: Duration,
    pub report_extension: String,
}

impl WatchOptions {
    pub fn from_config(config: &CheckerConfig) -> Self {
        Self {
            settle_delay: Duration::from_millis(config.watch.settle_delay_ms),
            report_extension: config.watch.report_extension.clone(),
        }
    }
}

pub struct FolderWatchPipeline {
    root: PathBuf,
    engine: Arc<MatchEngine>,
    options: WatchOptions,
    ledger: FolderLedger,
    publisher: OutcomePublisher,
}

impl FolderWatchPipeline {
    pub fn new(
        root: impl Into<PathBuf>,
        engine: Arc<MatchEngine>,
        options: WatchOptions,
        publisher: OutcomePublisher,
    ) -> Self {
        Self {
            root: root.into(),
            engine,
            options,
            ledger: FolderLedger::new(),
            publisher,
        }
    }

    pub fn ledger(&self) -> &FolderLedger {
        &self.ledger
    }

    /// Run the event loop on its own thread. Each event is handled on a
    /// separate worker so a slow copy never delays detection of the next
    /// folder. The loop ends when the event sender is dropped.
    pub fn spawn(self: Arc<Self>, events: Receiver<FolderEvent>) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("swcheck-watch-events".to_string())
            .spawn(move || {
                for event in events {
                    let folder = event.path().to_path_buf();
                    info!(folder = %folder.display(), "Folder event received");
                    let pipeline = Arc::clone(&self);
                    let spawned = thread::Builder::new()
                        .name("swcheck-watch-folder".to_string())
                        .spawn(move || {
                            pipeline.handle_created(&folder);
                        });
                    if let Err(e) = spawned {
                        error!(error = %e, "Failed to start folder worker");
                    }
                }
                debug!("Watch event loop stopped");
            })
    }

    /// Settle, resolve and dispatch one created folder. Blocks for the
    /// settle delay; the match itself runs in the background.
    pub fn handle_created(&self, folder: &Path) -> FolderDisposition {
        if folder.parent() != Some(self.root.as_path()) {
            debug!(folder = %folder.display(), "Ignoring event outside reports root");
            return FolderDisposition::Skipped(SkipReason::OutsideRoot);
        }

        if self.ledger.observe(folder) {
            debug!(folder = %folder.display(), "Folder already processed");
            return FolderDisposition::Skipped(SkipReason::AlreadyProcessed);
        }

        if !self.options.settle_delay.is_zero() {
            thread::sleep(self.options.settle_delay);
        }

        let report = match self.resolve(folder) {
            Ok(report) => report,
            Err(reason) => {
                if !self.ledger.mark_skipped(folder, reason) {
                    debug!(folder = %folder.display(), "Folder settled by another event");
                    return FolderDisposition::Skipped(SkipReason::AlreadyProcessed);
                }
                warn!(folder = %folder.display(), %reason, "Folder skipped");
                self.publisher.publish(CheckEvent::ResolutionFailed {
                    trigger: Trigger::Watch,
                    code: folder_name(folder),
                    folder: folder.to_path_buf(),
                    reason,
                });
                return FolderDisposition::Skipped(reason);
            }
        };

        if !self.ledger.claim(folder) {
            debug!(folder = %folder.display(), "Folder claimed by another event");
            return FolderDisposition::Skipped(SkipReason::AlreadyProcessed);
        }

        info!(folder = %folder.display(), report = %report.display(), "Dispatching match");
        self.dispatch(folder_name(folder), report.clone());
        FolderDisposition::Dispatched(report)
    }

    fn resolve(&self, folder: &Path) -> Result<PathBuf, SkipReason> {
        let report = newest_report_in(folder, &self.options.report_extension)?;
        match report.metadata() {
            Ok(meta) if meta.len() > 0 => Ok(report),
            _ => Err(SkipReason::EmptyReport),
        }
    }

    fn dispatch(&self, code: String, report: PathBuf) {
        let engine = Arc::clone(&self.engine);
        let publisher = self.publisher.clone();
        let job = move || run_match(&engine, &publisher, code, report);

        // Match threads are detached; the outcome arrives on the bus.
        if let Err(e) = thread::Builder::new()
            .name("swcheck-match".to_string())
            .spawn(job)
        {
            error!(error = %e, "Failed to start match thread");
        }
    }
}

fn run_match(engine: &MatchEngine, publisher: &OutcomePublisher, code: String, report: PathBuf) {
    let event = match engine.run(&report) {
        Ok(outcome) => CheckEvent::Matched {
            trigger: Trigger::Watch,
            code: Some(code),
            outcome,
        },
        Err(error) => {
            warn!(report = %report.display(), code = error.code(), %error, "Check failed");
            CheckEvent::Failed {
                trigger: Trigger::Watch,
                code: Some(code),
                input: Some(report),
                error,
            }
        }
    };
    publisher.publish(event);
}

fn folder_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
