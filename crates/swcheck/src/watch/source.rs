//! Folder-creation events for the reports root.
//!
//! Reports roots are usually network shares where inotify-style events are
//! unreliable, so new folders are detected by polling the immediate children
//! of the root and diffing against the previous listing.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest single sleep between cancellation checks.
const CANCEL_CHECK_SLICE: Duration = Duration::from_millis(50);

/// Cooperative stop signal shared between the caller and the watch threads.
///
/// Clone is cheap and shares state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Sleep up to `duration`, returning early once cancelled.
    /// Returns `true` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        while !self.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep((deadline - now).min(CANCEL_CHECK_SLICE));
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderEvent {
    /// A directory appeared directly under the watched root.
    Created(PathBuf),
}

impl FolderEvent {
    pub fn path(&self) -> &Path {
        match self {
            FolderEvent::Created(path) => path,
        }
    }
}

/// Polls the immediate children of a root directory.
pub struct PollingFolderSource {
    root: PathBuf,
    interval: Duration,
    cancel: CancellationToken,
}

impl PollingFolderSource {
    pub fn new(root: impl Into<PathBuf>, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            root: root.into(),
            interval,
            cancel,
        }
    }

    /// Take the baseline listing and start the polling thread.
    ///
    /// Folders present at start-up are the baseline and never reported. The
    /// thread ends when the token is cancelled or the receiver is dropped.
    pub fn start(self) -> io::Result<(Receiver<FolderEvent>, JoinHandle<()>)> {
        let baseline = list_child_dirs(&self.root)?;
        info!(
            root = %self.root.display(),
            existing = baseline.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Watching reports root"
        );

        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("swcheck-folder-poll".to_string())
            .spawn(move || self.poll_loop(baseline, tx))?;
        Ok((rx, handle))
    }

    fn poll_loop(self, mut known: HashSet<PathBuf>, tx: Sender<FolderEvent>) {
        while !self.cancel.sleep(self.interval) {
            let current = match list_child_dirs(&self.root) {
                Ok(current) => current,
                Err(e) => {
                    warn!(root = %self.root.display(), error = %e, "Failed to list reports root");
                    continue;
                }
            };

            let mut created: Vec<&PathBuf> = current.difference(&known).collect();
            created.sort();
            for path in created {
                debug!(path = %path.display(), "Folder created");
                if tx.send(FolderEvent::Created(path.clone())).is_err() {
                    return;
                }
            }
            known = current;
        }
        debug!(root = %self.root.display(), "Folder polling stopped");
    }
}

fn list_child_dirs(root: &Path) -> io::Result<HashSet<PathBuf>> {
    Ok(fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect())
}
