//! Short JSON logs of the latest operator-triggered checks.

use anyhow::{Context, Result};
use chrono::Local;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use super::{CheckEvent, OutcomeSink, Trigger};
use crate::check::{MatchOutcome, PdiOutcome};

pub const RECENT_CAPACITY: usize = 10;
const ERROR_RESULT: &str = "ERROR";
const NOT_AVAILABLE: &str = "N/A";

/// JSON array of entries, newest first, holding at most `capacity` items.
#[derive(Debug)]
pub struct RecentLog<T> {
    path: PathBuf,
    capacity: usize,
    lock: Mutex<()>,
    _entries: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> RecentLog<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, RECENT_CAPACITY)
    }

    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            lock: Mutex::new(()),
            _entries: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current entries. A missing or unreadable log reads as empty.
    pub fn entries(&self) -> Vec<T> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load()
    }

    pub fn record(&self, entry: T) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut entries = self.load();
        entries.insert(0, entry);
        entries.truncate(self.capacity);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    fn load(&self) -> Vec<T> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Discarding unreadable recent-checks log");
            Vec::new()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEntry {
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dmc: Option<String>,
    pub snr: String,
    /// `OK`, `NOK` or `ERROR`
    pub final_result: String,
    /// Report file, or the PDI source
    #[serde(default)]
    pub input_file: String,
    #[serde(default)]
    pub settings_file: String,
    #[serde(default)]
    pub results: serde_json::Value,
    #[serde(default)]
    pub error_message: String,
}

impl RecentEntry {
    fn now() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    pub fn from_match(code: Option<&str>, outcome: &MatchOutcome) -> Self {
        Self {
            timestamp: Self::now(),
            dmc: Some(code.unwrap_or(NOT_AVAILABLE).to_string()),
            snr: outcome.serial_number.clone(),
            final_result: outcome.final_verdict.as_str().to_string(),
            input_file: outcome.report_file.display().to_string(),
            settings_file: outcome.settings_file.display().to_string(),
            results: serde_json::to_value(&outcome.field_results).unwrap_or_default(),
            error_message: String::new(),
        }
    }

    pub fn from_pdi(outcome: &PdiOutcome) -> Self {
        Self {
            timestamp: Self::now(),
            dmc: None,
            snr: outcome.serial_number.clone(),
            final_result: outcome.final_verdict.as_str().to_string(),
            input_file: outcome
                .source_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            settings_file: outcome.settings_file.display().to_string(),
            results: serde_json::to_value(&outcome.field_results).unwrap_or_default(),
            error_message: String::new(),
        }
    }

    pub fn error(code: Option<&str>, input: Option<&Path>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Self::now(),
            dmc: code.map(str::to_string),
            snr: NOT_AVAILABLE.to_string(),
            final_result: ERROR_RESULT.to_string(),
            input_file: input
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            settings_file: NOT_AVAILABLE.to_string(),
            results: serde_json::Value::Array(Vec::new()),
            error_message: message.into(),
        }
    }
}

/// Keeps the manual-check and PDI logs. Watch-triggered checks only go to
/// the history file.
pub struct RecentSink {
    manual: RecentLog<RecentEntry>,
    pdi: RecentLog<RecentEntry>,
}

impl RecentSink {
    pub fn new(manual: RecentLog<RecentEntry>, pdi: RecentLog<RecentEntry>) -> Self {
        Self { manual, pdi }
    }

    fn log_for(&self, trigger: Trigger) -> Option<&RecentLog<RecentEntry>> {
        match trigger {
            Trigger::Manual => Some(&self.manual),
            Trigger::Pdi => Some(&self.pdi),
            Trigger::Watch => None,
        }
    }
}

impl OutcomeSink for RecentSink {
    fn name(&self) -> &str {
        "recent"
    }

    fn handle(&mut self, event: &CheckEvent) -> Result<()> {
        let Some(log) = self.log_for(event.trigger()) else {
            return Ok(());
        };
        let entry = match event {
            CheckEvent::Matched { code, outcome, .. } => {
                RecentEntry::from_match(code.as_deref(), outcome)
            }
            CheckEvent::PdiChecked { outcome } => RecentEntry::from_pdi(outcome),
            CheckEvent::Failed { error, .. } => {
                RecentEntry::error(event.code(), event.input_file(), error.summary())
            }
            CheckEvent::ResolutionFailed { .. } => {
                RecentEntry::error(event.code(), event.input_file(), "Report not found")
            }
        };
        log.record(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckError;
    use tempfile::TempDir;

    #[test]
    fn test_record_keeps_newest_first_and_caps() {
        let temp = TempDir::new().unwrap();
        let log: RecentLog<u32> = RecentLog::with_capacity(temp.path().join("log.json"), 3);
        for n in 1..=5 {
            log.record(n).unwrap();
        }
        assert_eq!(log.entries(), vec![5, 4, 3]);
    }

    #[test]
    fn test_corrupt_log_reads_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("log.json");
        fs::write(&path, "{not json").unwrap();

        let log: RecentLog<u32> = RecentLog::new(&path);
        assert!(log.entries().is_empty());
        log.record(7).unwrap();
        assert_eq!(log.entries(), vec![7]);
    }

    #[test]
    fn test_sink_routes_by_trigger() {
        let temp = TempDir::new().unwrap();
        let manual_path = temp.path().join("manual_scans_log.json");
        let pdi_path = temp.path().join("pdi_checks_log.json");
        let mut sink = RecentSink::new(RecentLog::new(&manual_path), RecentLog::new(&pdi_path));

        sink.handle(&CheckEvent::ResolutionFailed {
            trigger: Trigger::Manual,
            code: "DMC7".into(),
            folder: temp.path().to_path_buf(),
            reason: crate::watch::SkipReason::NoReportFile,
        })
        .unwrap();
        sink.handle(&CheckEvent::Failed {
            trigger: Trigger::Pdi,
            code: None,
            input: None,
            error: CheckError::SettingsNotFound {
                serial: "SN5".into(),
            },
        })
        .unwrap();
        sink.handle(&CheckEvent::Failed {
            trigger: Trigger::Watch,
            code: None,
            input: None,
            error: CheckError::SettingsNotFound {
                serial: "SN6".into(),
            },
        })
        .unwrap();

        let manual = RecentLog::<RecentEntry>::new(&manual_path).entries();
        assert_eq!(manual.len(), 1);
        assert_eq!(manual[0].final_result, "ERROR");
        assert_eq!(manual[0].dmc.as_deref(), Some("DMC7"));
        assert_eq!(manual[0].input_file, temp.path().display().to_string());

        let pdi = RecentLog::<RecentEntry>::new(&pdi_path).entries();
        assert_eq!(pdi.len(), 1);
        assert_eq!(pdi[0].error_message, "Settings not found for SNR SN5");
    }
}
