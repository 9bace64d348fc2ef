//! Append-only CSV history of completed checks.

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use super::{CheckEvent, OutcomeSink};
use crate::check::{Field, MatchOutcome, PdiOutcome, PerField, Verdict};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const PDI_CODE: &str = "PDI_CHECK";
const NOT_AVAILABLE: &str = "N/A";

pub const HISTORY_HEADER: [&str; 12] = [
    "timestamp",
    "dmc",
    "snr",
    "final",
    "hwel_report",
    "hwel_set",
    "btld_report",
    "btld_set",
    "swfl_report",
    "swfl_set",
    "report_file",
    "settings_file",
];

/// One history line. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub timestamp: String,
    pub dmc: String,
    pub snr: String,
    #[serde(rename = "final")]
    pub final_result: String,
    pub hwel_report: String,
    pub hwel_set: String,
    pub btld_report: String,
    pub btld_set: String,
    pub swfl_report: String,
    pub swfl_set: String,
    pub report_file: String,
    pub settings_file: String,
}

impl HistoryRow {
    pub fn from_match(code: Option<&str>, outcome: &MatchOutcome) -> Self {
        let values = PerField::from_fn(|field| {
            outcome
                .field(field)
                .map(|r| (r.report_value.clone(), r.settings_value.clone()))
                .unwrap_or_default()
        });
        Self::build(
            code.unwrap_or(NOT_AVAILABLE),
            &outcome.serial_number,
            outcome.final_verdict,
            values,
            outcome.report_file.display().to_string(),
            outcome.settings_file.display().to_string(),
        )
    }

    /// PDI rows carry the hex parts as report and settings values.
    pub fn from_pdi(outcome: &PdiOutcome) -> Self {
        let values = PerField::from_fn(|field| {
            outcome
                .field_results
                .iter()
                .find(|r| r.field == field)
                .map(|r| (r.input_hex.clone(), r.settings_hex.clone()))
                .unwrap_or_default()
        });
        Self::build(
            PDI_CODE,
            &outcome.serial_number,
            outcome.final_verdict,
            values,
            outcome
                .source_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            outcome.settings_file.display().to_string(),
        )
    }

    fn build(
        dmc: &str,
        snr: &str,
        verdict: Verdict,
        values: PerField<(String, String)>,
        report_file: String,
        settings_file: String,
    ) -> Self {
        let PerField { hwel, btld, swfl } = values;
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            dmc: dmc.to_string(),
            snr: snr.to_string(),
            final_result: verdict.as_str().to_string(),
            hwel_report: hwel.0,
            hwel_set: hwel.1,
            btld_report: btld.0,
            btld_set: btld.1,
            swfl_report: swfl.0,
            swfl_set: swfl.1,
            report_file,
            settings_file,
        }
    }

    fn values(&self, field: Field) -> (&str, &str) {
        match field {
            Field::Hwel => (&self.hwel_report, &self.hwel_set),
            Field::Btld => (&self.btld_report, &self.btld_set),
            Field::Swfl => (&self.swfl_report, &self.swfl_set),
        }
    }
}

/// Totals over the whole history file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total_ok: usize,
    pub total_nok: usize,
    /// NOK rows where this field's report and settings values differ.
    pub nok_details: PerField<usize>,
    pub last_result: String,
    pub last_timestamp: String,
}

impl Default for HistoryStats {
    fn default() -> Self {
        Self {
            total_ok: 0,
            total_nok: 0,
            nok_details: PerField::default(),
            last_result: NOT_AVAILABLE.to_string(),
            last_timestamp: NOT_AVAILABLE.to_string(),
        }
    }
}

impl HistoryStats {
    pub fn from_rows(rows: &[HistoryRow]) -> Self {
        let mut stats = HistoryStats::default();
        if let Some(last) = rows.last() {
            stats.last_result = last.final_result.clone();
            stats.last_timestamp = last.timestamp.clone();
        }
        for row in rows {
            match row.final_result.as_str() {
                "OK" => stats.total_ok += 1,
                "NOK" => {
                    stats.total_nok += 1;
                    let differs = |field| {
                        let (report, set) = row.values(field);
                        usize::from(report != set)
                    };
                    stats.nok_details.hwel += differs(Field::Hwel);
                    stats.nok_details.btld += differs(Field::Btld);
                    stats.nok_details.swfl += differs(Field::Swfl);
                }
                _ => {}
            }
        }
        stats
    }
}

/// The history file. Appends are serialized; the lock is held only for the
/// write itself.
#[derive(Debug)]
pub struct HistoryLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a row, creating the file with BOM and header when needed.
    pub fn append(&self, row: &HistoryRow) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let is_new = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history {}", self.path.display()))?;
        if is_new {
            file.write_all(UTF8_BOM)?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(HISTORY_HEADER)?;
        }
        writer.serialize(row)?;
        writer.flush()?;
        debug!(path = %self.path.display(), snr = %row.snr, "History row appended");
        Ok(())
    }

    /// All rows, oldest first. A missing file is an empty history.
    pub fn read_all(&self) -> Result<Vec<HistoryRow>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read history {}", self.path.display()))
            }
        };
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

        csv::Reader::from_reader(body)
            .deserialize()
            .collect::<std::result::Result<Vec<HistoryRow>, _>>()
            .with_context(|| format!("Invalid history file {}", self.path.display()))
    }

    pub fn stats(&self) -> Result<HistoryStats> {
        Ok(HistoryStats::from_rows(&self.read_all()?))
    }
}

/// Records matched and PDI outcomes. Failures are not history.
pub struct HistorySink {
    log: HistoryLog,
}

impl HistorySink {
    pub fn new(log: HistoryLog) -> Self {
        Self { log }
    }
}

impl OutcomeSink for HistorySink {
    fn name(&self) -> &str {
        "history"
    }

    fn handle(&mut self, event: &CheckEvent) -> Result<()> {
        let row = match event {
            CheckEvent::Matched { code, outcome, .. } => {
                HistoryRow::from_match(code.as_deref(), outcome)
            }
            CheckEvent::PdiChecked { outcome } => HistoryRow::from_pdi(outcome),
            CheckEvent::Failed { .. } | CheckEvent::ResolutionFailed { .. } => return Ok(()),
        };
        self.log.append(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{FieldResult, RecordTimestamp};
    use tempfile::TempDir;

    fn outcome(hwel_report: &str, verdict: Verdict) -> MatchOutcome {
        MatchOutcome {
            serial_number: "SN1".into(),
            field_results: vec![
                FieldResult::compare(Field::Hwel, hwel_report.into(), "AA BB CC".into()),
                FieldResult::compare(Field::Btld, "11 22 33".into(), "11 22 33".into()),
                FieldResult::compare(Field::Swfl, "".into(), "".into()),
            ],
            final_verdict: verdict,
            report_file: PathBuf::from("/reports/DMC1/2024-01-01/report.xml"),
            settings_file: PathBuf::from("/settings/s.xml"),
            settings_record_timestamp: RecordTimestamp::Missing,
            original_settings_ids: PerField::default(),
        }
    }

    #[test]
    fn test_append_writes_bom_and_header_once() {
        let temp = TempDir::new().unwrap();
        let log = HistoryLog::new(temp.path().join("out/results.csv"));

        log.append(&HistoryRow::from_match(Some("DMC1"), &outcome("AA BB CC", Verdict::Ok)))
            .unwrap();
        log.append(&HistoryRow::from_match(None, &outcome("AA BB", Verdict::Nok)))
            .unwrap();

        let bytes = fs::read(log.path()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), HISTORY_HEADER.join(","));
        assert_eq!(text.matches("timestamp,dmc").count(), 1);

        let rows = log.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].dmc, "DMC1");
        assert_eq!(rows[1].dmc, "N/A");
        assert_eq!(rows[1].hwel_report, "AA BB");
    }

    #[test]
    fn test_stats_count_nok_fields() {
        let temp = TempDir::new().unwrap();
        let log = HistoryLog::new(temp.path().join("results.csv"));
        assert_eq!(log.stats().unwrap(), HistoryStats::default());

        log.append(&HistoryRow::from_match(Some("A"), &outcome("AA BB CC", Verdict::Ok)))
            .unwrap();
        log.append(&HistoryRow::from_match(Some("B"), &outcome("AA BB", Verdict::Nok)))
            .unwrap();
        log.append(&HistoryRow::from_match(Some("C"), &outcome("FF FF FF", Verdict::Nok)))
            .unwrap();

        let stats = log.stats().unwrap();
        assert_eq!(stats.total_ok, 1);
        assert_eq!(stats.total_nok, 2);
        assert_eq!(stats.nok_details.hwel, 2);
        assert_eq!(stats.nok_details.btld, 0);
        assert_eq!(stats.last_result, "NOK");
    }

    #[test]
    fn test_sink_ignores_failures() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("results.csv");
        let mut sink = HistorySink::new(HistoryLog::new(&path));

        sink.handle(&CheckEvent::Failed {
            trigger: crate::sinks::Trigger::Watch,
            code: None,
            input: None,
            error: crate::check::CheckError::SettingsNotFound {
                serial: "SN1".into(),
            },
        })
        .unwrap();
        assert!(!path.exists());
    }
}
