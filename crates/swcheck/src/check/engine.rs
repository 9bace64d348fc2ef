//! Match engine
//!
//! Runs one check end to end and returns a typed result. The engine has no
//! side effects beyond reading files and logging; publishing outcomes is the
//! caller's job.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::codec::{parse_identifier_components, parse_identifier_to_hex};
use super::error::CheckError;
use super::report::parse_report;
use super::settings::{SettingsMatch, SettingsResolver};
use super::types::{
    Field, FieldResult, MatchOutcome, PdiFieldResult, PdiInput, PdiOutcome, RecordTimestamp,
    Verdict,
};

#[derive(Debug, Clone)]
pub struct MatchEngine {
    resolver: SettingsResolver,
}

impl MatchEngine {
    pub fn new(settings_root: impl Into<PathBuf>) -> Self {
        Self {
            resolver: SettingsResolver::new(settings_root),
        }
    }

    /// Compare a report against its settings record.
    ///
    /// Failures are checked in order: paths, report parse, serial number,
    /// settings lookup.
    pub fn run(&self, report_file: &Path) -> Result<MatchOutcome, CheckError> {
        if !report_file.is_file() {
            return Err(CheckError::missing_path(report_file, "report file does not exist"));
        }
        self.ensure_settings_root()?;

        let report = parse_report(report_file)?;
        let serial = report
            .serial_number
            .ok_or_else(|| CheckError::SerialNumberNotFound {
                path: report_file.to_path_buf(),
            })?;

        let settings = self.resolve(&serial)?;

        let field_results: Vec<FieldResult> = Field::ALL
            .into_iter()
            .map(|field| {
                FieldResult::compare(
                    field,
                    report.fields[field].clone(),
                    parse_identifier_to_hex(&settings.raw_ids[field]),
                )
            })
            .collect();
        let final_verdict = Verdict::combine(field_results.iter().map(|r| r.verdict));

        info!(
            serial = %serial,
            report = %report_file.display(),
            verdict = %final_verdict,
            "Check finished"
        );

        Ok(MatchOutcome {
            serial_number: serial,
            field_results,
            final_verdict,
            report_file: report_file.to_path_buf(),
            settings_record_timestamp: RecordTimestamp::from_settings_file(&settings.file),
            settings_file: settings.file,
            original_settings_ids: settings.raw_ids,
        })
    }

    /// Compare operator-supplied hex and decimal parts against the settings
    /// record. A field is OK only when both parts match.
    pub fn run_pdi(&self, input: &PdiInput) -> Result<PdiOutcome, CheckError> {
        self.ensure_settings_root()?;

        let serial = input.serial_number.trim();
        if serial.is_empty() {
            return Err(CheckError::SerialNumberNotFound {
                path: input.source.clone().unwrap_or_default(),
            });
        }

        let settings = self.resolve(serial)?;

        let field_results: Vec<PdiFieldResult> = Field::ALL
            .into_iter()
            .map(|field| {
                let given = &input.values[field];
                let expected = parse_identifier_components(&settings.raw_ids[field]);
                let input_hex = given.hex_part.trim().to_uppercase();
                let input_dec = given.dec_part.trim().to_string();
                let hex_match = Verdict::from_match(input_hex == expected.hex_part);
                let dec_match = Verdict::from_match(input_dec == expected.dec_part);
                PdiFieldResult {
                    field,
                    input_hex,
                    input_dec,
                    settings_hex: expected.hex_part,
                    settings_dec: expected.dec_part,
                    hex_match,
                    dec_match,
                    verdict: Verdict::combine([hex_match, dec_match]),
                }
            })
            .collect();
        let final_verdict = Verdict::combine(field_results.iter().map(|r| r.verdict));

        info!(serial, verdict = %final_verdict, "PDI check finished");

        Ok(PdiOutcome {
            serial_number: serial.to_string(),
            field_results,
            final_verdict,
            source_file: input.source.clone(),
            settings_record_timestamp: RecordTimestamp::from_settings_file(&settings.file),
            settings_file: settings.file,
            original_settings_ids: settings.raw_ids,
        })
    }

    fn ensure_settings_root(&self) -> Result<(), CheckError> {
        if self.resolver.root().is_dir() {
            Ok(())
        } else {
            Err(CheckError::missing_path(
                self.resolver.root(),
                "settings folder is not a directory",
            ))
        }
    }

    fn resolve(&self, serial: &str) -> Result<SettingsMatch, CheckError> {
        self.resolver.resolve(serial).ok_or_else(|| {
            warn!(serial, "No settings found");
            CheckError::SettingsNotFound {
                serial: serial.to_string(),
            }
        })
    }
}
