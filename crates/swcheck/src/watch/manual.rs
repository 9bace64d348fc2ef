//! Operator-triggered checks
//!
//! Manual checks locate the report from a code instead of a folder event,
//! run the engine on the caller's thread and publish the outcome like the
//! watch pipeline does.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::layout::{code_for_report, find_report_for_code};
use super::pipeline::SkipReason;
use crate::check::{CheckError, MatchEngine, MatchOutcome, PdiInput, PdiOutcome};
use crate::config::CheckerConfig;
use crate::sinks::{CheckEvent, OutcomePublisher, Trigger};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManualCheckError {
    #[error("Settings folder, reports folder and code must all be set")]
    NotConfigured,

    #[error("Reports folder {} is not a directory", path.display())]
    ReportsRootInvalid { path: PathBuf },

    #[error("No report found for code '{code}'")]
    ReportNotFound { code: String },

    #[error(transparent)]
    Check(#[from] CheckError),
}

impl ManualCheckError {
    pub fn code(&self) -> &'static str {
        match self {
            ManualCheckError::NotConfigured => "msgPathsNotSet",
            ManualCheckError::ReportsRootInvalid { .. } => "msgReportsFolderNotSet",
            ManualCheckError::ReportNotFound { .. } => "msgReportNotFound",
            ManualCheckError::Check(err) => err.code(),
        }
    }
}

/// Check the newest report for `code` under the configured reports folder.
pub fn run_manual_check(
    config: &CheckerConfig,
    code: &str,
    publisher: &OutcomePublisher,
) -> Result<MatchOutcome, ManualCheckError> {
    let code = code.trim();
    let (Some(settings), Some(reports)) = (&config.settings_folder, &config.reports_folder) else {
        return Err(ManualCheckError::NotConfigured);
    };
    if code.is_empty() {
        return Err(ManualCheckError::NotConfigured);
    }
    if !settings.is_dir() {
        return Err(CheckError::missing_path(settings, "settings folder is not a directory").into());
    }
    if !reports.is_dir() {
        return Err(ManualCheckError::ReportsRootInvalid {
            path: reports.clone(),
        });
    }

    let report = match find_report_for_code(reports, code, &config.watch.report_extension)? {
        Some(report) => report,
        None => {
            warn!(code, root = %reports.display(), "No report found");
            publisher.publish(CheckEvent::ResolutionFailed {
                trigger: Trigger::Manual,
                code: code.to_string(),
                folder: reports.clone(),
                reason: SkipReason::NoReportFile,
            });
            return Err(ManualCheckError::ReportNotFound {
                code: code.to_string(),
            });
        }
    };

    info!(code, report = %report.display(), "Manual check");
    Ok(run_report_check(config, &report, publisher)?)
}

/// Check a specific report file. The code is taken from the report's
/// position in the reports tree.
pub fn run_report_check(
    config: &CheckerConfig,
    report: &Path,
    publisher: &OutcomePublisher,
) -> Result<MatchOutcome, CheckError> {
    let engine = engine_for(config)?;
    let code = code_for_report(report);

    match engine.run(report) {
        Ok(outcome) => {
            publisher.publish(CheckEvent::Matched {
                trigger: Trigger::Manual,
                code,
                outcome: outcome.clone(),
            });
            Ok(outcome)
        }
        Err(error) => {
            publisher.publish(CheckEvent::Failed {
                trigger: Trigger::Manual,
                code,
                input: Some(report.to_path_buf()),
                error: error.clone(),
            });
            Err(error)
        }
    }
}

/// Compare operator-supplied identifier parts against the settings record.
pub fn run_pdi_check(
    config: &CheckerConfig,
    input: &PdiInput,
    publisher: &OutcomePublisher,
) -> Result<PdiOutcome, CheckError> {
    let result = engine_for(config).and_then(|engine| engine.run_pdi(input));
    match &result {
        Ok(outcome) => publisher.publish(CheckEvent::PdiChecked {
            outcome: outcome.clone(),
        }),
        Err(error) => publisher.publish(CheckEvent::Failed {
            trigger: Trigger::Pdi,
            code: None,
            input: input.source.clone(),
            error: error.clone(),
        }),
    }
    result
}

fn engine_for(config: &CheckerConfig) -> Result<MatchEngine, CheckError> {
    config
        .settings_folder
        .as_ref()
        .map(MatchEngine::new)
        .ok_or_else(|| CheckError::missing_path("", "settings folder is not configured"))
}
