//! Failure taxonomy for a single check

use std::path::PathBuf;
use thiserror::Error;

/// Why a check produced no verdict. None of these is a NOK.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("Invalid input path {}: {reason}", path.display())]
    InputPathInvalid { path: PathBuf, reason: String },

    #[error("Report {} could not be parsed: {detail}", path.display())]
    ReportUnparseable { path: PathBuf, detail: String },

    #[error("No serial number in report {}", path.display())]
    SerialNumberNotFound { path: PathBuf },

    #[error("No settings record for serial number '{serial}'")]
    SettingsNotFound { serial: String },
}

impl CheckError {
    pub fn missing_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CheckError::InputPathInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Stable message code, shared with the history logs.
    pub fn code(&self) -> &'static str {
        match self {
            CheckError::InputPathInvalid { .. } => "msgPathsNotSet",
            CheckError::ReportUnparseable { .. } => "msgInvalidReportXML",
            CheckError::SerialNumberNotFound { .. } => "msgSnrNotFound",
            CheckError::SettingsNotFound { .. } => "msgSettingsNotFound",
        }
    }

    /// One-line text for alerts.
    pub fn summary(&self) -> String {
        match self {
            CheckError::InputPathInvalid { path, .. } => {
                format!("Path not set or invalid: {}", path.display())
            }
            CheckError::ReportUnparseable { .. } => "Invalid report XML".to_string(),
            CheckError::SerialNumberNotFound { .. } => {
                "Serial number not found in report".to_string()
            }
            CheckError::SettingsNotFound { serial } => {
                format!("Settings not found for SNR {serial}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            CheckError::missing_path("/x", "does not exist").code(),
            "msgPathsNotSet"
        );
        assert_eq!(
            CheckError::SettingsNotFound { serial: "SN1".into() }.code(),
            "msgSettingsNotFound"
        );
    }

    #[test]
    fn test_display_includes_context() {
        let err = CheckError::ReportUnparseable {
            path: PathBuf::from("/r/report.xml"),
            detail: "unexpected end of stream".into(),
        };
        let text = err.to_string();
        assert!(text.contains("/r/report.xml"));
        assert!(text.contains("unexpected end of stream"));
        assert_eq!(err.summary(), "Invalid report XML");
    }
}
