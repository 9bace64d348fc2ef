//! Helpful error types for CLI commands
//!
//! Every error says what went wrong and, where possible, how to fix it.

use std::fmt;
use std::path::Path;

use swcheck::check::CheckError;
use swcheck::config::ConfigStatus;
use swcheck::watch::ManualCheckError;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    /// Stable code, for `--json` output
    pub code: Option<&'static str>,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    // === Common error constructors ===

    /// Settings or reports folder not usable
    pub fn setup_required(status: &ConfigStatus, config_path: &Path) -> Self {
        Self::new("Setup required")
            .with_code("msgPathsNotSet")
            .with_context(status.message())
            .with_suggestion(format!(
                "TRY: Set settings_folder and reports_folder in {}",
                config_path.display()
            ))
            .with_suggestion("TRY: Write a starter file with: swcheck config init")
    }

    pub fn from_check(err: &CheckError) -> Self {
        let base = Self::new(err.summary())
            .with_code(err.code())
            .with_context(err.to_string());
        match err {
            CheckError::InputPathInvalid { .. } => {
                base.with_suggestion("TRY: Check the configured folders with: swcheck status")
            }
            CheckError::ReportUnparseable { path, .. } => base.with_suggestion(format!(
                "TRY: Open {} and check that it is a complete XML report",
                path.display()
            )),
            CheckError::SerialNumberNotFound { .. } => base
                .with_suggestion("TRY: Check that the report has a 'BMW PartNumber' info entry"),
            CheckError::SettingsNotFound { .. } => base.with_suggestion(
                "TRY: Check that the settings folder holds a record for this serial number",
            ),
        }
    }

    pub fn from_manual(err: &ManualCheckError) -> Self {
        match err {
            ManualCheckError::Check(inner) => Self::from_check(inner),
            ManualCheckError::NotConfigured => Self::new(err.to_string())
                .with_code(err.code())
                .with_suggestion("TRY: Check the configured folders with: swcheck status"),
            ManualCheckError::ReportsRootInvalid { path } => Self::new(err.to_string())
                .with_code(err.code())
                .with_suggestion(format!("TRY: Check that {} exists", path.display())),
            ManualCheckError::ReportNotFound { code } => Self::new(err.to_string())
                .with_code(err.code())
                .with_context("No folder under the reports folder starts with this code")
                .with_suggestion(format!(
                    "TRY: Check the code, or pass a report directly: swcheck check --report <FILE>  (code: {code})"
                )),
        }
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// `{"error": ..., "code": ...}` on stdout for `--json` callers.
pub fn print_json_error(err: &anyhow::Error) {
    let (message, code) = match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => (helpful.message.clone(), helpful.code),
        None => (format!("{err:#}"), None),
    };
    let payload = serde_json::json!({
        "error": message,
        "code": code,
    });
    println!("{payload}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_helpful_error_display() {
        let err = HelpfulError::new("Something went wrong")
            .with_context("While checking")
            .with_suggestion("Try again");

        let display = err.to_string();
        assert!(display.contains("ERROR: Something went wrong"));
        assert!(display.contains("CONTEXT: While checking"));
        assert!(display.contains("Try again"));
    }

    #[test]
    fn test_from_check_keeps_code() {
        let err = HelpfulError::from_check(&CheckError::SettingsNotFound {
            serial: "SN1".into(),
        });
        assert_eq!(err.code, Some("msgSettingsNotFound"));
        assert_eq!(err.message, "Settings not found for SNR SN1");
    }

    #[test]
    fn test_from_manual_report_not_found() {
        let err = HelpfulError::from_manual(&ManualCheckError::ReportNotFound {
            code: "DMC9".into(),
        });
        assert_eq!(err.code, Some("msgReportNotFound"));
        assert!(err.suggestions[0].contains("DMC9"));

        let err = HelpfulError::from_manual(&ManualCheckError::Check(
            CheckError::SerialNumberNotFound {
                path: PathBuf::from("r.xml"),
            },
        ));
        assert_eq!(err.code, Some("msgSnrNotFound"));
    }
}
