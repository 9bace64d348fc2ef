//! Operator alerts for NOK verdicts and processing errors.

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use super::{CheckEvent, OutcomeSink, Trigger};
use crate::check::Verdict;

/// A short desktop-style notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub line1: String,
    pub line2: String,
    /// Informational alerts are not problems.
    pub severe: bool,
}

impl Alert {
    fn new(title: &str, line1: String, line2: impl Into<String>, severe: bool) -> Self {
        Self {
            title: title.to_string(),
            line1,
            line2: line2.into(),
            severe,
        }
    }
}

/// Alert delivery. Desktop toasts live outside this crate; implementations
/// plug in here.
pub trait Notifier: Send + 'static {
    fn notify(&self, alert: &Alert) -> Result<()>;
}

/// Writes alerts to the log on the `swcheck::alert` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, alert: &Alert) -> Result<()> {
        if alert.severe {
            warn!(target: "swcheck::alert", title = %alert.title, "{} | {}", alert.line1, alert.line2);
        } else {
            info!(target: "swcheck::alert", title = %alert.title, "{} | {}", alert.line1, alert.line2);
        }
        Ok(())
    }
}

pub struct AlertSink {
    notifier: Box<dyn Notifier>,
}

impl AlertSink {
    pub fn new(notifier: impl Notifier) -> Self {
        Self {
            notifier: Box::new(notifier),
        }
    }
}

/// The alert for an event, if it warrants one. Matched OK verdicts do not.
pub fn alert_for(event: &CheckEvent) -> Option<Alert> {
    match event {
        CheckEvent::Matched { code, outcome, .. } => (outcome.final_verdict == Verdict::Nok)
            .then(|| {
                Alert::new(
                    "NOK Detected!",
                    format!("SNR: {}", outcome.serial_number),
                    format!("DMC: {}", code.as_deref().unwrap_or("N/A")),
                    true,
                )
            }),
        CheckEvent::PdiChecked { outcome } => Some(match outcome.final_verdict {
            Verdict::Nok => Alert::new(
                "PDI Check NOK!",
                format!("SNR: {}", outcome.serial_number),
                "Values mismatch detected",
                true,
            ),
            Verdict::Ok => Alert::new(
                "PDI Check OK",
                format!("SNR: {}", outcome.serial_number),
                "All values match",
                false,
            ),
        }),
        CheckEvent::Failed { input, error, .. } => Some(Alert::new(
            "Processing ERROR!",
            format!("Error: {}", error.summary()),
            format!("File: {}", input.as_deref().map(file_name).unwrap_or_default()),
            true,
        )),
        CheckEvent::ResolutionFailed {
            trigger: Trigger::Watch,
            code,
            reason,
            ..
        } => Some(Alert::new(
            "Report not found",
            format!("DMC: {code}"),
            reason.to_string(),
            true,
        )),
        CheckEvent::ResolutionFailed { .. } => None,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl OutcomeSink for AlertSink {
    fn name(&self) -> &str {
        "alert"
    }

    fn handle(&mut self, event: &CheckEvent) -> Result<()> {
        match alert_for(event) {
            Some(alert) => self.notifier.notify(&alert),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{CheckError, MatchOutcome, PerField, RecordTimestamp};
    use crate::watch::SkipReason;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        alerts: Arc<Mutex<Vec<Alert>>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, alert: &Alert) -> Result<()> {
            self.alerts.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    fn matched(verdict: Verdict) -> CheckEvent {
        CheckEvent::Matched {
            trigger: Trigger::Watch,
            code: Some("DMC1".into()),
            outcome: MatchOutcome {
                serial_number: "SN1".into(),
                field_results: Vec::new(),
                final_verdict: verdict,
                report_file: PathBuf::from("r.xml"),
                settings_file: PathBuf::from("s.xml"),
                settings_record_timestamp: RecordTimestamp::Missing,
                original_settings_ids: PerField::default(),
            },
        }
    }

    #[test]
    fn test_only_nok_matches_alert() {
        assert_eq!(alert_for(&matched(Verdict::Ok)), None);

        let alert = alert_for(&matched(Verdict::Nok)).unwrap();
        assert_eq!(alert.title, "NOK Detected!");
        assert_eq!(alert.line1, "SNR: SN1");
        assert_eq!(alert.line2, "DMC: DMC1");
    }

    #[test]
    fn test_failure_alert_names_file() {
        let alert = alert_for(&CheckEvent::Failed {
            trigger: Trigger::Manual,
            code: None,
            input: Some(PathBuf::from("/reports/DMC1/2024-01-01/report.xml")),
            error: CheckError::SerialNumberNotFound {
                path: PathBuf::from("/reports/DMC1/2024-01-01/report.xml"),
            },
        })
        .unwrap();
        assert_eq!(alert.title, "Processing ERROR!");
        assert_eq!(alert.line2, "File: report.xml");
    }

    #[test]
    fn test_resolution_failures_alert_for_watch_only() {
        let event = |trigger| CheckEvent::ResolutionFailed {
            trigger,
            code: "DMC2".into(),
            folder: PathBuf::from("/reports/DMC2"),
            reason: SkipReason::NoTimestampFolder,
        };
        assert_eq!(
            alert_for(&event(Trigger::Watch)).unwrap().title,
            "Report not found"
        );
        assert_eq!(alert_for(&event(Trigger::Manual)), None);
    }

    #[test]
    fn test_sink_delivers_to_notifier() {
        let notifier = RecordingNotifier::default();
        let mut sink = AlertSink::new(notifier.clone());
        sink.handle(&matched(Verdict::Nok)).unwrap();
        sink.handle(&matched(Verdict::Ok)).unwrap();
        assert_eq!(notifier.alerts.lock().unwrap().len(), 1);
    }
}
