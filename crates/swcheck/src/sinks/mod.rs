//! Check events and the collaborators that consume them.
//!
//! Producers publish [`CheckEvent`]s on an [`OutcomeBus`]. Every registered
//! [`OutcomeSink`] runs on its own worker thread with its own queue, so a slow
//! mail transport never delays the history log and no producer ever waits on
//! a sink.

pub mod alert;
pub mod history;
pub mod mail;
pub mod recent;

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use crate::check::{CheckError, MatchOutcome, PdiOutcome};
use crate::config::CheckerConfig;
use crate::watch::SkipReason;

pub use alert::{alert_for, Alert, AlertSink, LogNotifier, Notifier};
pub use history::{HistoryLog, HistoryRow, HistorySink, HistoryStats};
pub use mail::{LogTransport, MailMessage, MailSink, MailTransport, OutboxTransport};
pub use recent::{RecentEntry, RecentLog, RecentSink};

/// What started a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Watch,
    Manual,
    Pdi,
}

#[derive(Debug, Clone)]
pub enum CheckEvent {
    Matched {
        trigger: Trigger,
        /// Code folder (DMC) the report was found under.
        code: Option<String>,
        outcome: MatchOutcome,
    },
    PdiChecked {
        outcome: PdiOutcome,
    },
    Failed {
        trigger: Trigger,
        code: Option<String>,
        /// Report or PDI source file, when known.
        input: Option<PathBuf>,
        error: CheckError,
    },
    /// No report could be located for a folder or code.
    ResolutionFailed {
        trigger: Trigger,
        code: String,
        folder: PathBuf,
        reason: SkipReason,
    },
}

impl CheckEvent {
    pub fn trigger(&self) -> Trigger {
        match self {
            CheckEvent::Matched { trigger, .. }
            | CheckEvent::Failed { trigger, .. }
            | CheckEvent::ResolutionFailed { trigger, .. } => *trigger,
            CheckEvent::PdiChecked { .. } => Trigger::Pdi,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            CheckEvent::Matched { code, .. } | CheckEvent::Failed { code, .. } => code.as_deref(),
            CheckEvent::ResolutionFailed { code, .. } => Some(code),
            CheckEvent::PdiChecked { .. } => None,
        }
    }

    pub fn input_file(&self) -> Option<&Path> {
        match self {
            CheckEvent::Matched { outcome, .. } => Some(&outcome.report_file),
            CheckEvent::PdiChecked { outcome } => outcome.source_file.as_deref(),
            CheckEvent::Failed { input, .. } => input.as_deref(),
            CheckEvent::ResolutionFailed { folder, .. } => Some(folder),
        }
    }
}

/// A consumer of check events. Errors are logged by the bus and the sink
/// keeps receiving.
pub trait OutcomeSink: Send + 'static {
    fn name(&self) -> &str;

    fn handle(&mut self, event: &CheckEvent) -> Result<()>;
}

/// Cloneable publishing handle. Sinks stop once every publisher is dropped.
#[derive(Clone, Default)]
pub struct OutcomePublisher {
    senders: Vec<Sender<Arc<CheckEvent>>>,
}

impl OutcomePublisher {
    /// A publisher with no subscribers, for callers that only want the
    /// return value.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn publish(&self, event: CheckEvent) {
        let event = Arc::new(event);
        for sender in &self.senders {
            if sender.send(Arc::clone(&event)).is_err() {
                debug!("Outcome sink already stopped");
            }
        }
    }
}

pub struct OutcomeBus {
    publisher: OutcomePublisher,
    workers: Vec<JoinHandle<()>>,
}

impl OutcomeBus {
    pub fn start(sinks: Vec<Box<dyn OutcomeSink>>) -> Result<Self> {
        let mut senders = Vec::with_capacity(sinks.len());
        let mut workers = Vec::with_capacity(sinks.len());

        for mut sink in sinks {
            let (tx, rx) = mpsc::channel::<Arc<CheckEvent>>();
            let name = sink.name().to_string();
            let handle = thread::Builder::new()
                .name(format!("swcheck-sink-{name}"))
                .spawn(move || {
                    for event in rx {
                        if let Err(e) = sink.handle(&event) {
                            let error = format!("{e:#}");
                            warn!(sink = %name, %error, "Outcome sink failed");
                        }
                    }
                    debug!(sink = %name, "Outcome sink stopped");
                })?;
            senders.push(tx);
            workers.push(handle);
        }

        Ok(Self {
            publisher: OutcomePublisher { senders },
            workers,
        })
    }

    pub fn publisher(&self) -> OutcomePublisher {
        self.publisher.clone()
    }

    pub fn publish(&self, event: CheckEvent) {
        self.publisher.publish(event);
    }

    /// Close the bus and wait for the sinks to drain. Blocks until every
    /// outstanding [`OutcomePublisher`] clone has been dropped.
    pub fn shutdown(self) {
        drop(self.publisher);
        for worker in self.workers {
            if worker.join().is_err() {
                warn!("Outcome sink worker panicked");
            }
        }
    }
}

/// The sinks a configured checker runs with: history (when a CSV path is
/// set), recent-check logs, alerts and NOK mail.
pub fn standard_sinks(config: &CheckerConfig) -> Vec<Box<dyn OutcomeSink>> {
    let mut sinks: Vec<Box<dyn OutcomeSink>> = Vec::new();
    if let Some(path) = config.history_file() {
        sinks.push(Box::new(HistorySink::new(HistoryLog::new(path))));
    }
    sinks.push(Box::new(RecentSink::new(
        RecentLog::new(config.manual_log_file()),
        RecentLog::new(config.pdi_log_file()),
    )));
    sinks.push(Box::new(AlertSink::new(LogNotifier)));

    let recipients = config.mail_recipients.clone();
    match &config.mail_outbox {
        Some(outbox) => sinks.push(Box::new(MailSink::new(
            recipients,
            OutboxTransport::new(outbox),
        ))),
        None => sinks.push(Box::new(MailSink::new(recipients, LogTransport))),
    }
    sinks
}


#[cfg(test)]
mod tests {
    use super::testing::CollectingSink;
    use super::*;

    struct FailingSink;

    impl OutcomeSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn handle(&mut self, _event: &CheckEvent) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn failed_event() -> CheckEvent {
        CheckEvent::Failed {
            trigger: Trigger::Manual,
            code: Some("DMC1".into()),
            input: None,
            error: CheckError::SettingsNotFound {
                serial: "SN1".into(),
            },
        }
    }

    #[test]
    fn test_bus_fans_out_to_every_sink() {
        let first = CollectingSink::default();
        let second = CollectingSink::default();
        let bus = OutcomeBus::start(vec![
            Box::new(first.clone()),
            Box::new(FailingSink),
            Box::new(second.clone()),
        ])
        .unwrap();

        bus.publish(failed_event());
        bus.publish(failed_event());
        bus.shutdown();

        assert_eq!(first.events.lock().unwrap().len(), 2);
        assert_eq!(second.events.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_event_accessors() {
        let event = failed_event();
        assert_eq!(event.trigger(), Trigger::Manual);
        assert_eq!(event.code(), Some("DMC1"));
        assert_eq!(event.input_file(), None);
    }

    #[test]
    fn test_standard_sinks_follow_config() {
        let mut config = CheckerConfig::default();
        let names = |config: &CheckerConfig| {
            standard_sinks(config)
                .iter()
                .map(|s| s.name().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&config), vec!["recent", "alert", "mail"]);

        config.csv_path = Some(PathBuf::from("/tmp/results.csv"));
        assert_eq!(names(&config), vec!["history", "recent", "alert", "mail"]);
    }

    #[test]
    fn test_detached_publisher_drops_events() {
        OutcomePublisher::detached().publish(failed_event());
    }
}
