//! NOK notification mails.
//!
//! Only NOK verdicts are mailed, report matches and PDI checks alike, and
//! only when recipients are configured.
//! Delivery goes through a [`MailTransport`]; the built-in transports log the
//! message or drop it as an HTML file into an outbox directory for an
//! external mailer to pick up.

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use super::{CheckEvent, OutcomeSink};
use crate::check::{Field, MatchOutcome, PdiOutcome, Verdict};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

impl MailMessage {
    pub fn nok_report(recipients: &[String], code: Option<&str>, outcome: &MatchOutcome) -> Self {
        let rows: Vec<_> = outcome
            .field_results
            .iter()
            .map(|r| MailRow {
                field: r.field,
                report: &r.report_value,
                settings: &r.settings_value,
                verdict: r.verdict,
            })
            .collect();
        Self::nok(
            recipients,
            &outcome.serial_number,
            code.unwrap_or("N/A"),
            &rows,
            &outcome.report_file.display().to_string(),
            &outcome.settings_file.display().to_string(),
        )
    }

    /// PDI mails compare the hex parts and report the combined verdict.
    pub fn nok_pdi(recipients: &[String], outcome: &PdiOutcome) -> Self {
        let rows: Vec<_> = outcome
            .field_results
            .iter()
            .map(|r| MailRow {
                field: r.field,
                report: &r.input_hex,
                settings: &r.settings_hex,
                verdict: r.verdict,
            })
            .collect();
        let source = outcome
            .source_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "N/A".to_string());
        Self::nok(
            recipients,
            &outcome.serial_number,
            PDI_CODE,
            &rows,
            &source,
            &outcome.settings_file.display().to_string(),
        )
    }

    fn nok(
        recipients: &[String],
        snr: &str,
        dmc: &str,
        rows: &[MailRow<'_>],
        report_file: &str,
        settings_file: &str,
    ) -> Self {
        Self {
            to: recipients.to_vec(),
            subject: format!("[swcheck] NOK - SNR {}", snr),
            html_body: render_nok_body(snr, dmc, rows, report_file, settings_file),
        }
    }
}

const PDI_CODE: &str = "PDI_CHECK";

struct MailRow<'a> {
    field: Field,
    report: &'a str,
    settings: &'a str,
    verdict: Verdict,
}

fn render_nok_body(
    snr: &str,
    dmc: &str,
    results: &[MailRow<'_>],
    report_file: &str,
    settings_file: &str,
) -> String {
    let mut rows = String::new();
    for result in results {
        let style = match result.verdict {
            Verdict::Nok => "color: red; font-weight: bold;",
            Verdict::Ok => "color: green;",
        };
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td style='{}'>{}</td></tr>",
            result.field,
            escape_html(result.report),
            escape_html(result.settings),
            style,
            result.verdict
        );
    }

    format!(
        "<html><body>\n\
         <p>A <strong>NOK</strong> result was detected.</p>\n\
         <p><strong>SNR:</strong> {snr}<br><strong>DMC:</strong> {dmc}</p>\n\
         <table border='1' cellpadding='5' cellspacing='0' style='border-collapse: collapse;'>\n\
         <tr style='background-color: #f2f2f2;'><th>Field</th><th>Report</th><th>Settings</th><th>Result</th></tr>\n\
         {rows}\n\
         </table>\n\
         <p><strong>Report:</strong> {report}<br><strong>Settings:</strong> {settings}</p>\n\
         </body></html>\n",
        snr = escape_html(snr),
        dmc = escape_html(dmc),
        report = escape_html(report_file),
        settings = escape_html(settings_file),
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub trait MailTransport: Send + 'static {
    fn send(&mut self, message: &MailMessage) -> Result<()>;
}

/// Logs the message instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl MailTransport for LogTransport {
    fn send(&mut self, message: &MailMessage) -> Result<()> {
        info!(
            to = %message.to.join("; "),
            subject = %message.subject,
            "NOK mail (no outbox configured)"
        );
        Ok(())
    }
}

/// Writes each message to `<outbox>/<timestamp>_<snr>.html`, with the
/// headers as HTML comments.
#[derive(Debug, Clone)]
pub struct OutboxTransport {
    dir: PathBuf,
}

impl OutboxTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl MailTransport for OutboxTransport {
    fn send(&mut self, message: &MailMessage) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create outbox {}", self.dir.display()))?;

        let snr = message
            .subject
            .rsplit(' ')
            .next()
            .unwrap_or("unknown")
            .replace(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_', "_");
        let path = self.dir.join(format!(
            "{}_{}.html",
            Local::now().format("%Y%m%d_%H%M%S%3f"),
            snr
        ));

        let content = format!(
            "<!-- To: {} -->\n<!-- Subject: {} -->\n{}",
            message.to.join("; "),
            message.subject,
            message.html_body
        );
        fs::write(&path, content)
            .with_context(|| format!("Failed to write mail {}", path.display()))?;
        info!(path = %path.display(), subject = %message.subject, "NOK mail written to outbox");
        Ok(())
    }
}

pub struct MailSink {
    recipients: Vec<String>,
    transport: Box<dyn MailTransport>,
}

impl MailSink {
    pub fn new(recipients: Vec<String>, transport: impl MailTransport) -> Self {
        Self {
            recipients,
            transport: Box::new(transport),
        }
    }
}

impl OutcomeSink for MailSink {
    fn name(&self) -> &str {
        "mail"
    }

    fn handle(&mut self, event: &CheckEvent) -> Result<()> {
        if self.recipients.is_empty() {
            return Ok(());
        }
        let message = match event {
            CheckEvent::Matched { code, outcome, .. } if outcome.final_verdict == Verdict::Nok => {
                MailMessage::nok_report(&self.recipients, code.as_deref(), outcome)
            }
            CheckEvent::PdiChecked { outcome } if outcome.final_verdict == Verdict::Nok => {
                MailMessage::nok_pdi(&self.recipients, outcome)
            }
            _ => return Ok(()),
        };
        self.transport.send(&message)
    }
}
