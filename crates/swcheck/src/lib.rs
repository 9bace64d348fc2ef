//! swcheck - Software Identifier Checker
//!
//! Verifies the HWEL, BTLD and SWFL identifiers recorded in a test report
//! against the settings repository record for the same serial number.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Reports tree │     │    watch     │     │    check     │     │    sinks     │
//! │ <code>/<ts>/ │────▶│ (poll, settle│────▶│ (report vs.  │────▶│ (history,    │
//! │   report.xml │     │  resolve)    │     │  settings)   │     │  alert, mail)│
//! └──────────────┘     └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Manual and PDI checks enter at `check` through [`watch::manual`] and
//! publish on the same outcome bus.

pub mod check;
pub mod config;
pub mod sinks;
pub mod smac;
pub mod watch;

pub use check::{CheckError, MatchEngine, MatchOutcome, PdiInput, PdiOutcome, Verdict};
pub use config::{CheckerConfig, ConfigStatus};
pub use sinks::{CheckEvent, OutcomeBus, OutcomePublisher, OutcomeSink, Trigger};
pub use watch::{start_watching, CancellationToken, FolderWatchPipeline};
