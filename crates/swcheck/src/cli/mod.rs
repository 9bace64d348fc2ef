//! CLI module for swcheck
//!
//! Every command loads the configuration once and passes it down. Commands
//! that run checks start an outcome bus with the standard sinks and shut it
//! down before returning, so history and logs are written when the process
//! exits.

pub mod error;
pub mod output;

pub mod check;
pub mod config;
pub mod history;
pub mod pdi;
pub mod smac;
pub mod status;
pub mod watch;

use anyhow::Result;
use std::process::ExitCode;

use swcheck::check::Verdict;
use swcheck::config::CheckerConfig;
use swcheck::sinks::{standard_sinks, OutcomeBus};

/// Process exit code for a check that could not produce a verdict.
pub const EXIT_CHECK_FAILED: u8 = 2;

pub fn exit_code_for(verdict: Verdict) -> ExitCode {
    if verdict.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

pub fn start_bus(config: &CheckerConfig) -> Result<OutcomeBus> {
    OutcomeBus::start(standard_sinks(config))
}
