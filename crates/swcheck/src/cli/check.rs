//! `swcheck check` - manual check of one report

use anyhow::Result;
use std::path::PathBuf;
use std::process::ExitCode;

use super::error::HelpfulError;
use super::{exit_code_for, output, start_bus};
use swcheck::config::CheckerConfig;
use swcheck::watch::{code_for_report, run_manual_check, run_report_check, ManualCheckError};

#[derive(Debug, clap::Args)]
pub struct CheckArgs {
    /// Code (DMC) to look up under the reports folder
    #[arg(required_unless_present = "report", conflicts_with = "report")]
    pub code: Option<String>,

    /// Check this report file instead of looking one up
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(config: &CheckerConfig, args: CheckArgs) -> Result<ExitCode> {
    let bus = start_bus(config)?;
    let publisher = bus.publisher();

    let result = match (&args.report, &args.code) {
        (Some(report), _) => run_report_check(config, report, &publisher)
            .map(|outcome| (code_for_report(report), outcome))
            .map_err(ManualCheckError::from),
        (None, Some(code)) => run_manual_check(config, code, &publisher)
            .map(|outcome| (code_for_report(&outcome.report_file), outcome)),
        (None, None) => Err(ManualCheckError::NotConfigured),
    };

    drop(publisher);
    bus.shutdown();

    let (code, outcome) = result.map_err(|e| HelpfulError::from_manual(&e))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        output::print_match_outcome(code.as_deref(), &outcome);
    }
    Ok(exit_code_for(outcome.final_verdict))
}
