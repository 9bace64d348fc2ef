//! `swcheck pdi` - compare spreadsheet values against the settings record

use anyhow::Result;
use std::path::PathBuf;
use std::process::ExitCode;

use super::error::HelpfulError;
use super::{exit_code_for, output, start_bus};
use swcheck::check::{IdentifierComponents, PdiInput, PerField};
use swcheck::config::CheckerConfig;
use swcheck::watch::run_pdi_check;

#[derive(Debug, clap::Args)]
pub struct PdiArgs {
    /// Serial number
    #[arg(long)]
    pub snr: String,

    #[arg(long, default_value = "")]
    pub hwel_hex: String,
    #[arg(long, default_value = "")]
    pub hwel_dec: String,

    #[arg(long, default_value = "")]
    pub btld_hex: String,
    #[arg(long, default_value = "")]
    pub btld_dec: String,

    #[arg(long, default_value = "")]
    pub swfl_hex: String,
    #[arg(long, default_value = "")]
    pub swfl_dec: String,

    /// Spreadsheet the values came from, recorded in history
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

impl PdiArgs {
    fn into_input(self) -> PdiInput {
        PdiInput {
            serial_number: self.snr,
            values: PerField {
                hwel: IdentifierComponents::new(self.hwel_hex, self.hwel_dec),
                btld: IdentifierComponents::new(self.btld_hex, self.btld_dec),
                swfl: IdentifierComponents::new(self.swfl_hex, self.swfl_dec),
            },
            source: self.source,
        }
    }
}

pub fn run(config: &CheckerConfig, args: PdiArgs) -> Result<ExitCode> {
    let json = args.json;
    let input = args.into_input();

    let bus = start_bus(config)?;
    let publisher = bus.publisher();
    let result = run_pdi_check(config, &input, &publisher);
    drop(publisher);
    bus.shutdown();

    let outcome = result.map_err(|e| HelpfulError::from_check(&e))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        output::print_pdi_outcome(&outcome);
    }
    Ok(exit_code_for(outcome.final_verdict))
}
