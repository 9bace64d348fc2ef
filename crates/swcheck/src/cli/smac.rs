//! `swcheck smac` - write a SMAC document for a set of settings ids

use anyhow::Result;
use std::path::PathBuf;

use swcheck::check::PerField;
use swcheck::smac::write_smac_file;

#[derive(Debug, clap::Args)]
pub struct SmacArgs {
    /// Serial number, used in the file name
    #[arg(long)]
    pub snr: String,

    /// HWEL settings id (e.g. HWEL_0000_1A2B)
    #[arg(long, default_value = "")]
    pub hwel: String,

    #[arg(long, default_value = "")]
    pub btld: String,

    #[arg(long, default_value = "")]
    pub swfl: String,

    /// Output directory
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}

pub fn run(args: SmacArgs) -> Result<()> {
    let ids = PerField {
        hwel: args.hwel,
        btld: args.btld,
        swfl: args.swfl,
    };
    let path = write_smac_file(&args.out, &args.snr, &ids)?;
    println!("Wrote {}", path.display());
    Ok(())
}
