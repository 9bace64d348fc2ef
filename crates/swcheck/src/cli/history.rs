//! `swcheck history` - show the results CSV

use anyhow::Result;

use super::error::HelpfulError;
use super::output::{print_table, print_table_colored, result_color};
use swcheck::config::CheckerConfig;
use swcheck::sinks::{HistoryLog, HistoryStats};

#[derive(Debug, clap::Args)]
pub struct HistoryArgs {
    /// Show totals instead of rows
    #[arg(long)]
    pub stats: bool,

    /// Number of most recent rows to show
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(config: &CheckerConfig, args: HistoryArgs) -> Result<()> {
    let Some(path) = config.history_file() else {
        return Err(HelpfulError::new("No history file configured")
            .with_suggestion("TRY: Set csv_path in the config file")
            .into());
    };
    let log = HistoryLog::new(path);

    if args.stats {
        let stats = log.stats()?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            print_stats(&stats);
        }
        return Ok(());
    }

    let rows = log.read_all()?;
    let start = rows.len().saturating_sub(args.limit);
    let recent = &rows[start..];

    if args.json {
        println!("{}", serde_json::to_string_pretty(recent)?);
        return Ok(());
    }
    if recent.is_empty() {
        println!("No checks recorded in {}", log.path().display());
        return Ok(());
    }

    let table_rows = recent
        .iter()
        .rev()
        .map(|row| {
            vec![
                (row.timestamp.clone(), None),
                (row.dmc.clone(), None),
                (row.snr.clone(), None),
                (row.final_result.clone(), result_color(&row.final_result)),
            ]
        })
        .collect();
    print_table_colored(&["TIMESTAMP", "DMC", "SNR", "RESULT"], table_rows);
    println!();
    println!("{} of {} rows from {}", recent.len(), rows.len(), log.path().display());
    Ok(())
}

fn print_stats(stats: &HistoryStats) {
    print_table(
        &["METRIC", "VALUE"],
        vec![
            vec!["OK".to_string(), stats.total_ok.to_string()],
            vec!["NOK".to_string(), stats.total_nok.to_string()],
            vec!["NOK HWEL".to_string(), stats.nok_details.hwel.to_string()],
            vec!["NOK BTLD".to_string(), stats.nok_details.btld.to_string()],
            vec!["NOK SWFL".to_string(), stats.nok_details.swfl.to_string()],
            vec!["Last result".to_string(), stats.last_result.clone()],
            vec!["Last check".to_string(), stats.last_timestamp.clone()],
        ],
    );
}
