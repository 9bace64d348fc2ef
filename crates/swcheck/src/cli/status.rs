//! `swcheck status` - configuration readiness

use anyhow::Result;
use comfy_table::Color;
use std::path::Path;

use super::output::print_table_colored;
use swcheck::config::CheckerConfig;

#[derive(Debug, clap::Args)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn folder_state(path: Option<&Path>) -> (String, &'static str) {
    match path {
        None => ("(not set)".to_string(), "missing"),
        Some(p) if p.is_dir() => (p.display().to_string(), "ok"),
        Some(p) => (p.display().to_string(), "not a directory"),
    }
}

pub fn run(config: &CheckerConfig, config_path: &Path, args: StatusArgs) -> Result<()> {
    let status = config.status();
    let settings = folder_state(config.settings_folder.as_deref());
    let reports = folder_state(config.reports_folder.as_deref());
    let history = config
        .history_file()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string());

    if args.json {
        let payload = serde_json::json!({
            "ready": status.is_ready(),
            "message": status.message(),
            "config": config_path.display().to_string(),
            "settings_folder": { "path": settings.0, "state": settings.1 },
            "reports_folder": { "path": reports.0, "state": reports.1 },
            "history_file": history,
            "mail_recipients": config.mail_recipients.len(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let state_color = |state: &str| {
        if state == "ok" {
            Some(Color::Green)
        } else {
            Some(Color::Red)
        }
    };
    print_table_colored(
        &["ITEM", "PATH", "STATE"],
        vec![
            vec![
                ("Settings folder".to_string(), None),
                (settings.0, None),
                (settings.1.to_string(), state_color(settings.1)),
            ],
            vec![
                ("Reports folder".to_string(), None),
                (reports.0, None),
                (reports.1.to_string(), state_color(reports.1)),
            ],
            vec![
                ("History file".to_string(), None),
                (history, None),
                (String::new(), None),
            ],
        ],
    );
    println!();
    println!("Config: {}", config_path.display());
    println!("{}", status.message());
    Ok(())
}
