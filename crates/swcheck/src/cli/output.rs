//! Output formatting utilities for CLI commands

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

use swcheck::check::{MatchOutcome, PdiOutcome, Verdict};

/// Print a table with headers and rows
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = new_table(headers);
    for row in rows {
        table.add_row(row);
    }
    println!("{}", table);
}

/// Print a table with custom column colors
pub fn print_table_colored(headers: &[&str], rows: Vec<Vec<(String, Option<Color>)>>) {
    let mut table = new_table(headers);
    for row in rows {
        let cells: Vec<Cell> = row
            .into_iter()
            .map(|(text, color)| match color {
                Some(c) => Cell::new(text).fg(c),
                None => Cell::new(text),
            })
            .collect();
        table.add_row(cells);
    }
    println!("{}", table);
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);
    table
}

pub fn verdict_color(verdict: Verdict) -> Color {
    match verdict {
        Verdict::Ok => Color::Green,
        Verdict::Nok => Color::Red,
    }
}

/// Text color for a verdict string from the history file.
pub fn result_color(result: &str) -> Option<Color> {
    match result {
        "OK" => Some(Color::Green),
        "NOK" => Some(Color::Red),
        "ERROR" => Some(Color::Yellow),
        _ => None,
    }
}

fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

pub fn print_match_outcome(code: Option<&str>, outcome: &MatchOutcome) {
    println!("SNR:       {}", outcome.serial_number);
    if let Some(code) = code {
        println!("DMC:       {}", code);
    }
    println!("Report:    {}", outcome.report_file.display());
    println!(
        "Settings:  {} ({})",
        outcome.settings_file.display(),
        outcome.settings_record_timestamp
    );
    println!();

    let rows = outcome
        .field_results
        .iter()
        .map(|r| {
            vec![
                (r.field.to_string(), None),
                (or_dash(&r.report_value), None),
                (or_dash(&r.settings_value), None),
                (r.verdict.to_string(), Some(verdict_color(r.verdict))),
            ]
        })
        .collect();
    print_table_colored(&["FIELD", "REPORT", "SETTINGS", "RESULT"], rows);
    print_final(outcome.final_verdict);
}

pub fn print_pdi_outcome(outcome: &PdiOutcome) {
    println!("SNR:       {}", outcome.serial_number);
    println!(
        "Settings:  {} ({})",
        outcome.settings_file.display(),
        outcome.settings_record_timestamp
    );
    println!();

    let rows = outcome
        .field_results
        .iter()
        .map(|r| {
            vec![
                (r.field.to_string(), None),
                (or_dash(&r.input_hex), None),
                (or_dash(&r.settings_hex), Some(verdict_color(r.hex_match))),
                (or_dash(&r.input_dec), None),
                (or_dash(&r.settings_dec), Some(verdict_color(r.dec_match))),
                (r.verdict.to_string(), Some(verdict_color(r.verdict))),
            ]
        })
        .collect();
    print_table_colored(
        &["FIELD", "INPUT HEX", "SETTINGS HEX", "INPUT DEC", "SETTINGS DEC", "RESULT"],
        rows,
    );
    print_final(outcome.final_verdict);
}

fn print_final(verdict: Verdict) {
    println!();
    println!("FINAL: {}", verdict);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_color() {
        assert_eq!(result_color("OK"), Some(Color::Green));
        assert_eq!(result_color("NOK"), Some(Color::Red));
        assert_eq!(result_color("?"), None);
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(""), "-");
        assert_eq!(or_dash("AA"), "AA");
    }
}
