//! SMAC JSON documents.
//!
//! A SMAC document replays a `STATUS_SVK_SMACS_CURRENT_FUNKTIONAL` job result
//! carrying the three SGBM ids of a settings record. Settings ids use `_` as
//! separator (`HWEL_0000_1234`); SMAC ids use `-`.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::check::{Field, PerField};

/// `HWEL_0000_1234` becomes `HWEL-0000-1234`. Only the first two
/// separators are replaced; ids with fewer than three segments are returned
/// unchanged.
pub fn to_smac_id(id: &str) -> String {
    let parts: Vec<&str> = id.splitn(3, '_').collect();
    match parts.as_slice() {
        [a, b, c] => format!("{a}-{b}-{c}"),
        _ => id.to_string(),
    }
}

fn sgbm_item(index: usize, value: String) -> Value {
    json!({
        "name": format!("SGBM_ID[0][{index}]"),
        "type": "TEXT",
        "value": value,
    })
}

/// The SMAC document for a settings record's ids.
pub fn smac_document(ids: &PerField<String>) -> Value {
    let mut items = vec![json!({
        "name": "SMAC_ID[0]",
        "type": "BINARY",
        "value": "00 51",
    })];
    items.extend(
        Field::ALL
            .into_iter()
            .enumerate()
            .map(|(index, field)| sgbm_item(index, to_smac_id(&ids[field]))),
    );
    items.push(json!({
        "name": "PROGRAMMING_DEPENDENCIES_CHECKED[0]",
        "type": "TEXT",
        "value": "0x01",
    }));
    items.push(json!({
        "name": "PROGRAMMING_DEPENDENCIES_CHECKED_TEXT[0]",
        "type": "TEXT",
        "value": "correct Result",
    }));

    json!({
        "documentVersion": "1.0",
        "comment": "",
        "testStepResults": [{
            "step": 1,
            "description": r#"apiJob("F01","STATUS_SVK_SMACS_CURRENT_FUNKTIONAL","","")"#,
            "iterations": [{
                "iteration": 1,
                "resultItems": [{
                    "name": "Set : 2",
                    "type": "",
                    "value": "",
                    "resultItems": items,
                }],
            }],
        }],
    })
}

/// Write `SMAC_<snr>.json` into `dir` and return its path.
pub fn write_smac_file(dir: &Path, snr: &str, ids: &PerField<String>) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let name: String = snr
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let name = if name.is_empty() { "unknown".to_string() } else { name };
    let path = dir.join(format!("SMAC_{name}.json"));

    let json = serde_json::to_string_pretty(&smac_document(ids))?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), snr = %snr, "SMAC document written");
    Ok(path)
}
