//! Reports root layout: `<root>/<code>/<timestamp folder>/<report file>`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::check::CheckError;

static TIMESTAMP_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"^\d{4}-\d{2}-\d{2}[-_]\d{2}[-_]\d{2}[-_]\d{2}$").expect("valid pattern"),
        Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid pattern"),
        Regex::new(r"^\d{14}$").expect("valid pattern"),
    ]
});

/// Folder names accepted as test-run timestamps. All accepted shapes are
/// zero-padded and fixed-width, so name order is chronological order.
pub fn is_timestamp_folder(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_digit())
        && TIMESTAMP_PATTERNS.iter().any(|re| re.is_match(name))
}

/// Why a folder has no report to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLookup {
    NoTimestampFolder,
    NoReportFile,
}

/// Timestamp subfolders of `dir`, newest name first.
pub fn timestamp_folders(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut folders: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            is_timestamp_folder(&name).then(|| (name, entry.path()))
        })
        .collect();
    folders.sort_by(|a, b| b.0.cmp(&a.0));
    folders.into_iter().map(|(_, path)| path).collect()
}

/// First report file anywhere under the newest timestamp folder of `dir`.
///
/// Older timestamp folders are not consulted when the newest one has no
/// report.
pub fn newest_report_in(dir: &Path, extension: &str) -> Result<PathBuf, ReportLookup> {
    let newest = timestamp_folders(dir)
        .into_iter()
        .next()
        .ok_or(ReportLookup::NoTimestampFolder)?;

    WalkDir::new(&newest)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .find(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .ok_or(ReportLookup::NoReportFile)
}

/// Report for an operator-supplied code: the most recently modified
/// directory under `reports_root` whose name starts with `code`, then the
/// newest report inside it.
pub fn find_report_for_code(
    reports_root: &Path,
    code: &str,
    extension: &str,
) -> Result<Option<PathBuf>, CheckError> {
    let entries = fs::read_dir(reports_root)
        .map_err(|e| CheckError::missing_path(reports_root, e.to_string()))?;

    let newest_dir = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(code))
        .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((entry.path(), modified))
        })
        .max_by_key(|(_, modified)| *modified)
        .map(|(path, _)| path);

    Ok(newest_dir.and_then(|dir| newest_report_in(&dir, extension).ok()))
}

/// Code folder name for a report at `<root>/<code>/<timestamp>/<file>`.
pub fn code_for_report(report_file: &Path) -> Option<String> {
    report_file
        .parent()?
        .parent()?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
