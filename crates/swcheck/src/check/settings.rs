//! Settings repository lookup
//!
//! Settings documents hold `hardware` records keyed by the `snr` attribute,
//! each with `te` children whose `id` starts with a field label. There is no
//! index: every lookup walks the settings tree, most recently modified file
//! first, and stops at the first file with a matching record.

use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::types::{Field, PerField};
use super::xml;

/// The record found for a serial number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsMatch {
    pub file: PathBuf,
    /// Raw `te/@id` per field, empty when the record has no such child.
    pub raw_ids: PerField<String>,
}

#[derive(Debug, Clone)]
pub struct SettingsResolver {
    root: PathBuf,
    extension: String,
}

impl SettingsResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: "xml".to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Settings files under the root, newest modification time first.
    ///
    /// Files with equal modification times keep file-name order. Files whose
    /// metadata cannot be read are left out.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut files: Vec<(PathBuf, SystemTime)> = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| has_extension(entry.path(), &self.extension))
            .filter_map(|entry| {
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some((entry.into_path(), modified))
            })
            .collect();

        files.sort_by(|a, b| b.1.cmp(&a.1));
        files.into_iter().map(|(path, _)| path).collect()
    }

    /// Find the record for `serial`. Unreadable or malformed candidates are
    /// skipped.
    pub fn resolve(&self, serial: &str) -> Option<SettingsMatch> {
        let started = Instant::now();
        let candidates = self.candidates();
        info!(
            serial,
            root = %self.root.display(),
            candidates = candidates.len(),
            "Searching settings by modification date"
        );

        let found = candidates
            .into_iter()
            .find_map(|path| match_in_file(&path, serial));

        info!(
            serial,
            elapsed_ms = started.elapsed().as_millis() as u64,
            found = found.is_some(),
            "Settings search finished"
        );
        if let Some(found) = &found {
            info!(serial, file = %found.file.display(), "Settings record found");
        }
        found
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

fn match_in_file(path: &Path, serial: &str) -> Option<SettingsMatch> {
    let text = match xml::read_document_text(path) {
        Ok(text) => text,
        Err(e) => {
            debug!(file = %path.display(), error = %e, "Skipping unreadable settings file");
            return None;
        }
    };
    let doc = match xml::parse(&text) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(file = %path.display(), error = %e, "Skipping malformed settings file");
            return None;
        }
    };

    let record = doc
        .root_element()
        .descendants()
        .skip(1)
        .find(|n| n.has_tag_name("hardware") && n.attribute("snr") == Some(serial))?;

    let raw_ids = PerField::from_fn(|field: Field| {
        record
            .descendants()
            .skip(1)
            .filter(|n| n.has_tag_name("te"))
            .filter_map(|n| n.attribute("id"))
            .find(|id| id.starts_with(field.label()))
            .unwrap_or_default()
            .to_string()
    });

    Some(SettingsMatch {
        file: path.to_path_buf(),
        raw_ids,
    })
}
