//! Core types for identifier checks
//!
//! A check compares three identifier fields (HWEL, BTLD, SWFL) recorded in a
//! test report against the record for the same serial number in the settings
//! repository. Every value compared is in canonical hex form (`AA BB CC`).

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::Index;
use std::path::{Path, PathBuf};

use super::codec::IdentifierComponents;

// ============================================================================
// Fields
// ============================================================================

/// One of the three compared component categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Field {
    /// Hardware element
    Hwel,
    /// Bootloader
    Btld,
    /// Software flash
    Swfl,
}

impl Field {
    /// Comparison order. Results are always reported in this order.
    pub const ALL: [Field; 3] = [Field::Hwel, Field::Btld, Field::Swfl];

    /// Label used both in report text and as the settings id prefix.
    pub fn label(self) -> &'static str {
        match self {
            Field::Hwel => "HWEL",
            Field::Btld => "BTLD",
            Field::Swfl => "SWFL",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One value per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerField<T> {
    pub hwel: T,
    pub btld: T,
    pub swfl: T,
}

impl<T> PerField<T> {
    pub fn from_fn(mut f: impl FnMut(Field) -> T) -> Self {
        Self {
            hwel: f(Field::Hwel),
            btld: f(Field::Btld),
            swfl: f(Field::Swfl),
        }
    }

    pub fn get(&self, field: Field) -> &T {
        match field {
            Field::Hwel => &self.hwel,
            Field::Btld => &self.btld,
            Field::Swfl => &self.swfl,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &T)> {
        Field::ALL.into_iter().map(move |field| (field, self.get(field)))
    }
}

impl<T> Index<Field> for PerField<T> {
    type Output = T;

    fn index(&self, field: Field) -> &T {
        self.get(field)
    }
}

// ============================================================================
// Verdicts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NOK")]
    Nok,
}

impl Verdict {
    pub fn from_match(matched: bool) -> Self {
        if matched {
            Verdict::Ok
        } else {
            Verdict::Nok
        }
    }

    /// NOK when any input is NOK.
    pub fn combine(verdicts: impl IntoIterator<Item = Verdict>) -> Self {
        if verdicts.into_iter().any(|v| v == Verdict::Nok) {
            Verdict::Nok
        } else {
            Verdict::Ok
        }
    }

    pub fn is_ok(self) -> bool {
        self == Verdict::Ok
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Ok => "OK",
            Verdict::Nok => "NOK",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Report-mode results
// ============================================================================

/// Comparison of one field. Empty strings mean the value was not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResult {
    pub field: Field,
    pub report_value: String,
    pub settings_value: String,
    pub verdict: Verdict,
}

impl FieldResult {
    /// Strict string equality of the canonical forms.
    pub fn compare(field: Field, report_value: String, settings_value: String) -> Self {
        let verdict = Verdict::from_match(report_value == settings_value);
        Self {
            field,
            report_value,
            settings_value,
            verdict,
        }
    }
}

/// Result of one report check. Built once by the engine and never modified.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub serial_number: String,
    /// Always HWEL, BTLD, SWFL in that order.
    pub field_results: Vec<FieldResult>,
    pub final_verdict: Verdict,
    pub report_file: PathBuf,
    pub settings_file: PathBuf,
    pub settings_record_timestamp: RecordTimestamp,
    /// Settings ids before canonicalization, empty when absent.
    pub original_settings_ids: PerField<String>,
}

impl MatchOutcome {
    pub fn field(&self, field: Field) -> Option<&FieldResult> {
        self.field_results.iter().find(|r| r.field == field)
    }
}

// ============================================================================
// PDI-mode results
// ============================================================================

/// Spreadsheet-sourced values for a PDI check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdiInput {
    pub serial_number: String,
    pub values: PerField<IdentifierComponents>,
    /// Where the values were read from, for logs and history.
    #[serde(default)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdiFieldResult {
    pub field: Field,
    pub input_hex: String,
    pub input_dec: String,
    pub settings_hex: String,
    pub settings_dec: String,
    pub hex_match: Verdict,
    pub dec_match: Verdict,
    /// OK only when both parts match.
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdiOutcome {
    pub serial_number: String,
    pub field_results: Vec<PdiFieldResult>,
    pub final_verdict: Verdict,
    pub source_file: Option<PathBuf>,
    pub settings_file: PathBuf,
    pub settings_record_timestamp: RecordTimestamp,
    pub original_settings_ids: PerField<String>,
}

// ============================================================================
// Settings record timestamp
// ============================================================================

static SETTINGS_STAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_(\d{14})\.xml$").expect("valid settings stamp regex"));

/// Timestamp embedded in a settings file name (`..._YYYYMMDDHHMMSS.xml`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTimestamp {
    Parsed(NaiveDateTime),
    /// Fourteen digits that are not a real date.
    Invalid,
    Missing,
}

impl RecordTimestamp {
    pub fn from_settings_file(path: &Path) -> Self {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return RecordTimestamp::Missing;
        };
        match SETTINGS_STAMP.captures(&name) {
            Some(caps) => NaiveDateTime::parse_from_str(&caps[1], "%Y%m%d%H%M%S")
                .map(RecordTimestamp::Parsed)
                .unwrap_or(RecordTimestamp::Invalid),
            None => RecordTimestamp::Missing,
        }
    }
}

impl fmt::Display for RecordTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordTimestamp::Parsed(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            RecordTimestamp::Invalid => f.write_str("N/A (Invalid Date)"),
            RecordTimestamp::Missing => f.write_str("N/A"),
        }
    }
}

impl Serialize for RecordTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_and_labels() {
        let labels: Vec<_> = Field::ALL.iter().map(|f| f.label()).collect();
        assert_eq!(labels, vec!["HWEL", "BTLD", "SWFL"]);
    }

    #[test]
    fn test_verdict_combine() {
        assert_eq!(Verdict::combine([Verdict::Ok, Verdict::Ok]), Verdict::Ok);
        assert_eq!(
            Verdict::combine([Verdict::Ok, Verdict::Nok, Verdict::Ok]),
            Verdict::Nok
        );
        assert_eq!(Verdict::combine(Vec::new()), Verdict::Ok);
    }

    #[test]
    fn test_field_result_compare_is_strict() {
        let ok = FieldResult::compare(Field::Hwel, "AA BB".into(), "AA BB".into());
        assert_eq!(ok.verdict, Verdict::Ok);

        let nok = FieldResult::compare(Field::Hwel, "AA BB".into(), "AA BB CC".into());
        assert_eq!(nok.verdict, Verdict::Nok);

        // Both sides empty still compare equal.
        let empty = FieldResult::compare(Field::Swfl, String::new(), String::new());
        assert_eq!(empty.verdict, Verdict::Ok);
    }

    #[test]
    fn test_record_timestamp_from_file_name() {
        let parsed = RecordTimestamp::from_settings_file(Path::new(
            "/settings/line1_20240131235959.xml",
        ));
        assert_eq!(parsed.to_string(), "2024-01-31 23:59:59");

        let invalid =
            RecordTimestamp::from_settings_file(Path::new("/settings/x_20241341000000.xml"));
        assert_eq!(invalid, RecordTimestamp::Invalid);
        assert_eq!(invalid.to_string(), "N/A (Invalid Date)");

        let missing = RecordTimestamp::from_settings_file(Path::new("/settings/plain.xml"));
        assert_eq!(missing.to_string(), "N/A");
    }

    #[test]
    fn test_per_field_index_and_iter() {
        let values = PerField::from_fn(|f| f.label().to_lowercase());
        assert_eq!(values[Field::Btld], "btld");
        let collected: Vec<_> = values.iter().map(|(f, v)| (f, v.clone())).collect();
        assert_eq!(collected[2], (Field::Swfl, "swfl".to_string()));
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let outcome = MatchOutcome {
            serial_number: "SN1".into(),
            field_results: vec![FieldResult::compare(Field::Hwel, "AA".into(), "AA".into())],
            final_verdict: Verdict::Ok,
            report_file: PathBuf::from("r.xml"),
            settings_file: PathBuf::from("s.xml"),
            settings_record_timestamp: RecordTimestamp::Missing,
            original_settings_ids: PerField::default(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["finalVerdict"], "OK");
        assert_eq!(json["settingsRecordTimestamp"], "N/A");
        assert_eq!(json["fieldResults"][0]["field"], "HWEL");
        assert_eq!(json["originalSettingsIds"]["hwel"], "");
    }
}
