//! Identifier checks: canonicalization, report and settings extraction, and
//! the match engine that compares them.

pub mod codec;
pub mod engine;
pub mod error;
pub mod report;
pub mod settings;
pub mod types;
pub mod xml;

pub use codec::{
    canonicalize_hex, extract_bytes_from_free_text, parse_identifier_components,
    parse_identifier_to_hex, IdentifierComponents,
};
pub use engine::MatchEngine;
pub use error::CheckError;
pub use report::{extract_report, parse_report, ReportExtract};
pub use settings::{SettingsMatch, SettingsResolver};
pub use types::{
    Field, FieldResult, MatchOutcome, PdiFieldResult, PdiInput, PdiOutcome, PerField,
    RecordTimestamp, Verdict,
};
