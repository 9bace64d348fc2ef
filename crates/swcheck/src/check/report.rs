//! Report document extraction
//!
//! The serial number lives in the `info` element named `BMW PartNumber`.
//! Field values are found in the text of the `teststep` elements: all step
//! texts are joined with single spaces, and for each field the window from
//! the first case-insensitive occurrence of its label to the end of the text
//! is searched for a byte run. Windows overlap; a later label can fall inside
//! an earlier field's window.

use regex::RegexBuilder;
use roxmltree::{Document, Node};
use std::path::Path;

use super::codec::extract_bytes_from_free_text;
use super::error::CheckError;
use super::types::{Field, PerField};
use super::xml;

const SERIAL_INFO_NAME: &str = "BMW PartNumber";

/// What a report says about the unit under test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportExtract {
    /// `None` when the metadata node is missing or empty.
    pub serial_number: Option<String>,
    /// Canonical hex per field, empty when not found.
    pub fields: PerField<String>,
}

/// Read and parse a report file.
///
/// A missing serial number is not an error here; the engine decides how to
/// treat it.
pub fn parse_report(path: &Path) -> Result<ReportExtract, CheckError> {
    let text = xml::read_document_text(path).map_err(|e| CheckError::ReportUnparseable {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let doc = xml::parse(&text).map_err(|e| CheckError::ReportUnparseable {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    Ok(extract_report(&doc))
}

pub fn extract_report(doc: &Document<'_>) -> ReportExtract {
    let step_text = teststep_text(doc);
    ReportExtract {
        serial_number: serial_number(doc),
        fields: PerField::from_fn(|field| field_value(&step_text, field)),
    }
}

fn serial_number(doc: &Document<'_>) -> Option<String> {
    doc.root_element()
        .descendants()
        .skip(1)
        .filter(|n| n.has_tag_name("info"))
        .find(|info| {
            xml::child_element(*info, "name")
                .map(|name| xml::string_value(name) == SERIAL_INFO_NAME)
                .unwrap_or(false)
        })
        .and_then(|info| xml::child_element(info, "description"))
        .and_then(leading_text)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Leading text of every `teststep`, in document order, joined by spaces.
fn teststep_text(doc: &Document<'_>) -> String {
    doc.root_element()
        .descendants()
        .skip(1)
        .filter(|n| n.has_tag_name("teststep"))
        .filter_map(leading_text)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text before the first child element, if any.
fn leading_text<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.first_child().filter(|n| n.is_text()).and_then(|n| n.text())
}

/// Byte run inside the window that starts at the field's label.
fn field_value(step_text: &str, field: Field) -> String {
    let label = RegexBuilder::new(&regex::escape(field.label()))
        .case_insensitive(true)
        .build();
    match label {
        Ok(label) => label
            .find(step_text)
            .map(|m| extract_bytes_from_free_text(&step_text[m.start()..]))
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(steps: &[&str], serial: Option<&str>) -> String {
        let mut doc = String::from("<report><header>");
        if let Some(serial) = serial {
            doc.push_str(&format!(
                "<info><name>BMW PartNumber</name><description>{serial}</description></info>"
            ));
        }
        doc.push_str("<info><name>Operator</name><description>jdoe</description></info>");
        doc.push_str("</header><steps>");
        for step in steps {
            doc.push_str(&format!("<teststep>{step}</teststep>"));
        }
        doc.push_str("</steps></report>");
        doc
    }

    fn extract(text: &str) -> ReportExtract {
        let doc = xml::parse(text).unwrap();
        extract_report(&doc)
    }

    #[test]
    fn test_extracts_serial_and_fields() {
        let text = report(
            &[
                "HWEL read: aa bb cc",
                "btld read: 01 02 03 04",
                "SWFL read: 0A0B0C",
            ],
            Some("SN1"),
        );
        let parsed = extract(&text);
        assert_eq!(parsed.serial_number.as_deref(), Some("SN1"));
        assert_eq!(parsed.fields.hwel, "AA BB CC");
        assert_eq!(parsed.fields.btld, "01 02 03 04");
        assert_eq!(parsed.fields.swfl, "0A 0B 0C");
    }

    #[test]
    fn test_missing_serial_is_none() {
        let first = extract(&report(&["HWEL aa bb cc"], None));
        assert_eq!(first.serial_number, None);

        let blank = extract(&report(&["HWEL aa bb cc"], Some("")));
        assert_eq!(blank.serial_number, None);
    }

    #[test]
    fn test_windows_overlap_when_labels_are_out_of_order() {
        // SWFL appears first, so its window also contains the HWEL label and
        // bytes; HWEL finds its own bytes further on.
        let text = report(&["SWFL pending", "HWEL 11 22 33"], Some("SN2"));
        let parsed = extract(&text);
        assert_eq!(parsed.fields.swfl, "11 22 33");
        assert_eq!(parsed.fields.hwel, "11 22 33");
        assert_eq!(parsed.fields.btld, "");
    }

    #[test]
    fn test_only_leading_step_text_is_used() {
        let text = "<report><teststep><sub>HWEL aa bb cc</sub></teststep>\
                    <teststep>HWEL dd ee ff</teststep></report>";
        assert_eq!(extract(text).fields.hwel, "DD EE FF");
    }

    #[test]
    fn test_parse_report_rejects_malformed_xml() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("broken.xml");
        std::fs::write(&path, "<report><teststep>").unwrap();

        let err = parse_report(&path).unwrap_err();
        assert_eq!(err.code(), "msgInvalidReportXML");
    }
}
