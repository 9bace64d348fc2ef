//! Loading of report and settings documents.
//!
//! Test benches write reports in whatever encoding their host uses, so bytes
//! that are not valid UTF-8 are read as Latin-1 rather than rejected.

use roxmltree::{Document, Node, ParsingOptions};
use std::fs;
use std::io;
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Read a document into a string ready for [`parse`].
pub fn read_document_text(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(decode(bytes))
}

fn decode(bytes: Vec<u8>) -> String {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => body.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Parse with DTDs allowed; generated settings exports carry a doctype.
pub fn parse(text: &str) -> Result<Document<'_>, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options)
}

/// Concatenated text of a node and all its descendants.
pub fn string_value(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// First element child with the given tag name.
pub fn child_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_strips_bom() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.xml");
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"<a>x</a>");
        fs::write(&path, bytes).unwrap();

        let text = read_document_text(&path).unwrap();
        assert_eq!(text, "<a>x</a>");
        assert!(parse(&text).is_ok());
    }

    #[test]
    fn test_read_falls_back_to_latin1() {
        let text = decode(b"<a>Gr\xFC\xDFe</a>".to_vec());
        assert_eq!(text, "<a>Grüße</a>");
    }

    #[test]
    fn test_string_value_joins_descendants() {
        let doc = parse("<info><name>BMW <b>Part</b>Number</name></info>").unwrap();
        let name = child_element(doc.root_element(), "name").unwrap();
        assert_eq!(string_value(name), "BMW PartNumber");
    }

    #[test]
    fn test_parse_accepts_doctype() {
        let text = "<?xml version=\"1.0\"?><!DOCTYPE settings><settings/>";
        assert!(parse(text).is_ok());
    }
}
