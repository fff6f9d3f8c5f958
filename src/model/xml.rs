//! Small tree-walking helpers shared by the entity constructors.

use chrono::{DateTime, NaiveDateTime};
use roxmltree::Node;
use std::borrow::Cow;
use std::str::FromStr;
use tracing::debug;

use crate::error::InvalidDocument;

pub const DATE_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

/// Decode raw document bytes. UTF-8 (optionally with BOM) and BOM-marked
/// UTF-16 are accepted.
pub fn decode(bytes: &[u8]) -> Result<Cow<'_, str>, InvalidDocument> {
    match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => utf8(rest),
        [0xFF, 0xFE, rest @ ..] => utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => utf16(rest, u16::from_be_bytes),
        _ => utf8(bytes),
    }
}

fn utf8(bytes: &[u8]) -> Result<Cow<'_, str>, InvalidDocument> {
    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(|e| InvalidDocument::Malformed(format!("invalid UTF-8: {}", e)))
}

fn utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<Cow<'static, str>, InvalidDocument> {
    if bytes.len() % 2 != 0 {
        return Err(InvalidDocument::Malformed(
            "odd number of bytes in UTF-16 input".to_string(),
        ));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .map(Cow::Owned)
        .map_err(|e| InvalidDocument::Malformed(format!("invalid UTF-16: {}", e)))
}

/// First element child with the given local name.
pub fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

pub fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

pub fn has_element_children(node: Node) -> bool {
    node.children().any(|c| c.is_element())
}

/// Trimmed text of an element; empty string for an empty element.
pub fn text(node: Node) -> String {
    node.text().unwrap_or("").trim().to_string()
}

pub fn child_text(node: Node, name: &str) -> Option<String> {
    child(node, name).map(text)
}

pub fn attribute(node: Node, name: &str) -> Option<String> {
    node.attribute(name).map(|v| v.trim().to_string())
}

/// Parse a number, treating anything unparsable as absent.
pub fn number<T: FromStr>(value: Option<&str>, field: &str) -> Option<T> {
    let value = value?.trim();
    match value.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            debug!("ignoring non-numeric {} {:?}", field, value);
            None
        }
    }
}

/// `%Y-%m-%d-%H:%M:%S`, falling back to RFC 2822 and RFC 3339.
pub fn date(value: Option<&str>, field: &str) -> Option<NaiveDateTime> {
    let value = value?.trim();
    NaiveDateTime::parse_from_str(value, DATE_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc2822(value)
                .ok()
                .map(|d| d.naive_utc())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|d| d.naive_utc())
        })
        .or_else(|| {
            debug!("ignoring malformed {} {:?}", field, value);
            None
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn decodes_utf8_with_and_without_bom() {
        assert_eq!(decode(b"<a/>").unwrap(), "<a/>");
        assert_eq!(decode(b"\xEF\xBB\xBF<a/>").unwrap(), "<a/>");
    }

    #[test]
    fn decodes_utf16() {
        let mut le = vec![0xFF, 0xFE];
        le.extend("<a/>".encode_utf16().flat_map(|u| u.to_le_bytes()));
        assert_eq!(decode(&le).unwrap(), "<a/>");

        let mut be = vec![0xFE, 0xFF];
        be.extend("<a/>".encode_utf16().flat_map(|u| u.to_be_bytes()));
        assert_eq!(decode(&be).unwrap(), "<a/>");
    }

    #[test]
    fn rejects_invalid_bytes() {
        assert!(matches!(
            decode(b"<a>\xFF\xFF</a>"),
            Err(InvalidDocument::Malformed(_))
        ));
        assert!(decode(&[0xFF, 0xFE, 0x3C]).is_err());
    }

    #[test]
    fn parses_native_date_format() {
        let parsed = date(Some("2009-06-15-12:30:45"), "releasedate").unwrap();
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2009, 6, 15));
        assert_eq!(
            (parsed.hour(), parsed.minute(), parsed.second()),
            (12, 30, 45)
        );
    }

    #[test]
    fn parses_fallback_date_formats() {
        let rfc2822 = date(Some("Mon, 15 Jun 2009 12:00:00 +0200"), "pubdate").unwrap();
        assert_eq!(rfc2822.hour(), 10);

        let rfc3339 = date(Some("2009-06-15T12:00:00Z"), "pubdate").unwrap();
        assert_eq!(rfc3339.day(), 15);
    }

    #[test]
    fn malformed_values_become_absent() {
        assert!(date(Some("yesterday"), "releasedate").is_none());
        assert!(date(None, "releasedate").is_none());
        assert_eq!(number::<u32>(Some("ten"), "preference"), None);
        assert_eq!(number::<u32>(Some(" 10 "), "preference"), Some(10));
    }
}
