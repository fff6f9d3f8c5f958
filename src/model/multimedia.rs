use roxmltree::Node;
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::time::Duration;

use super::xml;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaValue {
    Integer(u64),
    Duration(Duration),
    Dimensions { width: u64, height: u64 },
    Text(String),
}

fn numeric(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

impl MediaValue {
    /// Integer, then `mm:ss`/`hh:mm:ss`, then `WxH`, else raw text. The
    /// first rule that accepts the text wins.
    pub fn coerce(text: &str) -> Self {
        let text = text.trim();
        if let Some(n) = numeric(text) {
            return Self::Integer(n);
        }
        if let Some(duration) = Self::duration(text) {
            return Self::Duration(duration);
        }
        if let Some((width, height)) = Self::dimensions(text) {
            return Self::Dimensions { width, height };
        }
        Self::Text(text.to_string())
    }

    fn duration(text: &str) -> Option<Duration> {
        let parts: Option<Vec<u64>> = text.split(':').map(numeric).collect();
        let seconds = match parts?.as_slice() {
            [m, s] => m.checked_mul(60)?.checked_add(*s)?,
            [h, m, s] => h
                .checked_mul(3600)?
                .checked_add(m.checked_mul(60)?)?
                .checked_add(*s)?,
            _ => return None,
        };
        Some(Duration::from_secs(seconds))
    }

    fn dimensions(text: &str) -> Option<(u64, u64)> {
        let (width, height) = text.split_once('x')?;
        Some((numeric(width.trim())?, numeric(height.trim())?))
    }
}

/// `type → attribute → value`, e.g. `video → resolution → 640x480`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Multimedia {
    streams: BTreeMap<String, BTreeMap<String, MediaValue>>,
}

impl Multimedia {
    pub(crate) fn from_node(node: Node) -> Self {
        let streams: BTreeMap<String, BTreeMap<String, MediaValue>> = node
            .children()
            .filter(Node::is_element)
            .map(|stream| {
                let attributes: BTreeMap<String, MediaValue> = stream
                    .children()
                    .filter(Node::is_element)
                    .map(|attr| {
                        (
                            attr.tag_name().name().to_string(),
                            MediaValue::coerce(&xml::text(attr)),
                        )
                    })
                    .collect();
                (stream.tag_name().name().to_string(), attributes)
            })
            .collect();
        Self { streams }
    }

    pub fn get(&self, kind: &str, attribute: &str) -> Option<&MediaValue> {
        self.streams.get(kind)?.get(attribute)
    }

    pub fn attributes(&self, kind: &str) -> Option<&BTreeMap<String, MediaValue>> {
        self.streams.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

impl<'a> IntoIterator for &'a Multimedia {
    type Item = (&'a String, &'a BTreeMap<String, MediaValue>);
    type IntoIter = btree_map::Iter<'a, String, BTreeMap<String, MediaValue>>;

    fn into_iter(self) -> Self::IntoIter {
        self.streams.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn coercion_order() {
        assert_eq!(MediaValue::coerce("120"), MediaValue::Integer(120));
        assert_eq!(
            MediaValue::coerce("3:45"),
            MediaValue::Duration(Duration::from_secs(225))
        );
        assert_eq!(
            MediaValue::coerce("1:00:05"),
            MediaValue::Duration(Duration::from_secs(3605))
        );
        assert_eq!(
            MediaValue::coerce("640 x 480"),
            MediaValue::Dimensions {
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn partial_matches_stay_text() {
        assert_eq!(MediaValue::coerce("12x"), MediaValue::Text("12x".to_string()));
        assert_eq!(MediaValue::coerce("1x2x3"), MediaValue::Text("1x2x3".to_string()));
        assert_eq!(MediaValue::coerce("3:4a"), MediaValue::Text("3:4a".to_string()));
        assert_eq!(MediaValue::coerce("-5"), MediaValue::Text("-5".to_string()));
        assert_eq!(MediaValue::coerce("h264"), MediaValue::Text("h264".to_string()));
    }

    #[test]
    fn builds_two_level_mapping() {
        let doc = Document::parse(
            "<multimedia>
                <video><resolution>1280x720</resolution><duration>90:00</duration></video>
                <audio><bitrate>192</bitrate><codec>vorbis</codec></audio>
            </multimedia>",
        )
        .unwrap();
        let media = Multimedia::from_node(doc.root_element());

        assert_eq!(media.kinds().collect::<Vec<_>>(), ["audio", "video"]);
        assert_eq!(media.get("audio", "bitrate"), Some(&MediaValue::Integer(192)));
        assert_eq!(
            media.get("video", "duration"),
            Some(&MediaValue::Duration(Duration::from_secs(5400)))
        );
        assert_eq!(
            media.get("audio", "codec"),
            Some(&MediaValue::Text("vorbis".to_string()))
        );
        assert_eq!(media.get("subtitles", "language"), None);
        assert_eq!(media.into_iter().count(), 2);
    }
}
