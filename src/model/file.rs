use chrono::NaiveDateTime;
use roxmltree::Node;
use serde::Serialize;
use std::fmt;
use std::slice;

use super::info::{Info, Tags};
use super::multimedia::Multimedia;
use super::url::Url;
use super::xml;

/// `File::size` when the document does not state one.
pub const UNKNOWN_SIZE: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    Hash,
    Signature,
    /// Per-chunk hashes of `length`-byte pieces, in piece order.
    Pieces { length: u64, hashes: Vec<String> },
    Other(String),
}

impl DescriptorKind {
    pub fn label(&self) -> &str {
        match self {
            Self::Hash => "hash",
            Self::Signature => "signature",
            Self::Pieces { .. } => "pieces",
            Self::Other(tag) => tag,
        }
    }
}

/// One entry of a file's `<verification>` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    pub kind: DescriptorKind,
    pub algorithm: Option<String>,
    pub expected: String,
}

impl Descriptor {
    pub fn hash(algorithm: &str, expected: &str) -> Self {
        Self {
            kind: DescriptorKind::Hash,
            algorithm: Some(algorithm.to_string()),
            expected: expected.to_string(),
        }
    }

    pub fn signature(algorithm: &str, signature: &str) -> Self {
        Self {
            kind: DescriptorKind::Signature,
            algorithm: Some(algorithm.to_string()),
            expected: signature.to_string(),
        }
    }

    pub fn pieces(algorithm: &str, length: u64, hashes: &[&str]) -> Self {
        Self {
            kind: DescriptorKind::Pieces {
                length,
                hashes: hashes.iter().map(|h| h.to_string()).collect(),
            },
            algorithm: Some(algorithm.to_string()),
            expected: String::new(),
        }
    }

    pub(crate) fn from_node(node: Node) -> Self {
        let tag = node.tag_name().name();
        let kind = match tag {
            "hash" => DescriptorKind::Hash,
            // signatures are multi-line armored text; keep it verbatim
            "signature" => DescriptorKind::Signature,
            "pieces" => DescriptorKind::Pieces {
                length: xml::number(node.attribute("length"), "piece length").unwrap_or(0),
                hashes: xml::children(node, "hash").map(xml::text).collect(),
            },
            other => DescriptorKind::Other(other.to_string()),
        };
        let expected = match kind {
            DescriptorKind::Signature => node.text().unwrap_or("").to_string(),
            DescriptorKind::Pieces { .. } => String::new(),
            _ => xml::text(node),
        };

        Self {
            kind,
            algorithm: xml::attribute(node, "type").filter(|t| !t.is_empty()),
            expected,
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.kind.label(),
            self.algorithm.as_deref().unwrap_or("?")
        )
    }
}

const VALID_UPGRADES: [&[&str]; 3] = [
    &["install"],
    &["uninstall", "install"],
    &["uninstall", "reboot", "install"],
];

/// Ordered install actions from an `<upgrade>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Upgrade {
    actions: Vec<String>,
}

impl Upgrade {
    pub fn parse(text: &str) -> Self {
        Self {
            actions: text
                .split(',')
                .map(|a| a.trim().to_ascii_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
        }
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn contains(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a.eq_ignore_ascii_case(action))
    }

    /// True when the actions are exactly one of the known sequences.
    pub fn is_valid(&self) -> bool {
        VALID_UPGRADES
            .iter()
            .any(|sequence| self.actions.iter().map(String::as_str).eq(sequence.iter().copied()))
    }
}

impl fmt::Display for Upgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.actions.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct File {
    pub name: Option<String>,
    pub id: Option<String>,
    pub os: Option<String>,
    pub description: Option<String>,
    /// Bytes, or [`UNKNOWN_SIZE`].
    pub size: i64,
    /// Verification descriptors in document order.
    pub verinfo: Vec<Descriptor>,
    pub mimetype: Option<String>,
    pub relations: Option<String>,
    pub release_date: Option<NaiveDateTime>,
    pub changelog: Option<String>,
    pub publisher: Option<Info>,
    pub license: Option<Info>,
    pub copyright: Option<String>,
    pub tags: Option<Tags>,
    pub multimedia: Option<Multimedia>,
    pub upgrade: Option<Upgrade>,
    pub resources: Vec<Url>,
}

impl File {
    pub(crate) fn from_node(node: Node) -> Self {
        let verinfo = xml::child(node, "verification")
            .map(|v| {
                v.children()
                    .filter(Node::is_element)
                    .map(Descriptor::from_node)
                    .collect()
            })
            .unwrap_or_default();

        let resources = xml::children(node, "resources")
            .flat_map(|r| xml::children(r, "url"))
            .filter_map(Url::from_node)
            .collect();

        let size = xml::number(xml::child_text(node, "size").as_deref(), "size")
            .unwrap_or(UNKNOWN_SIZE);

        Self {
            name: xml::attribute(node, "name"),
            id: xml::child_text(node, "identity"),
            os: xml::child_text(node, "os"),
            description: xml::child_text(node, "description"),
            size,
            verinfo,
            mimetype: xml::child_text(node, "mimetype"),
            relations: xml::child_text(node, "relations"),
            release_date: xml::date(
                xml::child_text(node, "releasedate").as_deref(),
                "releasedate",
            ),
            changelog: xml::child_text(node, "changelog"),
            publisher: xml::child(node, "publisher").map(Info::from_node),
            license: xml::child(node, "license").map(Info::from_node),
            copyright: xml::child_text(node, "copyright"),
            tags: xml::child_text(node, "tags").map(|t| Tags::parse(&t)),
            multimedia: xml::child(node, "multimedia").map(Multimedia::from_node),
            upgrade: xml::child_text(node, "upgrade").map(|u| Upgrade::parse(&u)),
            resources,
        }
    }

    pub fn known_size(&self) -> Option<u64> {
        u64::try_from(self.size).ok()
    }

    pub fn resources(&self) -> slice::Iter<'_, Url> {
        self.resources.iter()
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.verinfo
    }

    pub fn has_signature(&self) -> bool {
        self.verinfo
            .iter()
            .any(|d| d.kind == DescriptorKind::Signature)
    }
}

impl<'a> IntoIterator for &'a File {
    type Item = &'a Url;
    type IntoIter = slice::Iter<'a, Url>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources()
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.as_deref().unwrap_or("<unnamed>"))?;
        if let Some(size) = self.known_size() {
            write!(f, " ({} bytes)", size)?;
        }
        Ok(())
    }
}
