//! Typed entity graph built from a validated Metalink document.

pub mod file;
pub mod info;
pub mod multimedia;
pub mod url;
pub mod version;
mod xml;

pub use file::{Descriptor, DescriptorKind, File, UNKNOWN_SIZE, Upgrade};
pub use info::{Info, Tags};
pub use multimedia::{MediaValue, Multimedia};
pub use self::url::Url;
pub use version::Version;
pub use xml::DATE_FORMAT;

use chrono::NaiveDateTime;
use roxmltree::{Document, Node, ParsingOptions};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::slice;
use tracing::{debug, info};

use crate::error::{InvalidDocument, MetalinkError};
use crate::schema::{self, Schema};

/// Value of a top-level descriptive element, typed by its shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoValue {
    Info(Info),
    Version(Version),
    Tags(Tags),
    Text(String),
}

impl InfoValue {
    fn from_node(node: Node) -> Self {
        if xml::has_element_children(node) {
            return Self::Info(Info::from_node(node));
        }
        match node.tag_name().name() {
            "version" => Self::Version(Version::parse(&xml::text(node))),
            "tags" => Self::Tags(Tags::parse(&xml::text(node))),
            _ => Self::Text(xml::text(node)),
        }
    }
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info(info) => info.fmt(f),
            Self::Version(version) => version.fmt(f),
            Self::Tags(tags) => tags.fmt(f),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Root of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metalink {
    pub meta_version: Option<Version>,
    pub release_date: Option<NaiveDateTime>,
    pub refresh_date: Option<NaiveDateTime>,
    pub is_dynamic: bool,
    pub origin: Option<String>,
    pub generator: Option<String>,
    pub info: BTreeMap<String, InfoValue>,
    pub files: Vec<File>,
}

impl Metalink {
    /// Parse and validate a document. Fails only on malformed XML or a
    /// schema violation; no partial model is ever returned.
    pub fn parse(bytes: &[u8], schema: &Schema) -> Result<Self, InvalidDocument> {
        let text = xml::decode(bytes)?;
        let options = ParsingOptions {
            allow_dtd: false,
            ..ParsingOptions::default()
        };
        let document = Document::parse_with_options(&text, options)
            .map_err(|e| InvalidDocument::Malformed(e.to_string()))?;

        schema::validate(&document, schema)?;

        let metalink = Self::from_root(document.root_element());
        info!(
            "parsed metalink document with {} file(s)",
            metalink.files.len()
        );
        Ok(metalink)
    }

    pub fn from_path(path: &Path, schema: &Schema) -> Result<Self, MetalinkError> {
        let bytes = fs::read(path).map_err(|source| MetalinkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("read {} bytes from {}", bytes.len(), path.display());
        Ok(Self::parse(&bytes, schema)?)
    }

    fn from_root(root: Node) -> Self {
        let mut info = BTreeMap::new();
        let mut files = Vec::new();

        for element in root.children().filter(Node::is_element) {
            let name = element.tag_name().name();
            if name == "files" {
                files.extend(xml::children(element, "file").map(File::from_node));
                continue;
            }
            info.insert(name.to_string(), InfoValue::from_node(element));
        }

        let attr = |name: &str| root.attribute(name);
        Self {
            meta_version: attr("version").map(Version::parse),
            release_date: xml::date(attr("pubdate"), "pubdate"),
            refresh_date: xml::date(attr("refreshdate"), "refreshdate"),
            is_dynamic: attr("type") == Some("dynamic"),
            origin: attr("origin").map(str::to_string),
            generator: attr("generator").map(str::to_string),
            info,
            files,
        }
    }

    pub fn files(&self) -> slice::Iter<'_, File> {
        self.files.iter()
    }

    /// First file with the given name.
    pub fn file(&self, name: &str) -> Option<&File> {
        self.files.iter().find(|f| f.name.as_deref() == Some(name))
    }

    pub fn info(&self, key: &str) -> Option<&InfoValue> {
        self.info.get(key)
    }
}

impl<'a> IntoIterator for &'a Metalink {
    type Item = &'a File;
    type IntoIter = slice::Iter<'a, File>;

    fn into_iter(self) -> Self::IntoIter {
        self.files()
    }
}
