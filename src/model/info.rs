use roxmltree::Node;
use serde::Serialize;
use std::fmt;
use std::slice;

use super::url::Url;
use super::xml;

/// A named, linked reference such as a publisher or a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Info {
    pub id: String,
    pub name: Option<String>,
    pub url: Option<Url>,
}

impl Info {
    pub(crate) fn from_node(node: Node) -> Self {
        Self {
            id: node.tag_name().name().to_string(),
            name: xml::child_text(node, "name"),
            url: xml::child(node, "url").and_then(Url::from_node),
        }
    }
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} <{}>",
            self.id,
            self.name.as_deref().unwrap_or(""),
            self.url.as_ref().map(|u| u.uri.as_str()).unwrap_or("")
        )
    }
}

/// Comma-separated labels, trimmed, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn parse(text: &str) -> Self {
        Self(
            text.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a String;
    type IntoIter = slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}
