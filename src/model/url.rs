use roxmltree::Node;
use serde::Serialize;
use std::fmt;
use std::path::Path;

use super::xml;

/// One mirror or peer-to-peer resource for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Url {
    pub uri: String,
    /// Resource type: `torrent` for `.torrent` links, else the explicit
    /// `type` attribute, else the URI scheme.
    pub kind: Option<String>,
    pub preference: Option<u32>,
    pub max_connections: Option<u32>,
    pub location: Option<String>,
}

fn has_torrent_extension(uri: &str) -> bool {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("torrent"))
}

fn scheme(uri: &str) -> Option<String> {
    ::url::Url::parse(uri).ok().map(|u| u.scheme().to_string())
}

impl Url {
    pub fn new(uri: impl Into<String>, explicit_type: Option<&str>) -> Self {
        let uri = uri.into();
        let kind = Self::resolve_kind(&uri, explicit_type);
        Self {
            uri,
            kind,
            preference: None,
            max_connections: None,
            location: None,
        }
    }

    fn resolve_kind(uri: &str, explicit_type: Option<&str>) -> Option<String> {
        if has_torrent_extension(uri) {
            return Some("torrent".to_string());
        }
        explicit_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| scheme(uri))
    }

    /// Build from a `<url>` element. Elements without a URI are skipped.
    pub(crate) fn from_node(node: Node) -> Option<Self> {
        let uri = xml::text(node);
        if uri.is_empty() {
            tracing::debug!("skipping <{}> element without a URI", node.tag_name().name());
            return None;
        }

        let mut url = Self::new(uri, node.attribute("type"));
        url.preference = xml::number(node.attribute("preference"), "preference");
        url.max_connections = xml::number(node.attribute("maxconnections"), "maxconnections");
        url.location = xml::attribute(node, "location").filter(|l| !l.is_empty());
        Some(url)
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn is_torrent(&self) -> bool {
        self.kind() == Some("torrent")
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)?;
        if let Some(kind) = &self.kind {
            write!(f, " [{}]", kind)?;
        }
        if let Some(location) = &self.location {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}
