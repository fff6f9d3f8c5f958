//! Structural validation of a parsed document before any entity is built.
//!
//! A [`Schema`] is a declarative description of which elements may appear
//! where, which attributes they carry and which values must be integers.
//! The built-in schema follows Metalink 3.0; alternative schemas can be
//! loaded from TOML.

use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{InvalidDocument, SchemaError};

pub const METALINK3_NAMESPACE: &str = "http://www.metalinker.org/";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Content {
    #[default]
    Text,
    Integer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRule {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: Content,
    /// Closed set of accepted values, if any.
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRule {
    /// Permitted child element names; `None` accepts any child.
    #[serde(default)]
    pub children: Option<Vec<String>>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeRule>,
    /// Accept attributes that have no rule.
    #[serde(default)]
    pub open_attributes: bool,
    /// Leave descendants unchecked, even under a strict schema.
    #[serde(default)]
    pub opaque: bool,
    #[serde(default)]
    pub content: Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub root: String,
    #[serde(default)]
    pub namespace: Option<String>,
    /// Reject elements that have no rule.
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub elements: BTreeMap<String, ElementRule>,
}

fn attr(required: bool, content: Content) -> AttributeRule {
    AttributeRule {
        required,
        content,
        values: None,
    }
}

fn element(children: &[&str], attributes: &[(&str, AttributeRule)]) -> ElementRule {
    ElementRule {
        children: Some(children.iter().map(|c| c.to_string()).collect()),
        attributes: attributes
            .iter()
            .map(|(name, rule)| (name.to_string(), rule.clone()))
            .collect(),
        open_attributes: false,
        opaque: false,
        content: Content::Text,
    }
}

fn text_element() -> ElementRule {
    element(&[], &[])
}

impl Schema {
    /// Metalink 3.0 structure, namespace-agnostic and lenient about
    /// elements it has no rule for.
    pub fn builtin() -> Self {
        let info_children = [
            "identity",
            "version",
            "description",
            "tags",
            "publisher",
            "license",
            "copyright",
            "changelog",
            "releasedate",
            "logo",
            "os",
            "language",
            "mimetype",
        ];
        let mut root_children: Vec<&str> = info_children.to_vec();
        root_children.push("files");

        let mut file_children: Vec<&str> = info_children.to_vec();
        file_children.extend([
            "size",
            "verification",
            "relations",
            "multimedia",
            "upgrade",
            "resources",
        ]);

        let mut elements = BTreeMap::new();
        elements.insert(
            "metalink".to_string(),
            element(
                &root_children,
                &[
                    ("version", attr(false, Content::Text)),
                    ("pubdate", attr(false, Content::Text)),
                    ("refreshdate", attr(false, Content::Text)),
                    (
                        "type",
                        AttributeRule {
                            required: false,
                            content: Content::Text,
                            values: Some(vec!["static".to_string(), "dynamic".to_string()]),
                        },
                    ),
                    ("origin", attr(false, Content::Text)),
                    ("generator", attr(false, Content::Text)),
                ],
            ),
        );
        elements.insert("files".to_string(), element(&["file"], &[]));
        elements.insert(
            "file".to_string(),
            element(&file_children, &[("name", attr(true, Content::Text))]),
        );
        elements.insert(
            "size".to_string(),
            ElementRule {
                content: Content::Integer,
                ..text_element()
            },
        );
        elements.insert(
            "verification".to_string(),
            element(&["hash", "signature", "pieces"], &[]),
        );
        elements.insert(
            "hash".to_string(),
            element(
                &[],
                &[
                    ("type", attr(false, Content::Text)),
                    ("piece", attr(false, Content::Integer)),
                ],
            ),
        );
        elements.insert(
            "signature".to_string(),
            element(
                &[],
                &[
                    ("type", attr(true, Content::Text)),
                    ("file", attr(false, Content::Text)),
                ],
            ),
        );
        elements.insert(
            "pieces".to_string(),
            element(
                &["hash"],
                &[
                    ("type", attr(true, Content::Text)),
                    ("length", attr(true, Content::Integer)),
                ],
            ),
        );
        elements.insert(
            "resources".to_string(),
            element(&["url"], &[("maxconnections", attr(false, Content::Integer))]),
        );
        elements.insert(
            "url".to_string(),
            element(
                &[],
                &[
                    ("type", attr(false, Content::Text)),
                    ("location", attr(false, Content::Text)),
                    ("preference", attr(false, Content::Integer)),
                    ("maxconnections", attr(false, Content::Integer)),
                ],
            ),
        );
        for info in ["publisher", "license"] {
            elements.insert(info.to_string(), element(&["name", "url"], &[]));
        }
        for leaf in [
            "identity",
            "version",
            "description",
            "tags",
            "copyright",
            "changelog",
            "releasedate",
            "logo",
            "os",
            "language",
            "mimetype",
            "relations",
            "name",
            "upgrade",
        ] {
            elements.insert(leaf.to_string(), text_element());
        }
        elements.insert(
            "multimedia".to_string(),
            ElementRule {
                children: None,
                open_attributes: true,
                opaque: true,
                ..ElementRule::default()
            },
        );

        Self {
            root: "metalink".to_string(),
            namespace: None,
            strict: false,
            elements,
        }
    }

    pub fn from_toml(content: &str, path: &Path) -> Result<Self, SchemaError> {
        toml::from_str(content).map_err(|source| SchemaError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    pub fn rule(&self, name: &str) -> Option<&ElementRule> {
        self.elements.get(name)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Check a parsed tree against `schema`.
pub fn validate(document: &Document, schema: &Schema) -> Result<(), InvalidDocument> {
    let root = document.root_element();
    let name = root.tag_name().name();
    if name != schema.root {
        return Err(InvalidDocument::violation(
            "/",
            format!("expected root element <{}>, found <{}>", schema.root, name),
        ));
    }

    if let Some(namespace) = &schema.namespace {
        let actual = root.tag_name().namespace().unwrap_or("");
        if actual != namespace {
            return Err(InvalidDocument::violation(
                &format!("/{}", name),
                format!("expected namespace {:?}, found {:?}", namespace, actual),
            ));
        }
    }

    validate_element(root, schema, "")?;
    debug!("document satisfies schema rooted at <{}>", schema.root);
    Ok(())
}

fn validate_element(node: Node, schema: &Schema, parent: &str) -> Result<(), InvalidDocument> {
    let name = node.tag_name().name();
    let path = format!("{}/{}", parent, name);

    match schema.rule(name) {
        Some(rule) => {
            check_rule(node, rule, &path)?;
            if rule.opaque {
                return Ok(());
            }
        }
        None if schema.strict => {
            return Err(InvalidDocument::violation(&path, "undeclared element"));
        }
        None => {}
    }

    for child in node.children().filter(Node::is_element) {
        validate_element(child, schema, &path)?;
    }
    Ok(())
}

fn check_rule(node: Node, rule: &ElementRule, path: &str) -> Result<(), InvalidDocument> {
    if let Some(allowed) = &rule.children {
        for child in node.children().filter(Node::is_element) {
            let child_name = child.tag_name().name();
            if !allowed.iter().any(|a| a == child_name) {
                return Err(InvalidDocument::violation(
                    path,
                    format!("unexpected child element <{}>", child_name),
                ));
            }
        }
    }

    for (attr_name, attr_rule) in &rule.attributes {
        if attr_rule.required && node.attribute(attr_name.as_str()).is_none() {
            return Err(InvalidDocument::violation(
                path,
                format!("missing required attribute '{}'", attr_name),
            ));
        }
    }

    // Namespaced attributes (xml:lang, xsi:*) are outside the schema's concern.
    for attribute in node.attributes().filter(|a| a.namespace().is_none()) {
        match rule.attributes.get(attribute.name()) {
            Some(attr_rule) => check_attribute(attribute.name(), attribute.value(), attr_rule, path)?,
            None if rule.open_attributes => {}
            None => {
                return Err(InvalidDocument::violation(
                    path,
                    format!("unexpected attribute '{}'", attribute.name()),
                ));
            }
        }
    }

    if rule.content == Content::Integer {
        let text = node.text().unwrap_or("").trim();
        if text.parse::<i64>().is_err() {
            return Err(InvalidDocument::violation(
                path,
                format!("expected integer content, found {:?}", text),
            ));
        }
    }

    Ok(())
}

fn check_attribute(
    name: &str,
    value: &str,
    rule: &AttributeRule,
    path: &str,
) -> Result<(), InvalidDocument> {
    if rule.content == Content::Integer && value.trim().parse::<i64>().is_err() {
        return Err(InvalidDocument::violation(
            path,
            format!("attribute '{}' must be an integer, found {:?}", name, value),
        ));
    }
    if let Some(values) = &rule.values {
        if !values.iter().any(|v| v == value) {
            return Err(InvalidDocument::violation(
                path,
                format!("attribute '{}' has unexpected value {:?}", name, value),
            ));
        }
    }
    Ok(())
}
