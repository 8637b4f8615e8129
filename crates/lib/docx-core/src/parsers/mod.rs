//! Readers for the Word parts that drive numbering.
//!
//! Both parsers are read-only passes over `roxmltree` documents; rewriting
//! happens separately on the mutable tree from `docx-package`.

use std::{error::Error, fmt};

use docx_package::schema::WML_NS;
use roxmltree::Node;

pub mod numbering_xml;
pub mod styles_xml;

pub use numbering_xml::NumberingXmlParser;
pub use styles_xml::{StyleCatalog, StyleDefinition, StyleNumbering, StylesXmlParser};

/// Error type for numbering and styles part parse failures.
#[derive(Debug)]
pub struct PartParseError {
    message: String,
}

impl PartParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for PartParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part parse error: {}", self.message)
    }
}

impl Error for PartParseError {}

impl From<roxmltree::Error> for PartParseError {
    fn from(err: roxmltree::Error) -> Self {
        Self::new(err.to_string())
    }
}

fn wml_child<'a, 'input>(node: Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name((WML_NS, local)))
}

fn wml_children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |child| child.has_tag_name((WML_NS, local)))
}

fn wml_attr<'a>(node: Node<'a, '_>, local: &str) -> Option<&'a str> {
    node.attribute((WML_NS, local))
}

/// `<w:child w:val="..."/>`
fn wml_val<'a>(node: Node<'a, '_>, local: &str) -> Option<&'a str> {
    wml_child(node, local).and_then(|child| wml_attr(child, "val"))
}

/// Reads an `ST_OnOff` toggle element; present without a value means on.
fn wml_flag(node: Node<'_, '_>, local: &str) -> bool {
    wml_child(node, local).is_some_and(|child| {
        !matches!(wml_attr(child, "val"), Some("0" | "false" | "off"))
    })
}

fn ensure_root(doc: &roxmltree::Document<'_>, local: &str) -> Result<(), PartParseError> {
    if doc.root_element().has_tag_name((WML_NS, local)) {
        Ok(())
    } else {
        Err(PartParseError::new(format!(
            "expected a w:{local} root element, found {}",
            doc.root_element().tag_name().name()
        )))
    }
}
