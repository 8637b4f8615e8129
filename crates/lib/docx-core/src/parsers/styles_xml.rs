use std::collections::{HashMap, HashSet};

use roxmltree::Document;
use serde::{Deserialize, Serialize};

use super::{PartParseError, ensure_root, wml_attr, wml_child, wml_children, wml_val};

/// Numbering carried by a style's `w:pPr/w:numPr`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleNumbering {
    pub num_id: Option<String>,
    pub ilvl: Option<u8>,
}

impl StyleNumbering {
    pub const fn is_empty(&self) -> bool {
        self.num_id.is_none() && self.ilvl.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDefinition {
    pub style_id: String,
    /// `paragraph`, `character`, `table` or `numbering`.
    pub kind: String,
    pub based_on: Option<String>,
    pub numbering: StyleNumbering,
    pub is_default: bool,
}

/// Style definitions needed to resolve style-bound numbering.
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    styles: HashMap<String, StyleDefinition>,
    default_paragraph: Option<String>,
}

impl StyleCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, style: StyleDefinition) {
        if style.is_default && style.kind == "paragraph" && self.default_paragraph.is_none() {
            self.default_paragraph = Some(style.style_id.clone());
        }
        self.styles.insert(style.style_id.clone(), style);
    }

    pub fn get(&self, style_id: &str) -> Option<&StyleDefinition> {
        self.styles.get(style_id)
    }

    pub fn default_paragraph_style(&self) -> Option<&str> {
        self.default_paragraph.as_deref()
    }

    /// Resolves numbering through the `w:basedOn` chain.
    ///
    /// `numId` and `ilvl` are taken from the nearest style that sets each.
    pub fn resolve_numbering(&self, style_id: &str) -> StyleNumbering {
        let mut resolved = StyleNumbering::default();
        let mut visited = HashSet::new();
        let mut current = Some(style_id);
        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            let Some(style) = self.styles.get(id) else {
                break;
            };
            if resolved.num_id.is_none() {
                resolved.num_id.clone_from(&style.numbering.num_id);
            }
            if resolved.ilvl.is_none() {
                resolved.ilvl = style.numbering.ilvl;
            }
            if resolved.num_id.is_some() && resolved.ilvl.is_some() {
                break;
            }
            current = style.based_on.as_deref();
        }
        resolved
    }

    /// The list id a numbering style (`w:type="numbering"`) points at.
    pub fn numbering_style_num_id(&self, style_id: &str) -> Option<&str> {
        self.styles
            .get(style_id)
            .filter(|style| style.kind == "numbering")
            .and_then(|style| style.numbering.num_id.as_deref())
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// Parser for the styles part (`word/styles.xml`).
pub struct StylesXmlParser;

impl StylesXmlParser {
    /// Parses style definitions relevant to numbering.
    ///
    /// # Errors
    /// Returns `PartParseError` if the XML is invalid or the root is not `w:styles`.
    pub fn parse(xml: &str) -> Result<StyleCatalog, PartParseError> {
        let doc = Document::parse(xml)?;
        ensure_root(&doc, "styles")?;

        let mut catalog = StyleCatalog::new();
        for node in wml_children(doc.root_element(), "style") {
            let Some(style_id) = wml_attr(node, "styleId") else {
                continue;
            };
            let numbering = wml_child(node, "pPr")
                .and_then(|ppr| wml_child(ppr, "numPr"))
                .map(|num_pr| StyleNumbering {
                    num_id: wml_val(num_pr, "numId").map(str::to_string),
                    ilvl: wml_val(num_pr, "ilvl").and_then(|value| value.parse().ok()),
                })
                .unwrap_or_default();
            catalog.insert(StyleDefinition {
                style_id: style_id.to_string(),
                kind: wml_attr(node, "type").unwrap_or("paragraph").to_string(),
                based_on: wml_val(node, "basedOn").map(str::to_string),
                numbering,
                is_default: matches!(wml_attr(node, "default"), Some("1" | "true" | "on")),
            });
        }
        Ok(catalog)
    }
}
