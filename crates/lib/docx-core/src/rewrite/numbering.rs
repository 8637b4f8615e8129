use std::{error::Error, fmt, str::FromStr};

use docx_package::schema::{MC_NS, XML_NS};
use docx_package::{XmlDocument, XmlElement, XmlNode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::numbering::{LevelSuffix, ListCounters, NumberingDefinitions};
use crate::parsers::{StyleCatalog, StyleNumbering};

/// What follows an inserted label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeparatorPolicy {
    /// A single space.
    #[default]
    Space,
    /// A `w:tab` element.
    Tab,
    /// Whatever the level's `w:suff` asks for.
    Level,
}

impl fmt::Display for SeparatorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Space => "space",
            Self::Tab => "tab",
            Self::Level => "level",
        })
    }
}

impl FromStr for SeparatorPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "space" => Ok(Self::Space),
            "tab" => Ok(Self::Tab),
            "level" => Ok(Self::Level),
            other => Err(format!("unknown separator '{other}' (expected space, tab or level)")),
        }
    }
}

/// What to do with a paragraph whose list level has no definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingDefinitionPolicy {
    /// Strip the reference, leave the paragraph unlabelled and log a warning.
    #[default]
    Skip,
    /// Fail the whole document.
    Fail,
}

impl fmt::Display for MissingDefinitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Skip => "skip",
            Self::Fail => "fail",
        })
    }
}

impl FromStr for MissingDefinitionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown missing-definition policy '{other}' (expected skip or fail)")),
        }
    }
}

/// A paragraph referenced a list level that has no definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDefinition {
    pub num_id: String,
    pub ilvl: u8,
}

impl fmt::Display for MissingDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no numbering definition for list {} level {}",
            self.num_id, self.ilvl
        )
    }
}

impl Error for MissingDefinition {}

/// Counts from one or more numbering rewrites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingRewriteReport {
    pub paragraphs: usize,
    pub labelled: usize,
    pub stripped: usize,
    pub skipped: usize,
}

/// Replaces list numbering with literal label runs.
///
/// Every `w:p` is visited in document order, including paragraphs inside
/// tables and text boxes. Paragraphs under `mc:Fallback` duplicate their
/// `mc:Choice` content, so they are stripped but not counted.
pub struct NumberingRewriter<'a> {
    definitions: &'a NumberingDefinitions,
    styles: &'a StyleCatalog,
    separator: SeparatorPolicy,
    missing: MissingDefinitionPolicy,
    counters: ListCounters,
    prefix: String,
    report: NumberingRewriteReport,
}

impl<'a> NumberingRewriter<'a> {
    pub fn new(definitions: &'a NumberingDefinitions, styles: &'a StyleCatalog) -> Self {
        Self {
            definitions,
            styles,
            separator: SeparatorPolicy::default(),
            missing: MissingDefinitionPolicy::default(),
            counters: ListCounters::new(),
            prefix: "w".to_string(),
            report: NumberingRewriteReport::default(),
        }
    }

    #[must_use]
    pub const fn with_separator(mut self, separator: SeparatorPolicy) -> Self {
        self.separator = separator;
        self
    }

    #[must_use]
    pub const fn with_missing_definitions(mut self, missing: MissingDefinitionPolicy) -> Self {
        self.missing = missing;
        self
    }

    /// Rewrites one story part. Counters start fresh for every part.
    ///
    /// # Errors
    /// Returns `MissingDefinition` under `MissingDefinitionPolicy::Fail` when a
    /// paragraph references an undefined list level.
    pub fn rewrite(&mut self, document: &mut XmlDocument) -> Result<(), MissingDefinition> {
        document.wml_prefix().clone_into(&mut self.prefix);
        self.counters = ListCounters::new();
        self.walk(&mut document.root, true)
    }

    pub const fn report(&self) -> NumberingRewriteReport {
        self.report
    }

    fn walk(&mut self, element: &mut XmlElement, counting: bool) -> Result<(), MissingDefinition> {
        let counting = counting && !element.is(MC_NS, "Fallback");
        if element.is_wml("p") {
            self.paragraph(element, counting)?;
        }
        for child in element.elements_mut() {
            self.walk(child, counting)?;
        }
        Ok(())
    }

    fn paragraph(&mut self, paragraph: &mut XmlElement, counting: bool) -> Result<(), MissingDefinition> {
        self.report.paragraphs += 1;

        let (direct, style_id) = paragraph.wml_child("pPr").map_or_else(
            || (StyleNumbering::default(), None),
            |ppr| (direct_numbering(ppr), ppr.wml_child_val("pStyle").map(str::to_string)),
        );
        let style_id = style_id.or_else(|| self.styles.default_paragraph_style().map(str::to_string));
        if let Some(ppr) = paragraph.wml_child_mut("pPr") {
            self.report.stripped += ppr.remove_descendants(&|el: &XmlElement| el.is_wml("numPr"));
        }
        if !counting || paragraph.wml_attribute("rsidDel").is_some() {
            return Ok(());
        }

        let Some((num_id, ilvl)) = self.effective_numbering(direct, style_id.as_deref()) else {
            return Ok(());
        };
        let definitions = self.definitions;
        let Some(levels) = definitions
            .levels(&num_id)
            .filter(|levels| levels.contains_key(&ilvl))
        else {
            self.report.skipped += 1;
            warn!(num_id = %num_id, ilvl, "no numbering definition for referenced list level");
            return match self.missing {
                MissingDefinitionPolicy::Skip => Ok(()),
                MissingDefinitionPolicy::Fail => Err(MissingDefinition { num_id, ilvl }),
            };
        };

        self.counters.advance(&num_id, ilvl, levels);
        let label = self.counters.render(&num_id, ilvl, levels);
        if label.is_empty() {
            return Ok(());
        }
        let suffix = levels.get(&ilvl).map_or(LevelSuffix::Tab, |level| level.suffix);
        let run = self.label_run(&label, suffix);
        let index = paragraph.wml_child_index("pPr").map_or(0, |index| index + 1);
        paragraph.children.insert(index, XmlNode::Element(run));
        self.report.labelled += 1;
        Ok(())
    }

    /// Direct `numPr` fields win over the paragraph style's, field by field.
    fn effective_numbering(&self, direct: StyleNumbering, style_id: Option<&str>) -> Option<(String, u8)> {
        let inherited = style_id
            .map(|id| self.styles.resolve_numbering(id))
            .unwrap_or_default();
        let num_id = direct.num_id.or(inherited.num_id)?;
        if num_id == "0" {
            return None;
        }
        let ilvl = direct
            .ilvl
            .or(inherited.ilvl)
            .or_else(|| style_id.and_then(|id| self.definitions.level_for_style(&num_id, id)))
            .unwrap_or(0);
        Some((num_id, ilvl))
    }

    fn label_run(&self, label: &str, suffix: LevelSuffix) -> XmlElement {
        let (text, tab) = match (self.separator, suffix) {
            (SeparatorPolicy::Space, _) | (SeparatorPolicy::Level, LevelSuffix::Space) => {
                (format!("{label} "), false)
            }
            (SeparatorPolicy::Tab, _) | (SeparatorPolicy::Level, LevelSuffix::Tab) => {
                (label.to_string(), true)
            }
            (SeparatorPolicy::Level, LevelSuffix::Nothing) => (label.to_string(), false),
        };

        let mut text_element = XmlElement::wml(&self.prefix, "t");
        if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
            text_element = text_element.with_attribute("xml:space", Some(XML_NS), "preserve");
        }
        let mut run = XmlElement::wml(&self.prefix, "r").with_child(text_element.with_text(&text));
        if tab {
            run = run.with_child(XmlElement::wml(&self.prefix, "tab"));
        }
        run
    }
}

fn direct_numbering(ppr: &XmlElement) -> StyleNumbering {
    ppr.wml_child("numPr")
        .map(|num_pr| StyleNumbering {
            num_id: num_pr.wml_child_val("numId").map(str::to_string),
            ilvl: num_pr.wml_child_val("ilvl").and_then(|value| value.parse().ok()),
        })
        .unwrap_or_default()
}

/// Removes every `w:numPr` from the styles part. Returns how many were removed.
pub fn strip_style_numbering(styles: &mut XmlDocument) -> usize {
    styles
        .root
        .remove_descendants(&|el: &XmlElement| el.is_wml("numPr"))
}
