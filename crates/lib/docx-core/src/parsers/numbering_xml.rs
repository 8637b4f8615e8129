use std::collections::HashMap;

use roxmltree::{Document, Node};
use tracing::debug;

use super::{PartParseError, StyleCatalog, ensure_root, wml_attr, wml_child, wml_children, wml_flag, wml_val};
use crate::numbering::{LevelSuffix, ListLevels, NumberFormat, NumberingDefinitions, NumberingLevel};

/// How many `w:numStyleLink` hops are followed before giving up.
const MAX_STYLE_LINK_DEPTH: usize = 4;

#[derive(Debug, Default)]
struct AbstractDefinition {
    levels: ListLevels,
    num_style_link: Option<String>,
}

#[derive(Debug)]
struct LevelOverride {
    ilvl: u8,
    start: Option<u32>,
    level: Option<NumberingLevel>,
}

#[derive(Debug)]
struct NumInstance {
    num_id: String,
    abstract_id: String,
    overrides: Vec<LevelOverride>,
}

/// Parser for the numbering part (`word/numbering.xml`).
pub struct NumberingXmlParser;

impl NumberingXmlParser {
    /// Parses abstract definitions and list instances into per-list level rules.
    ///
    /// Abstract definitions that only carry a `w:numStyleLink` borrow their
    /// levels from the list the linked numbering style points at. List
    /// instances whose abstract definition cannot be found are left out.
    ///
    /// # Errors
    /// Returns `PartParseError` if the XML is invalid or the root is not `w:numbering`.
    pub fn parse(xml: &str, styles: &StyleCatalog) -> Result<NumberingDefinitions, PartParseError> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();
        ensure_root(&doc, "numbering")?;

        let abstracts: HashMap<&str, AbstractDefinition> = wml_children(root, "abstractNum")
            .filter_map(|node| {
                let id = wml_attr(node, "abstractNumId")?;
                Some((id, parse_abstract(node)))
            })
            .collect();
        let instances: Vec<NumInstance> = wml_children(root, "num")
            .filter_map(parse_instance)
            .collect();
        let abstract_of: HashMap<&str, &str> = instances
            .iter()
            .map(|num| (num.num_id.as_str(), num.abstract_id.as_str()))
            .collect();

        let mut definitions = NumberingDefinitions::new();
        for num in &instances {
            let Some(levels) = resolve_levels(&num.abstract_id, &abstracts, &abstract_of, styles) else {
                debug!(
                    num_id = %num.num_id,
                    abstract_id = %num.abstract_id,
                    "list instance has no abstract definition"
                );
                continue;
            };
            let mut levels = levels.clone();
            for entry in &num.overrides {
                if let Some(level) = &entry.level {
                    levels.insert(entry.ilvl, level.clone());
                }
                if let Some(start) = entry.start
                    && let Some(level) = levels.get_mut(&entry.ilvl)
                {
                    level.start = start;
                }
            }
            definitions.insert(num.num_id.clone(), levels);
        }
        Ok(definitions)
    }
}

fn resolve_levels<'d>(
    abstract_id: &str,
    abstracts: &'d HashMap<&str, AbstractDefinition>,
    abstract_of: &HashMap<&str, &str>,
    styles: &StyleCatalog,
) -> Option<&'d ListLevels> {
    let mut current = abstracts.get(abstract_id)?;
    for _ in 0..MAX_STYLE_LINK_DEPTH {
        if !current.levels.is_empty() {
            return Some(&current.levels);
        }
        let link = current.num_style_link.as_deref()?;
        let num_id = styles.numbering_style_num_id(link)?;
        let linked: &str = abstract_of.get(num_id)?;
        current = abstracts.get(linked)?;
    }
    (!current.levels.is_empty()).then_some(&current.levels)
}

fn parse_abstract(node: Node<'_, '_>) -> AbstractDefinition {
    AbstractDefinition {
        levels: wml_children(node, "lvl")
            .filter_map(|lvl| parse_level(lvl, None))
            .map(|level| (level.ilvl, level))
            .collect(),
        num_style_link: wml_val(node, "numStyleLink").map(str::to_string),
    }
}

fn parse_instance(node: Node<'_, '_>) -> Option<NumInstance> {
    let num_id = wml_attr(node, "numId")?;
    let abstract_id = wml_val(node, "abstractNumId")?;
    let overrides = wml_children(node, "lvlOverride")
        .filter_map(|entry| {
            let ilvl = wml_attr(entry, "ilvl")?.parse().ok()?;
            Some(LevelOverride {
                ilvl,
                start: wml_val(entry, "startOverride").and_then(|value| value.parse().ok()),
                level: wml_child(entry, "lvl").and_then(|lvl| parse_level(lvl, Some(ilvl))),
            })
        })
        .collect();
    Some(NumInstance {
        num_id: num_id.to_string(),
        abstract_id: abstract_id.to_string(),
        overrides,
    })
}

/// Reads a `w:lvl`. `fallback_ilvl` covers override levels that omit `w:ilvl`.
fn parse_level(node: Node<'_, '_>, fallback_ilvl: Option<u8>) -> Option<NumberingLevel> {
    let ilvl = wml_attr(node, "ilvl")
        .and_then(|value| value.parse().ok())
        .or(fallback_ilvl)?;

    let mut level = NumberingLevel::new(ilvl);
    if let Some(format) = wml_val(node, "numFmt") {
        level.format = NumberFormat::from_ooxml(format);
    }
    if let Some(text) = wml_child(node, "lvlText") {
        level.text = wml_attr(text, "val").unwrap_or_default().to_string();
    }
    level.start = wml_val(node, "start")
        .and_then(|value| value.parse().ok())
        .unwrap_or(1);
    level.restart = wml_val(node, "lvlRestart").and_then(|value| value.parse().ok());
    level.legal = wml_flag(node, "isLgl");
    level.suffix = wml_val(node, "suff").map_or(LevelSuffix::Tab, LevelSuffix::from_ooxml);
    level.style_id = wml_val(node, "pStyle").map(str::to_string);
    Some(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::StylesXmlParser;

    const NUMBERING: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:abstractNum w:abstractNumId="0">
    <w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/><w:suff w:val="space"/></w:lvl>
    <w:lvl w:ilvl="1"><w:start w:val="1"/><w:numFmt w:val="lowerLetter"/><w:lvlText w:val="%2)"/><w:lvlRestart w:val="0"/></w:lvl>
    <w:lvl w:ilvl="2"><w:start w:val="x"/><w:numFmt w:val="lowerRoman"/><w:isLgl/><w:pStyle w:val="Heading3"/></w:lvl>
  </w:abstractNum>
  <w:abstractNum w:abstractNumId="1">
    <w:numStyleLink w:val="Outline"/>
  </w:abstractNum>
  <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
  <w:num w:numId="2">
    <w:abstractNumId w:val="0"/>
    <w:lvlOverride w:ilvl="0"><w:startOverride w:val="5"/></w:lvlOverride>
    <w:lvlOverride w:ilvl="1"><w:lvl><w:numFmt w:val="upperRoman"/><w:lvlText w:val="[%2]"/></w:lvl></w:lvlOverride>
  </w:num>
  <w:num w:numId="3"><w:abstractNumId w:val="1"/></w:num>
  <w:num w:numId="4"><w:abstractNumId w:val="9"/></w:num>
</w:numbering>"#;

    const STYLES: &str = r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="numbering" w:styleId="Outline"><w:pPr><w:numPr><w:numId w:val="1"/></w:numPr></w:pPr></w:style>
</w:styles>"#;

    fn parse() -> NumberingDefinitions {
        let styles = StylesXmlParser::parse(STYLES).expect("parse styles");
        NumberingXmlParser::parse(NUMBERING, &styles).expect("parse numbering")
    }

    #[test]
    fn reads_level_rules() {
        let definitions = parse();
        let first = definitions.level("1", 0).expect("level 0");
        assert_eq!(first.format, NumberFormat::Decimal);
        assert_eq!(first.text, "%1.");
        assert_eq!(first.suffix, LevelSuffix::Space);

        let second = definitions.level("1", 1).expect("level 1");
        assert_eq!(second.format, NumberFormat::LowerLetter);
        assert_eq!(second.restart, Some(0));
        assert_eq!(second.suffix, LevelSuffix::Tab);

        let third = definitions.level("1", 2).expect("level 2");
        assert_eq!(third.start, 1);
        assert_eq!(third.text, "%3.");
        assert!(third.legal);
        assert_eq!(definitions.level_for_style("1", "Heading3"), Some(2));
    }

    #[test]
    fn applies_level_overrides() {
        let definitions = parse();
        assert_eq!(definitions.level("2", 0).map(|level| level.start), Some(5));
        let replaced = definitions.level("2", 1).expect("overridden level");
        assert_eq!(replaced.format, NumberFormat::UpperRoman);
        assert_eq!(replaced.text, "[%2]");
        assert_eq!(definitions.level("1", 0).map(|level| level.start), Some(1));
    }

    #[test]
    fn follows_numbering_style_links() {
        let definitions = parse();
        assert_eq!(definitions.levels("3"), definitions.levels("1"));
    }

    #[test]
    fn skips_instances_without_definitions() {
        let definitions = parse();
        assert!(definitions.levels("4").is_none());
        assert_eq!(definitions.len(), 3);
    }

    #[test]
    fn rejects_wrong_root() {
        let styles = StyleCatalog::new();
        assert!(NumberingXmlParser::parse("<w:document xmlns:w=\"urn:x\"/>", &styles).is_err());
    }
}
