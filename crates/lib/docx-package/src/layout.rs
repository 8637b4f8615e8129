use roxmltree::Document;
use tracing::debug;

use crate::package::{DocxPackage, PackageError};
use crate::schema::{
    PACKAGE_RELS_NS,
    PART_DOCUMENT,
    PART_NUMBERING,
    PART_ROOT_RELS,
    PART_STYLES,
    REL_NUMBERING,
    REL_OFFICE_DOCUMENT,
    REL_STYLES,
    STORY_RELATIONSHIPS,
    rels_part_for,
    relationship_is,
};

/// Locations of the parts the numbering and revision passes touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    pub document: String,
    pub numbering: Option<String>,
    pub styles: Option<String>,
    /// Headers, footers, footnotes, endnotes and comments.
    pub stories: Vec<String>,
}

#[derive(Debug)]
struct Relationship {
    rel_type: String,
    target: String,
    external: bool,
}

impl PackageLayout {
    /// Resolves part locations from the package relationships.
    ///
    /// Relationship parts that are missing or unreadable fall back to the
    /// conventional `word/` part names.
    ///
    /// Returns `Ok(None)` when the package has no main document part.
    ///
    /// # Errors
    /// Returns `PackageError::InvalidUtf8` if a relationship part is not UTF-8.
    pub fn discover(package: &DocxPackage) -> Result<Option<Self>, PackageError> {
        let root_rels = read_relationships(package, PART_ROOT_RELS)?;
        let document = root_rels
            .iter()
            .find(|rel| !rel.external && relationship_is(&rel.rel_type, REL_OFFICE_DOCUMENT))
            .map(|rel| resolve_target("", &rel.target))
            .filter(|part| package.has_part(part))
            .or_else(|| package.has_part(PART_DOCUMENT).then(|| PART_DOCUMENT.to_string()));
        let Some(document) = document else {
            return Ok(None);
        };

        let rels = read_relationships(package, &rels_part_for(&document))?;
        let base = document.rsplit_once('/').map_or("", |(dir, _)| dir);
        let related = |kind: &str| -> Vec<String> {
            rels.iter()
                .filter(|rel| !rel.external && relationship_is(&rel.rel_type, kind))
                .map(|rel| resolve_target(base, &rel.target))
                .filter(|part| package.has_part(part))
                .collect()
        };

        let numbering = related(REL_NUMBERING)
            .into_iter()
            .next()
            .or_else(|| package.has_part(PART_NUMBERING).then(|| PART_NUMBERING.to_string()));
        let styles = related(REL_STYLES)
            .into_iter()
            .next()
            .or_else(|| package.has_part(PART_STYLES).then(|| PART_STYLES.to_string()));
        let mut stories = Vec::new();
        for &kind in STORY_RELATIONSHIPS {
            for part in related(kind) {
                if !stories.contains(&part) {
                    stories.push(part);
                }
            }
        }

        debug!(
            document = %document,
            numbering = ?numbering,
            styles = ?styles,
            stories = stories.len(),
            "discovered package layout"
        );
        Ok(Some(Self {
            document,
            numbering,
            styles,
            stories,
        }))
    }
}

fn read_relationships(package: &DocxPackage, part: &str) -> Result<Vec<Relationship>, PackageError> {
    let Some(xml) = package.part_str(part)? else {
        return Ok(Vec::new());
    };
    let Ok(doc) = Document::parse(xml) else {
        debug!(part, "ignoring unparsable relationships part");
        return Ok(Vec::new());
    };
    Ok(doc
        .descendants()
        .filter(|node| node.tag_name().name() == "Relationship")
        .filter(|node| {
            node.tag_name()
                .namespace()
                .is_none_or(|namespace| namespace == PACKAGE_RELS_NS)
        })
        .filter_map(|node| {
            Some(Relationship {
                rel_type: node.attribute("Type")?.to_string(),
                target: node.attribute("Target")?.to_string(),
                external: node
                    .attribute("TargetMode")
                    .is_some_and(|mode| mode.eq_ignore_ascii_case("External")),
            })
        })
        .collect())
}

/// Resolves a relationship target against the directory of its source part.
fn resolve_target(base: &str, target: &str) -> String {
    let joined = target.strip_prefix('/').map_or_else(
        || {
            if base.is_empty() {
                target.to_string()
            } else {
                format!("{base}/{target}")
            }
        },
        str::to_string,
    );

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
