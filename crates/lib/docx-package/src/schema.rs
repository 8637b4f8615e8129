pub const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const MC_NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";
pub const PACKAGE_RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

pub const PART_CONTENT_TYPES: &str = "[Content_Types].xml";
pub const PART_ROOT_RELS: &str = "_rels/.rels";
pub const PART_DOCUMENT: &str = "word/document.xml";
pub const PART_NUMBERING: &str = "word/numbering.xml";
pub const PART_STYLES: &str = "word/styles.xml";

pub const REL_OFFICE_DOCUMENT: &str = "officeDocument";
pub const REL_NUMBERING: &str = "numbering";
pub const REL_STYLES: &str = "styles";
pub const REL_HEADER: &str = "header";
pub const REL_FOOTER: &str = "footer";
pub const REL_FOOTNOTES: &str = "footnotes";
pub const REL_ENDNOTES: &str = "endnotes";
pub const REL_COMMENTS: &str = "comments";

/// Relationship types whose targets carry body-like content (paragraphs, runs, revisions).
pub const STORY_RELATIONSHIPS: &[&str] = &[
    REL_HEADER,
    REL_FOOTER,
    REL_FOOTNOTES,
    REL_ENDNOTES,
    REL_COMMENTS,
];

/// Returns the relationships part that describes `part`, e.g. `word/_rels/document.xml.rels`.
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Matches a relationship `Type` URI against a short kind such as `styles`.
///
/// Both the transitional (`.../relationships/styles`) and strict
/// (`.../officeDocument/relationships/styles`) forms end with the kind.
pub fn relationship_is(rel_type: &str, kind: &str) -> bool {
    rel_type
        .rsplit_once('/')
        .is_some_and(|(_, tail)| tail == kind)
}
