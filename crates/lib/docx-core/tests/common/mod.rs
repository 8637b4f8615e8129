#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use docx_package::{DocxPackage, XmlDocument, XmlElement, XmlNode};

pub const W_NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// A flat decimal list (`numId` 1) and a three-level outline (`numId` 2).
pub const NUMBERING: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:abstractNum w:abstractNumId="10"><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/></w:lvl></w:abstractNum>
<w:abstractNum w:abstractNumId="20">
<w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="upperRoman"/><w:lvlText w:val="%1."/></w:lvl>
<w:lvl w:ilvl="1"><w:start w:val="1"/><w:numFmt w:val="lowerLetter"/><w:lvlText w:val="%2)"/></w:lvl>
<w:lvl w:ilvl="2"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1.%2.%3"/><w:isLgl/></w:lvl>
</w:abstractNum>
<w:num w:numId="1"><w:abstractNumId w:val="10"/></w:num>
<w:num w:numId="2"><w:abstractNumId w:val="20"/></w:num>
</w:numbering>"#;

/// Builds small Word packages for tests.
#[derive(Default)]
pub struct DocxFixture {
    body: String,
    numbering: Option<String>,
    styles: Option<String>,
    header: Option<String>,
}

impl DocxFixture {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_numbering(mut self, numbering: &str) -> Self {
        self.numbering = Some(numbering.to_string());
        self
    }

    pub fn with_styles(mut self, styles: impl Into<String>) -> Self {
        self.styles = Some(styles.into());
        self
    }

    pub fn with_header(mut self, header_body: impl Into<String>) -> Self {
        self.header = Some(header_body.into());
        self
    }

    pub fn package(&self) -> DocxPackage {
        let mut package = DocxPackage::new();
        package.set_part("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec());
        package.set_part("_rels/.rels", ROOT_RELS.as_bytes().to_vec());

        let mut rels = Vec::new();
        if let Some(numbering) = &self.numbering {
            rels.push(("numbering", "numbering.xml"));
            package.set_part("word/numbering.xml", numbering.as_bytes().to_vec());
        }
        if let Some(styles) = &self.styles {
            rels.push(("styles", "styles.xml"));
            package.set_part("word/styles.xml", styles.as_bytes().to_vec());
        }
        if let Some(header) = &self.header {
            rels.push(("header", "header1.xml"));
            let xml = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr {W_NS}>{header}</w:hdr>"#);
            package.set_part("word/header1.xml", xml.into_bytes());
        }
        let relationships: String = rels
            .iter()
            .enumerate()
            .map(|(index, (kind, target))| {
                format!(
                    r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/{kind}" Target="{target}"/>"#,
                    index + 1
                )
            })
            .collect();
        package.set_part(
            "word/_rels/document.xml.rels",
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#)
                .into_bytes(),
        );

        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document {W_NS}><w:body>{}<w:sectPr/></w:body></w:document>"#,
            self.body
        );
        package.set_part("word/document.xml", document.into_bytes());
        package
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        self.package().save(&path).expect("save fixture package");
        path
    }
}

pub fn paragraph(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
}

pub fn numbered(num_id: &str, ilvl: u8, text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="{ilvl}"/><w:numId w:val="{num_id}"/></w:numPr></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#
    )
}

/// Visible text of each top-level body paragraph. Tabs render as `\t`.
pub fn paragraph_texts(package: &DocxPackage, part: &str) -> Vec<String> {
    let doc = XmlDocument::parse(package.part(part).expect("part present")).expect("parse part");
    let container = doc
        .root
        .wml_child("body")
        .unwrap_or(&doc.root);
    container
        .elements()
        .filter(|el| el.is_wml("p"))
        .map(|paragraph| {
            let mut text = String::new();
            collect_text(paragraph, &mut text);
            text
        })
        .collect()
}

fn collect_text(element: &XmlElement, text: &mut String) {
    for child in &element.children {
        match child {
            XmlNode::Element(child) if child.is_wml("tab") => text.push('\t'),
            XmlNode::Element(child) => collect_text(child, text),
            XmlNode::Text(value) if element.is_wml("t") => text.push_str(value),
            _ => {}
        }
    }
}

pub fn contains_wml(package: &DocxPackage, part: &str, local: &str) -> bool {
    let doc = XmlDocument::parse(package.part(part).expect("part present")).expect("parse part");
    doc.root.contains(&|el: &XmlElement| el.is_wml(local))
}

pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
