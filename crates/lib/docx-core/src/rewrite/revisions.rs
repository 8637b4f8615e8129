//! Accepts or rejects tracked changes in place.

use std::{fmt, str::FromStr};

use docx_package::schema::WML_NS;
use docx_package::{XmlDocument, XmlElement, XmlNode};
use serde::{Deserialize, Serialize};

/// Elements whose `ins`/`del`-style children are revision marks rather than content.
const PROPERTY_ELEMENTS: &[&str] = &[
    "pPr", "rPr", "sectPr", "tblPr", "tblPrEx", "trPr", "tcPr", "tblGrid", "numPr",
];

const RANGE_MARKERS: &[&str] = &[
    "moveFromRangeStart",
    "moveFromRangeEnd",
    "moveToRangeStart",
    "moveToRangeEnd",
    "customXmlInsRangeStart",
    "customXmlInsRangeEnd",
    "customXmlDelRangeStart",
    "customXmlDelRangeEnd",
    "customXmlMoveFromRangeStart",
    "customXmlMoveFromRangeEnd",
    "customXmlMoveToRangeStart",
    "customXmlMoveToRangeEnd",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionMode {
    Accept,
    Reject,
}

impl fmt::Display for RevisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        })
    }
}

impl FromStr for RevisionMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown revision mode '{other}'")),
        }
    }
}

/// Counts of revisions resolved, across every part passed to the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionReport {
    pub insertions: usize,
    pub deletions: usize,
    pub property_changes: usize,
}

impl RevisionReport {
    pub const fn total(&self) -> usize {
        self.insertions + self.deletions + self.property_changes
    }
}

enum Action {
    Keep,
    Unwrap,
    Drop,
}

/// Rewrites a part as if every tracked change had been accepted or rejected.
pub struct RevisionResolver {
    mode: RevisionMode,
    report: RevisionReport,
}

impl RevisionResolver {
    pub const fn new(mode: RevisionMode) -> Self {
        Self {
            mode,
            report: RevisionReport {
                insertions: 0,
                deletions: 0,
                property_changes: 0,
            },
        }
    }

    pub fn resolve(&mut self, document: &mut XmlDocument) {
        self.resolve_element(&mut document.root);
    }

    pub const fn report(&self) -> RevisionReport {
        self.report
    }

    fn resolve_element(&mut self, element: &mut XmlElement) {
        let property_context = element.namespace.as_deref() == Some(WML_NS)
            && PROPERTY_ELEMENTS.contains(&element.local_name());
        if property_context {
            self.resolve_property_change(element);
        }

        let children = std::mem::take(&mut element.children);
        let mut output = Vec::with_capacity(children.len());
        let mut merges = Vec::with_capacity(children.len());
        for node in children {
            let XmlNode::Element(mut child) = node else {
                output.push(node);
                merges.push(false);
                continue;
            };
            match self.classify(&child, property_context) {
                Action::Drop => {}
                Action::Unwrap => {
                    self.resolve_element(&mut child);
                    for grandchild in child.children {
                        output.push(grandchild);
                        merges.push(false);
                    }
                }
                Action::Keep => {
                    if self.mode == RevisionMode::Reject {
                        restore_deleted_text(&mut child);
                    }
                    let merge = child.is_wml("p") && self.paragraph_mark_removed(&child);
                    self.resolve_element(&mut child);
                    output.push(XmlNode::Element(child));
                    merges.push(merge);
                }
            }
        }
        merge_paragraphs(&mut output, &mut merges);
        element.children = output;
    }

    fn classify(&mut self, child: &XmlElement, property_context: bool) -> Action {
        if child.namespace.as_deref() != Some(WML_NS) {
            return Action::Keep;
        }
        let accept = self.mode == RevisionMode::Accept;
        match child.local_name() {
            "ins" | "moveTo" if !property_context => {
                self.report.insertions += 1;
                if accept { Action::Unwrap } else { Action::Drop }
            }
            "del" | "moveFrom" if !property_context => {
                self.report.deletions += 1;
                if accept { Action::Drop } else { Action::Unwrap }
            }
            "ins" | "moveTo" | "cellIns" if property_context => {
                self.report.insertions += 1;
                Action::Drop
            }
            "del" | "moveFrom" | "cellDel" if property_context => {
                self.report.deletions += 1;
                Action::Drop
            }
            "cellMerge" | "numberingChange" => {
                self.report.property_changes += 1;
                Action::Drop
            }
            local if RANGE_MARKERS.contains(&local) => Action::Drop,
            "tr" if self.row_removed(child) => {
                self.count_structural();
                Action::Drop
            }
            "tc" if self.cell_removed(child) => {
                self.count_structural();
                Action::Drop
            }
            _ => Action::Keep,
        }
    }

    const fn count_structural(&mut self) {
        match self.mode {
            RevisionMode::Accept => self.report.deletions += 1,
            RevisionMode::Reject => self.report.insertions += 1,
        }
    }

    /// Markers that remove the structure they sit on under the current mode.
    const fn removed_markers(&self) -> [&'static str; 2] {
        match self.mode {
            RevisionMode::Accept => ["del", "moveFrom"],
            RevisionMode::Reject => ["ins", "moveTo"],
        }
    }

    fn row_removed(&self, row: &XmlElement) -> bool {
        let [marker, _] = self.removed_markers();
        row.wml_child("trPr")
            .is_some_and(|props| props.wml_child(marker).is_some())
    }

    fn cell_removed(&self, cell: &XmlElement) -> bool {
        let marker = match self.mode {
            RevisionMode::Accept => "cellDel",
            RevisionMode::Reject => "cellIns",
        };
        cell.wml_child("tcPr")
            .is_some_and(|props| props.wml_child(marker).is_some())
    }

    fn paragraph_mark_removed(&self, paragraph: &XmlElement) -> bool {
        let markers = self.removed_markers();
        paragraph
            .wml_child("pPr")
            .and_then(|props| props.wml_child("rPr"))
            .is_some_and(|mark| markers.iter().any(|marker| mark.wml_child(marker).is_some()))
    }

    /// Drops (accept) or applies (reject) a `<x>Change` record inside property element `<x>`.
    fn resolve_property_change(&mut self, element: &mut XmlElement) {
        let local = element.local_name().to_string();
        let Some(index) = element.wml_child_index(&format!("{local}Change")) else {
            return;
        };
        self.report.property_changes += 1;
        let XmlNode::Element(change) = element.children.remove(index) else {
            return;
        };
        if self.mode == RevisionMode::Accept {
            return;
        }

        let previous: Vec<XmlNode> = change
            .children
            .into_iter()
            .find_map(|node| match node {
                XmlNode::Element(old) if old.is_wml(&local) => Some(old.children),
                _ => None,
            })
            .unwrap_or_default();
        let (kept, leading) = match local.as_str() {
            "pPr" => (&["rPr", "sectPr"][..], false),
            "rPr" => (&["ins", "del", "moveFrom", "moveTo"][..], true),
            "sectPr" => (&["headerReference", "footerReference"][..], true),
            "trPr" => (&["ins", "del"][..], false),
            "tcPr" => (&["cellIns", "cellDel", "cellMerge"][..], false),
            _ => (&[][..], false),
        };
        let current: Vec<XmlNode> = std::mem::take(&mut element.children)
            .into_iter()
            .filter(|node| {
                matches!(node, XmlNode::Element(child)
                    if child.namespace.as_deref() == Some(WML_NS) && kept.contains(&child.local_name()))
            })
            .collect();
        element.children = if leading {
            current.into_iter().chain(previous).collect()
        } else {
            previous.into_iter().chain(current).collect()
        };
    }
}

fn restore_deleted_text(element: &mut XmlElement) {
    if element.is_wml("delText") {
        element.set_local_name("t");
    } else if element.is_wml("delInstrText") {
        element.set_local_name("instrText");
    }
}

/// Moves the content of each flagged paragraph into the paragraph that follows it.
fn merge_paragraphs(nodes: &mut Vec<XmlNode>, merges: &mut Vec<bool>) {
    let mut index = nodes.len();
    while index > 0 {
        index -= 1;
        if !merges[index] {
            continue;
        }
        let next = (index + 1..nodes.len()).find(|&later| matches!(nodes[later], XmlNode::Element(_)));
        let Some(next) = next.filter(|&next| matches!(&nodes[next], XmlNode::Element(el) if el.is_wml("p")))
        else {
            continue;
        };
        merges.remove(index);
        let XmlNode::Element(source) = nodes.remove(index) else {
            continue;
        };
        let content: Vec<XmlNode> = source
            .children
            .into_iter()
            .filter(|node| !matches!(node, XmlNode::Element(el) if el.is_wml("pPr")))
            .collect();
        if let XmlNode::Element(target) = &mut nodes[next - 1] {
            let at = target.wml_child_index("pPr").map_or(0, |props| props + 1);
            target.children.splice(at..at, content);
        }
    }
}
