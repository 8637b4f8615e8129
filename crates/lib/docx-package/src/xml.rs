//! A small mutable XML tree for rewriting package parts.
//!
//! Parts are read with `quick-xml`, held as owned elements with their resolved
//! namespace, and written back with the same attribute order. Processing
//! instructions and doctype declarations are not retained; Word parts carry
//! neither.

use std::borrow::Cow;
use std::{error::Error, fmt, io};

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::schema::{WML_NS, XML_NS};

/// Error type for XML part parse and write failures.
#[derive(Debug)]
pub struct XmlError {
    message: String,
}

impl XmlError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XML error: {}", self.message)
    }
}

impl Error for XmlError {}

impl From<quick_xml::Error> for XmlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<AttrError> for XmlError {
    fn from(err: AttrError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<io::Error> for XmlError {
    fn from(err: io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<std::str::Utf8Error> for XmlError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    pub namespace: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name as written in the source, e.g. `w:p`.
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.map(str::to_string),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates a WordprocessingML element using `prefix`, the prefix the
    /// surrounding document already binds to the WML namespace.
    #[must_use]
    pub fn wml(prefix: &str, local: &str) -> Self {
        Self::new(qualify(prefix, local), Some(WML_NS))
    }

    #[must_use]
    pub fn with_attribute(mut self, name: &str, namespace: Option<&str>, value: &str) -> Self {
        self.attributes.push(XmlAttribute {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            value: value.to_string(),
        });
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(XmlNode::Text(text.to_string()));
        self
    }

    pub fn prefix(&self) -> &str {
        self.name.split_once(':').map_or("", |(prefix, _)| prefix)
    }

    pub fn local_name(&self) -> &str {
        self.name.split_once(':').map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Changes the local part of the name, keeping the prefix and namespace.
    pub fn set_local_name(&mut self, local: &str) {
        self.name = qualify(self.prefix(), local);
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name() == local
    }

    pub fn is_wml(&self, local: &str) -> bool {
        self.is(WML_NS, local)
    }

    pub fn attribute(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| {
                attr.namespace.as_deref() == Some(namespace)
                    && attr
                        .name
                        .split_once(':')
                        .map_or(attr.name.as_str(), |(_, name)| name)
                        == local
            })
            .map(|attr| attr.value.as_str())
    }

    pub fn wml_attribute(&self, local: &str) -> Option<&str> {
        self.attribute(WML_NS, local)
    }

    /// Shorthand for the common `<w:child w:val="..."/>` pattern.
    pub fn wml_child_val(&self, local: &str) -> Option<&str> {
        self.wml_child(local).and_then(|child| child.wml_attribute("val"))
    }

    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Self> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn wml_child(&self, local: &str) -> Option<&Self> {
        self.elements().find(|child| child.is_wml(local))
    }

    pub fn wml_child_mut(&mut self, local: &str) -> Option<&mut Self> {
        self.elements_mut().find(|child| child.is_wml(local))
    }

    /// Index into `children` of the first WML child named `local`.
    pub fn wml_child_index(&self, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(child) if child.is_wml(local)))
    }

    /// Removes every descendant element matching `predicate`, returning how many
    /// were removed. Removed subtrees are not searched further.
    pub fn remove_descendants(&mut self, predicate: &dyn Fn(&Self) -> bool) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, XmlNode::Element(child) if predicate(child)));
        let mut removed = before - self.children.len();
        for child in self.elements_mut() {
            removed += child.remove_descendants(predicate);
        }
        removed
    }

    /// Returns true when this element or any descendant matches `predicate`.
    pub fn contains(&self, predicate: &dyn Fn(&Self) -> bool) -> bool {
        predicate(self) || self.elements().any(|child| child.contains(predicate))
    }
}

/// A parsed XML part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub standalone: Option<String>,
    pub root: XmlElement,
}

impl XmlDocument {
    /// Parses a part into an element tree.
    ///
    /// # Errors
    /// Returns `XmlError` if the part is not well-formed or has no root element.
    pub fn parse(xml: &[u8]) -> Result<Self, XmlError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(false);
        reader.check_end_names(true);

        let mut buf = Vec::new();
        let mut standalone = None;
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut scopes = NamespaceScopes::default();
        let mut root = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Decl(decl) => {
                    standalone = decl
                        .standalone()
                        .transpose()?
                        .map(|value| String::from_utf8_lossy(&value).into_owned());
                }
                Event::Start(start) => {
                    let element = scopes.open(&start)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = scopes.open(&start)?;
                    scopes.close();
                    attach(&mut stack, &mut root, XmlNode::Element(element))?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| XmlError::new("unexpected closing tag"))?;
                    scopes.close();
                    attach(&mut stack, &mut root, XmlNode::Element(element))?;
                }
                Event::Text(text) => {
                    if !stack.is_empty() {
                        let text = text.unescape()?.into_owned();
                        attach(&mut stack, &mut root, XmlNode::Text(text))?;
                    }
                }
                Event::CData(data) => {
                    if !stack.is_empty() {
                        let data = String::from_utf8_lossy(&data.into_inner()).into_owned();
                        attach(&mut stack, &mut root, XmlNode::CData(data))?;
                    }
                }
                Event::Comment(comment) => {
                    if !stack.is_empty() {
                        let comment = String::from_utf8_lossy(&comment).into_owned();
                        attach(&mut stack, &mut root, XmlNode::Comment(comment))?;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(XmlError::new("unexpected end of document"));
        }
        let root = root.ok_or_else(|| XmlError::new("document has no root element"))?;
        Ok(Self { standalone, root })
    }

    /// Serializes the tree with an XML declaration.
    ///
    /// # Errors
    /// Returns `XmlError` if writing an event fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, XmlError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new(
            "1.0",
            Some("UTF-8"),
            self.standalone.as_deref(),
        )))?;
        writer.write_event(Event::Text(BytesText::from_escaped("\r\n")))?;
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }

    /// The prefix bound to the WordprocessingML namespace on the root element.
    pub fn wml_prefix(&self) -> &str {
        if self.root.namespace.as_deref() == Some(WML_NS) {
            return self.root.prefix();
        }
        self.root
            .attributes
            .iter()
            .find(|attr| attr.value == WML_NS && attr.name.starts_with("xmlns"))
            .map_or("w", |attr| {
                attr.name.split_once(':').map_or("", |(_, prefix)| prefix)
            })
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    node: XmlNode,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        XmlNode::Element(element) if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        XmlNode::Element(_) => Err(XmlError::new("multiple root elements")),
        _ => Ok(()),
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for attr in &element.attributes {
        start.push_attribute((attr.name.as_str(), attr.value.as_str()));
    }
    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            XmlNode::CData(data) => writer.write_event(Event::CData(BytesCData::new(data.as_str())))?,
            XmlNode::Comment(comment) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

fn qualify(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{prefix}:{local}")
    }
}

/// Stack of `xmlns` declarations in scope while reading.
#[derive(Default)]
struct NamespaceScopes {
    frames: Vec<Vec<(String, String)>>,
}

impl NamespaceScopes {
    fn open(&mut self, start: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
        let name = std::str::from_utf8(start.name().as_ref())?.to_string();

        let mut raw = Vec::new();
        let mut declared = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            if key == "xmlns" {
                declared.push((String::new(), value.clone()));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declared.push((prefix.to_string(), value.clone()));
            }
            raw.push((key, value));
        }
        self.frames.push(declared);

        let element_prefix = name.split_once(':').map_or("", |(prefix, _)| prefix);
        let namespace = self.resolve(element_prefix).map(Cow::into_owned);
        let attributes = raw
            .into_iter()
            .map(|(key, value)| {
                let namespace = match key.split_once(':') {
                    Some(("xmlns", _)) => None,
                    Some((prefix, _)) => self.resolve(prefix).map(Cow::into_owned),
                    None => None,
                };
                XmlAttribute {
                    name: key,
                    namespace,
                    value,
                }
            })
            .collect();

        Ok(XmlElement {
            name,
            namespace,
            attributes,
            children: Vec::new(),
        })
    }

    fn close(&mut self) {
        self.frames.pop();
    }

    fn resolve(&self, prefix: &str) -> Option<Cow<'_, str>> {
        if prefix == "xml" {
            return Some(Cow::Borrowed(XML_NS));
        }
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter())
            .find(|(declared, _)| declared == prefix)
            .and_then(|(_, uri)| (!uri.is_empty()).then_some(Cow::Borrowed(uri.as_str())))
    }
}
