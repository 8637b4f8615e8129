//! Word package container and XML part helpers for docx-flatten.
//!
//! This crate reads and writes the zip container, locates the parts the
//! numbering and revision passes operate on, and provides the mutable XML
//! tree those passes rewrite.

pub mod layout;
pub mod package;
pub mod schema;
pub mod xml;

pub use layout::PackageLayout;
pub use package::{DocxPackage, PackageError};
pub use xml::{XmlAttribute, XmlDocument, XmlElement, XmlError, XmlNode};
