//! Numbering materialization and format conversion for Word documents.
//!
//! [`add_numbering`] rewrites list paragraphs so their labels are literal
//! text, and [`convert`] hands a document (optionally with tracked changes
//! accepted or rejected first) to an external converter. Both have
//! `Result`-returning forms on [`NumberingMaterializer`] and
//! [`FormatConverter`].

pub mod backend;
pub mod control;
pub mod numbering;
pub mod parsers;
pub mod rewrite;

pub use backend::{ConversionBackend, ConversionJob, PandocBackend, TargetFormat};
pub use control::{
    ControlError,
    ConversionReport,
    FormatConverter,
    MaterializeOptions,
    MaterializeReport,
    NumberingMaterializer,
    TrackChanges,
    add_numbering,
    convert,
};
pub use rewrite::{MissingDefinitionPolicy, RevisionMode, SeparatorPolicy};
