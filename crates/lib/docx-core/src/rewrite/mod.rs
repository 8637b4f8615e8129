//! In-place rewrites of story parts.

pub mod numbering;
pub mod revisions;

pub use numbering::{
    MissingDefinition,
    MissingDefinitionPolicy,
    NumberingRewriteReport,
    NumberingRewriter,
    SeparatorPolicy,
    strip_style_numbering,
};
pub use revisions::{RevisionMode, RevisionReport, RevisionResolver};
