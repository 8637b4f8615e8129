//! The two document operations and the errors they report.

use std::path::{Path, PathBuf};
use std::{error::Error, fmt, fs, io};

use docx_package::{PackageError, XmlError};

use crate::parsers::PartParseError;
use crate::rewrite::MissingDefinition;

pub mod convert;
pub mod numbering;

pub use convert::{ConversionReport, FormatConverter, TrackChanges, convert};
pub use numbering::{MaterializeOptions, MaterializeReport, NumberingMaterializer, add_numbering};

#[derive(Debug)]
pub enum ControlError {
    InputNotFound(PathBuf),
    Package(PackageError),
    MalformedPackage(String),
    Xml { part: String, source: XmlError },
    Parse { part: String, source: PartParseError },
    MissingDefinition(MissingDefinition),
    SameInputOutput(PathBuf),
    OutputWrite { path: PathBuf, source: io::Error },
    UnsupportedFormat(String),
    ToolUnavailable { program: String, source: io::Error },
    ToolFailed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },
    Join(tokio::task::JoinError),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputNotFound(path) => write!(f, "input not found: {}", path.display()),
            Self::Package(err) => write!(f, "{err}"),
            Self::MalformedPackage(message) => write!(f, "malformed package: {message}"),
            Self::Xml { part, source } => write!(f, "{part}: {source}"),
            Self::Parse { part, source } => write!(f, "{part}: {source}"),
            Self::MissingDefinition(err) => write!(f, "{err}"),
            Self::SameInputOutput(path) => {
                write!(f, "output would overwrite the input: {}", path.display())
            }
            Self::OutputWrite { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
            Self::UnsupportedFormat(format) => write!(f, "unsupported target format: {format}"),
            Self::ToolUnavailable { program, source } => {
                write!(f, "conversion tool '{program}' is unavailable: {source}")
            }
            Self::ToolFailed {
                program,
                status,
                stderr,
            } => {
                write!(f, "conversion tool '{program}' failed")?;
                if let Some(code) = status {
                    write!(f, " with exit code {code}")?;
                }
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
            Self::Join(err) => write!(f, "background task failed: {err}"),
        }
    }
}

impl Error for ControlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Package(err) => Some(err),
            Self::Xml { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::MissingDefinition(err) => Some(err),
            Self::OutputWrite { source, .. } | Self::ToolUnavailable { source, .. } => Some(source),
            Self::Join(err) => Some(err),
            Self::InputNotFound(_)
            | Self::MalformedPackage(_)
            | Self::SameInputOutput(_)
            | Self::UnsupportedFormat(_)
            | Self::ToolFailed { .. } => None,
        }
    }
}

impl From<PackageError> for ControlError {
    fn from(err: PackageError) -> Self {
        match err {
            PackageError::NotFound(path) => Self::InputNotFound(path),
            other => Self::Package(other),
        }
    }
}

impl From<MissingDefinition> for ControlError {
    fn from(err: MissingDefinition) -> Self {
        Self::MissingDefinition(err)
    }
}

impl From<tokio::task::JoinError> for ControlError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err)
    }
}

impl ControlError {
    /// Wraps a failed package save as an output write failure.
    pub(crate) fn output_write(path: &Path, err: PackageError) -> Self {
        let source = match err {
            PackageError::Io(source) => source,
            other => io::Error::other(other),
        };
        Self::OutputWrite {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Whether `output` names the same file as `input`, which must exist.
pub(crate) fn same_file(input: &Path, output: &Path) -> bool {
    let Ok(input) = fs::canonicalize(input) else {
        return false;
    };
    let output = fs::canonicalize(output).or_else(|_| {
        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let name = output.file_name().ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
        fs::canonicalize(parent).map(|parent| parent.join(name))
    });
    output.is_ok_and(|output| output == input)
}
