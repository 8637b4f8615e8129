//! External conversion tools.
//!
//! The converter only talks to the [`ConversionBackend`] trait; the pandoc
//! subprocess is the production implementation.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::control::{ControlError, TrackChanges};

/// An output format the converter accepts, with its pandoc writer and file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFormat {
    pub name: &'static str,
    /// `None` lets pandoc infer the writer from the output extension (PDF).
    pub writer: Option<&'static str>,
    pub extension: &'static str,
}

const fn pandoc_format(name: &'static str, writer: &'static str, extension: &'static str) -> TargetFormat {
    TargetFormat {
        name,
        writer: Some(writer),
        extension,
    }
}

const TARGET_FORMATS: &[TargetFormat] = &[
    pandoc_format("markdown", "markdown", "md"),
    pandoc_format("md", "markdown", "md"),
    pandoc_format("gfm", "gfm", "md"),
    pandoc_format("commonmark", "commonmark", "md"),
    pandoc_format("commonmark_x", "commonmark_x", "md"),
    pandoc_format("markdown_strict", "markdown_strict", "md"),
    pandoc_format("markdown_mmd", "markdown_mmd", "md"),
    pandoc_format("markdown_phpextra", "markdown_phpextra", "md"),
    pandoc_format("html", "html", "html"),
    pandoc_format("html4", "html4", "html"),
    pandoc_format("html5", "html5", "html"),
    TargetFormat {
        name: "pdf",
        writer: None,
        extension: "pdf",
    },
    pandoc_format("latex", "latex", "tex"),
    pandoc_format("plain", "plain", "txt"),
    pandoc_format("rst", "rst", "rst"),
    pandoc_format("org", "org", "org"),
    pandoc_format("asciidoc", "asciidoc", "adoc"),
    pandoc_format("docx", "docx", "docx"),
    pandoc_format("odt", "odt", "odt"),
    pandoc_format("rtf", "rtf", "rtf"),
    pandoc_format("epub", "epub", "epub"),
    pandoc_format("epub3", "epub3", "epub"),
    pandoc_format("mediawiki", "mediawiki", "wiki"),
    pandoc_format("typst", "typst", "typ"),
    pandoc_format("json", "json", "json"),
    pandoc_format("textile", "textile", "textile"),
    pandoc_format("jira", "jira", "jira"),
];

impl TargetFormat {
    /// Looks up a format by name, ignoring case and surrounding whitespace.
    pub fn lookup(name: &str) -> Option<&'static Self> {
        let name = name.trim();
        TARGET_FORMATS
            .iter()
            .find(|format| format.name.eq_ignore_ascii_case(name))
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        TARGET_FORMATS.iter().map(|format| format.name)
    }
}

/// One conversion request handed to a backend.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: &'static TargetFormat,
    pub track_changes: TrackChanges,
}

/// Produces `job.output` from the Word document at `job.input`.
pub trait ConversionBackend: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    /// Returns `ControlError::ToolUnavailable` when the tool cannot be started
    /// and `ControlError::ToolFailed` when it reports failure.
    fn convert(&self, job: &ConversionJob) -> Result<(), ControlError>;
}

/// Runs the `pandoc` executable as a blocking subprocess.
#[derive(Debug, Clone)]
pub struct PandocBackend {
    program: PathBuf,
    extra_args: Vec<String>,
}

impl Default for PandocBackend {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pandoc"),
            extra_args: Vec::new(),
        }
    }
}

impl PandocBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed to pandoc for `job`, excluding the program itself.
    pub fn arguments(&self, job: &ConversionJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![job.input.clone().into(), "-f".into(), "docx".into()];
        if let Some(writer) = job.format.writer {
            args.push("-t".into());
            args.push(writer.into());
        }
        args.push("-o".into());
        args.push(job.output.clone().into());
        args.push(format!("--track-changes={}", job.track_changes).into());
        args.extend(self.extra_args.iter().map(OsString::from));
        args
    }
}

impl ConversionBackend for PandocBackend {
    fn name(&self) -> &str {
        "pandoc"
    }

    fn convert(&self, job: &ConversionJob) -> Result<(), ControlError> {
        let program = self.program.display().to_string();
        let mut command = Command::new(&self.program);
        command.args(self.arguments(job));
        debug!(command = ?command, "running pandoc");

        let output = command.output().map_err(|err| match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => ControlError::ToolUnavailable {
                program: program.clone(),
                source: err,
            },
            _ => ControlError::ToolFailed {
                program: program.clone(),
                status: None,
                stderr: err.to_string(),
            },
        })?;
        if !output.status.success() {
            return Err(ControlError::ToolFailed {
                program,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
