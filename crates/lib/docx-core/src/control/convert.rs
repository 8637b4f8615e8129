use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

use docx_package::{DocxPackage, PackageLayout, XmlDocument};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::backend::{ConversionBackend, ConversionJob, PandocBackend, TargetFormat};
use crate::rewrite::{RevisionMode, RevisionReport, RevisionResolver};

use super::ControlError;

/// How tracked changes are handled before conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackChanges {
    /// Keep insertions, drop deletions.
    Accept,
    /// Drop insertions, keep deletions.
    Reject,
    /// Leave revision markup for the converter to render.
    #[default]
    All,
}

impl TrackChanges {
    pub const fn revision_mode(self) -> Option<RevisionMode> {
        match self {
            Self::Accept => Some(RevisionMode::Accept),
            Self::Reject => Some(RevisionMode::Reject),
            Self::All => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::All => "all",
        }
    }
}

impl fmt::Display for TrackChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackChanges {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            "all" => Ok(Self::All),
            other => Err(format!("unknown track-changes mode '{other}' (expected accept, reject or all)")),
        }
    }
}

/// Summary of a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: String,
    pub backend: String,
    pub track_changes: TrackChanges,
    /// Present when revisions were resolved before conversion.
    pub revisions: Option<RevisionReport>,
}

/// Converts Word documents through a [`ConversionBackend`].
#[derive(Debug, Clone, Default)]
pub struct FormatConverter<B = PandocBackend> {
    backend: B,
}

impl<B: ConversionBackend> FormatConverter<B> {
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Converts `input` to `format`, returning the path of the produced file.
    ///
    /// # Errors
    /// Returns `ControlError` if the input is missing, the format is
    /// unsupported, revisions cannot be resolved, the backend fails, or the
    /// output cannot be moved into place. No output file is left behind on failure.
    pub fn convert(
        &self,
        input: impl AsRef<Path>,
        format: &str,
        track_changes: TrackChanges,
    ) -> Result<PathBuf, ControlError> {
        self.convert_with_report(input, format, track_changes)
            .map(|report| report.output)
    }

    /// Like [`Self::convert`], also reporting the revisions resolved.
    ///
    /// # Errors
    /// Returns `ControlError` for the same reasons as [`Self::convert`].
    pub fn convert_with_report(
        &self,
        input: impl AsRef<Path>,
        format: &str,
        track_changes: TrackChanges,
    ) -> Result<ConversionReport, ControlError> {
        let input = input.as_ref();
        if !input.is_file() {
            return Err(ControlError::InputNotFound(input.to_path_buf()));
        }
        let target = TargetFormat::lookup(format)
            .ok_or_else(|| ControlError::UnsupportedFormat(format.to_string()))?;
        let output = output_path(input, target);

        let resolved = track_changes
            .revision_mode()
            .map(|mode| resolve_to_temp(input, mode))
            .transpose()?;
        let source = resolved
            .as_ref()
            .map_or_else(|| input.to_path_buf(), |(temp, _)| temp.path().to_path_buf());

        let dir = parent_dir(&output);
        let staged = tempfile::Builder::new()
            .prefix(".docx-flatten-")
            .suffix(&format!(".{}", target.extension))
            .tempfile_in(dir)
            .map_err(|source| ControlError::OutputWrite {
                path: output.clone(),
                source,
            })?;
        let job = ConversionJob {
            input: source,
            output: staged.path().to_path_buf(),
            format: target,
            track_changes,
        };
        debug!(
            backend = self.backend.name(),
            input = %job.input.display(),
            format = target.name,
            "converting document"
        );
        self.backend.convert(&job)?;
        staged
            .persist(&output)
            .map_err(|err| ControlError::OutputWrite {
                path: output.clone(),
                source: err.error,
            })?;

        info!(
            input = %input.display(),
            output = %output.display(),
            track_changes = %track_changes,
            "converted document"
        );
        Ok(ConversionReport {
            input: input.to_path_buf(),
            output,
            format: target.name.to_string(),
            backend: self.backend.name().to_string(),
            track_changes,
            revisions: resolved.map(|(_, report)| report),
        })
    }

    /// Runs [`Self::convert`] on the blocking thread pool.
    ///
    /// # Errors
    /// Returns `ControlError` for the same reasons as [`Self::convert`], or
    /// `ControlError::Join` if the blocking task panics.
    pub async fn convert_async(
        &self,
        input: PathBuf,
        format: String,
        track_changes: TrackChanges,
    ) -> Result<PathBuf, ControlError>
    where
        B: Clone + 'static,
    {
        let converter = self.clone();
        tokio::task::spawn_blocking(move || converter.convert(&input, &format, track_changes)).await?
    }
}

/// `<dir>/<stem>.<ext>`, or `<dir>/<stem>_converted.<ext>` when that would be the input itself.
pub fn output_path(input: &Path, format: &TargetFormat) -> PathBuf {
    let candidate = input.with_extension(format.extension);
    if candidate != input {
        return candidate;
    }
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}_converted.{}", format.extension))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Resolves every tracked change in the main document and story parts.
///
/// # Errors
/// Returns `ControlError` if the package has no main document or a part is not well-formed XML.
pub fn resolve_revisions(package: &mut DocxPackage, mode: RevisionMode) -> Result<RevisionReport, ControlError> {
    let layout = PackageLayout::discover(package)?.ok_or_else(|| {
        ControlError::MalformedPackage("package has no main document part".to_string())
    })?;
    let mut resolver = RevisionResolver::new(mode);
    for part in std::iter::once(&layout.document).chain(&layout.stories) {
        let bytes = package
            .part(part)
            .ok_or_else(|| ControlError::MalformedPackage(format!("missing part {part}")))?;
        let mut document = XmlDocument::parse(bytes).map_err(|source| ControlError::Xml {
            part: part.clone(),
            source,
        })?;
        resolver.resolve(&mut document);
        let bytes = document.to_bytes().map_err(|source| ControlError::Xml {
            part: part.clone(),
            source,
        })?;
        package.set_part(part.clone(), bytes);
    }
    let report = resolver.report();
    debug!(
        mode = %mode,
        insertions = report.insertions,
        deletions = report.deletions,
        property_changes = report.property_changes,
        "resolved tracked changes"
    );
    Ok(report)
}

fn resolve_to_temp(input: &Path, mode: RevisionMode) -> Result<(NamedTempFile, RevisionReport), ControlError> {
    let mut package = DocxPackage::open(input)?;
    let report = resolve_revisions(&mut package, mode)?;
    let mut temp = tempfile::Builder::new()
        .prefix("docx-flatten-")
        .suffix(".docx")
        .tempfile()
        .map_err(|source| ControlError::OutputWrite {
            path: std::env::temp_dir(),
            source,
        })?;
    let written = package.write_to(temp.as_file_mut()).map(|_| ());
    written.map_err(|err| ControlError::output_write(temp.path(), err))?;
    Ok((temp, report))
}

/// Converts `input` to `format` with pandoc.
///
/// Returns the output path, or `None` on any failure; the cause is logged.
pub fn convert(input: impl AsRef<Path>, format: &str, track_changes: TrackChanges) -> Option<PathBuf> {
    let input = input.as_ref();
    match FormatConverter::new(PandocBackend::new()).convert(input, format, track_changes) {
        Ok(output) => Some(output),
        Err(err) => {
            error!(
                input = %input.display(),
                format,
                error = %err,
                "conversion failed"
            );
            None
        }
    }
}
