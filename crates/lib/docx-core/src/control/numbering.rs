use std::path::{Path, PathBuf};

use docx_package::{DocxPackage, PackageLayout, XmlDocument};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::numbering::NumberingDefinitions;
use crate::parsers::{NumberingXmlParser, StyleCatalog, StylesXmlParser};
use crate::rewrite::{MissingDefinitionPolicy, NumberingRewriter, SeparatorPolicy, strip_style_numbering};

use super::{ControlError, same_file};

/// Options for a numbering materialization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeOptions {
    pub separator: SeparatorPolicy,
    pub missing_definitions: MissingDefinitionPolicy,
}

impl MaterializeOptions {
    #[must_use]
    pub const fn with_separator(mut self, separator: SeparatorPolicy) -> Self {
        self.separator = separator;
        self
    }

    #[must_use]
    pub const fn with_missing_definitions(mut self, missing: MissingDefinitionPolicy) -> Self {
        self.missing_definitions = missing;
        self
    }
}

/// Summary of a numbering materialization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeReport {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// Story parts rewritten, main document first.
    pub parts: Vec<String>,
    pub paragraph_count: usize,
    pub labelled_count: usize,
    pub stripped_count: usize,
    pub skipped_count: usize,
    pub style_references_stripped: usize,
}

/// Bakes list numbering into Word documents as literal text.
#[derive(Debug, Clone, Default)]
pub struct NumberingMaterializer {
    options: MaterializeOptions,
}

impl NumberingMaterializer {
    pub const fn new(options: MaterializeOptions) -> Self {
        Self { options }
    }

    pub const fn options(&self) -> MaterializeOptions {
        self.options
    }

    /// Reads `input`, materializes its numbering and writes the result to `output`.
    ///
    /// The input file is never modified and `output` only appears once it is
    /// completely written.
    ///
    /// # Errors
    /// Returns `ControlError` if the input is missing or malformed, if `output`
    /// is the input file, if a referenced list level is undefined under
    /// `MissingDefinitionPolicy::Fail`, or if the output cannot be written.
    pub fn process(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<MaterializeReport, ControlError> {
        let input = input.as_ref();
        let output = output.as_ref();
        if !input.is_file() {
            return Err(ControlError::InputNotFound(input.to_path_buf()));
        }
        if same_file(input, output) {
            return Err(ControlError::SameInputOutput(output.to_path_buf()));
        }

        let mut package = DocxPackage::open(input)?;
        let mut report = self.materialize(&mut package)?;
        package
            .save(output)
            .map_err(|err| ControlError::output_write(output, err))?;

        report.input = Some(input.to_path_buf());
        report.output = Some(output.to_path_buf());
        info!(
            input = %input.display(),
            output = %output.display(),
            labelled = report.labelled_count,
            skipped = report.skipped_count,
            "materialized numbering"
        );
        Ok(report)
    }

    /// Materializes numbering inside an in-memory package.
    ///
    /// # Errors
    /// Returns `ControlError` if the package has no main document, a part is
    /// not well-formed XML, or a referenced list level is undefined under
    /// `MissingDefinitionPolicy::Fail`.
    pub fn materialize(&self, package: &mut DocxPackage) -> Result<MaterializeReport, ControlError> {
        let layout = PackageLayout::discover(package)?.ok_or_else(|| {
            ControlError::MalformedPackage("package has no main document part".to_string())
        })?;

        let catalog = match layout.styles.as_deref() {
            Some(part) => match package.part_str(part)? {
                Some(xml) => StylesXmlParser::parse(xml).map_err(|source| ControlError::Parse {
                    part: part.to_string(),
                    source,
                })?,
                None => StyleCatalog::new(),
            },
            None => StyleCatalog::new(),
        };
        let definitions = match layout.numbering.as_deref() {
            Some(part) => match package.part_str(part)? {
                Some(xml) => NumberingXmlParser::parse(xml, &catalog).map_err(|source| {
                    ControlError::Parse {
                        part: part.to_string(),
                        source,
                    }
                })?,
                None => NumberingDefinitions::new(),
            },
            None => NumberingDefinitions::new(),
        };
        debug!(
            lists = definitions.len(),
            styles = catalog.len(),
            "loaded numbering definitions"
        );

        let mut rewriter = NumberingRewriter::new(&definitions, &catalog)
            .with_separator(self.options.separator)
            .with_missing_definitions(self.options.missing_definitions);
        let mut report = MaterializeReport::default();
        let stories = std::iter::once(&layout.document).chain(&layout.stories);
        for part in stories {
            let before = rewriter.report();
            let mut document = parse_part(package, part)?;
            rewriter.rewrite(&mut document)?;
            let after = rewriter.report();
            let is_main = *part == layout.document;
            if is_main || after.stripped > before.stripped || after.labelled > before.labelled {
                package.set_part(part.clone(), serialize_part(&document, part)?);
                report.parts.push(part.clone());
                debug!(part = %part, labelled = after.labelled - before.labelled, "rewrote part");
            }
        }

        if let Some(part) = layout.styles.as_deref() {
            let mut styles = parse_part(package, part)?;
            report.style_references_stripped = strip_style_numbering(&mut styles);
            if report.style_references_stripped > 0 {
                package.set_part(part, serialize_part(&styles, part)?);
            }
        }

        let totals = rewriter.report();
        report.paragraph_count = totals.paragraphs;
        report.labelled_count = totals.labelled;
        report.stripped_count = totals.stripped;
        report.skipped_count = totals.skipped;
        Ok(report)
    }

    /// Runs [`Self::process`] on the blocking thread pool.
    ///
    /// # Errors
    /// Returns `ControlError` for the same reasons as [`Self::process`], or
    /// `ControlError::Join` if the blocking task panics.
    pub async fn process_async(
        &self,
        input: PathBuf,
        output: PathBuf,
    ) -> Result<MaterializeReport, ControlError> {
        let materializer = self.clone();
        tokio::task::spawn_blocking(move || materializer.process(&input, &output)).await?
    }
}

fn parse_part(package: &DocxPackage, part: &str) -> Result<XmlDocument, ControlError> {
    let bytes = package
        .part(part)
        .ok_or_else(|| ControlError::MalformedPackage(format!("missing part {part}")))?;
    XmlDocument::parse(bytes).map_err(|source| ControlError::Xml {
        part: part.to_string(),
        source,
    })
}

fn serialize_part(document: &XmlDocument, part: &str) -> Result<Vec<u8>, ControlError> {
    document.to_bytes().map_err(|source| ControlError::Xml {
        part: part.to_string(),
        source,
    })
}

/// Materializes list numbering from `input` into a new package at `output`
/// with default options.
///
/// Returns `false` on any failure; the cause is logged.
pub fn add_numbering(input: impl AsRef<Path>, output: impl AsRef<Path>) -> bool {
    let input = input.as_ref();
    match NumberingMaterializer::default().process(input, output.as_ref()) {
        Ok(_) => true,
        Err(err) => {
            error!(input = %input.display(), error = %err, "failed to materialize numbering");
            false
        }
    }
}
