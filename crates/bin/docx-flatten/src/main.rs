//! Command-line entry point for docx-flatten.
//!
//! Materializes list numbering into a new document, then optionally converts
//! that document through pandoc.

mod config;

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use docx_core::{ControlError, FormatConverter, MaterializeReport, NumberingMaterializer};
use serde::Serialize;
use tracing::{Subscriber, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{CliArgs, FlattenConfig};

#[derive(Debug, Serialize)]
struct RunSummary {
    numbering: MaterializeReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    converted: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.verbose(), args.error_log());

    let config = match FlattenConfig::try_from(args) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let summary = match run(&config).await {
        Ok(summary) => summary,
        Err(err) => {
            error!(input = %config.input.display(), error = %err, "docx-flatten failed");
            return ExitCode::FAILURE;
        }
    };

    if config.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                error!(error = %err, "failed to serialize report");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

fn init_tracing(verbose: bool, error_log: Option<&Path>) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let stderr = fmt::layer().with_writer(io::stderr).with_filter(filter);

    let (errors, open_failure) = match error_log.map(open_error_log).transpose() {
        Ok(file) => (file.map(error_layer), None),
        Err(err) => (None, Some(err)),
    };
    tracing_subscriber::registry().with(stderr).with(errors).init();

    if let (Some(path), Some(err)) = (error_log, open_failure) {
        warn!(path = %path.display(), error = %err, "cannot open error log");
    }
}

fn open_error_log(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Plain-text layer that records only `ERROR` events.
fn error_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::ERROR)
}

async fn run(config: &FlattenConfig) -> Result<RunSummary, ControlError> {
    let materializer = NumberingMaterializer::new(config.materialize);
    let numbering = materializer
        .process_async(config.input.clone(), config.output.clone())
        .await?;

    let mut converted = None;
    if let Some(format) = &config.format {
        let converter = FormatConverter::new(config.backend());
        let path = converter
            .convert_async(config.output.clone(), format.clone(), config.track_changes)
            .await?;
        info!(output = %path.display(), format = %format, "converted numbered document");
        converted = Some(path);
    }

    Ok(RunSummary {
        numbering,
        converted,
    })
}
