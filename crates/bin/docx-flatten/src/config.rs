use clap::{Parser, builder::BoolishValueParser};
use docx_core::{
    MaterializeOptions,
    MissingDefinitionPolicy,
    PandocBackend,
    SeparatorPolicy,
    TargetFormat,
    TrackChanges,
};
use serde::Deserialize;
use std::error::Error;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::{fmt, fs, io};

const DEFAULT_PANDOC: &str = "pandoc";
const NUMBERED_SUFFIX: &str = "_numbered";

#[derive(Parser, Debug)]
#[command(
    name = "docx-flatten",
    version,
    about = "Writes list numbers into Word documents as literal text, then optionally converts them with pandoc."
)]
pub struct CliArgs {
    /// Word document to read. It is never modified.
    input: PathBuf,

    /// Where to write the numbered document [default: <input stem>_numbered.docx].
    #[arg(short, long, env = "DOCX_FLATTEN_OUTPUT")]
    output: Option<PathBuf>,

    /// Convert the numbered document to this format.
    #[arg(long = "to", env = "DOCX_FLATTEN_TO", value_name = "FORMAT")]
    to: Option<String>,

    /// Tracked-change handling for the conversion: accept, reject or all.
    #[arg(
        long,
        env = "DOCX_FLATTEN_TRACK_CHANGES",
        value_name = "MODE",
        default_value_t = TrackChanges::All
    )]
    track_changes: TrackChanges,

    /// Text after each label: space, tab or level.
    #[arg(long, env = "DOCX_FLATTEN_SEPARATOR")]
    separator: Option<SeparatorPolicy>,

    /// Fail when a paragraph references an undefined list level.
    #[arg(
        long,
        env = "DOCX_FLATTEN_STRICT",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    strict: Option<bool>,

    /// Path to the pandoc executable.
    #[arg(long, env = "DOCX_FLATTEN_PANDOC")]
    pandoc: Option<PathBuf>,

    /// Extra argument passed to pandoc; repeatable.
    #[arg(long = "pandoc-arg", value_name = "ARG", allow_hyphen_values = true)]
    pandoc_args: Vec<String>,

    /// TOML file with defaults for separator, strict, pandoc and pandoc-args.
    #[arg(long, env = "DOCX_FLATTEN_CONFIG")]
    config: Option<PathBuf>,

    /// Print the run report as JSON on stdout.
    #[arg(
        long,
        env = "DOCX_FLATTEN_JSON",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    json: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,

    /// Also append error-level log lines to this file.
    #[arg(long, env = "DOCX_FLATTEN_ERROR_LOG", value_name = "PATH")]
    error_log: Option<PathBuf>,
}

impl CliArgs {
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn error_log(&self) -> Option<&Path> {
        self.error_log.as_deref()
    }
}

/// Settings read from `--config`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
struct FileConfig {
    separator: Option<SeparatorPolicy>,
    strict: Option<bool>,
    pandoc: Option<PathBuf>,
    pandoc_args: Vec<String>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Validated runtime configuration for one run.
#[derive(Debug, Clone)]
pub struct FlattenConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Canonical target format name when a conversion was requested.
    pub format: Option<String>,
    pub track_changes: TrackChanges,
    pub materialize: MaterializeOptions,
    pub pandoc: PathBuf,
    pub pandoc_args: Vec<String>,
    pub json: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidSetting { name: &'static str, value: String },
    InputNotFound(PathBuf),
    ReadFile { path: PathBuf, source: io::Error },
    ParseFile { path: PathBuf, source: toml::de::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSetting { name, value } => write!(f, "invalid {name} value: {value}"),
            Self::InputNotFound(path) => write!(f, "input not found: {}", path.display()),
            Self::ReadFile { path, source } => {
                write!(f, "cannot read config file {}: {source}", path.display())
            }
            Self::ParseFile { path, source } => {
                write!(f, "invalid config file {}: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseFile { source, .. } => Some(source),
            Self::InvalidSetting { .. } | Self::InputNotFound(_) => None,
        }
    }
}

impl FlattenConfig {
    pub fn backend(&self) -> PandocBackend {
        PandocBackend::new()
            .with_program(self.pandoc.clone())
            .with_extra_args(self.pandoc_args.clone())
    }
}

impl TryFrom<CliArgs> for FlattenConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let is_docx = args
            .input
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
        if !is_docx {
            return Err(ConfigError::InvalidSetting {
                name: "INPUT",
                value: args.input.display().to_string(),
            });
        }
        if !args.input.is_file() {
            return Err(ConfigError::InputNotFound(args.input));
        }

        let file = match args.config.as_deref() {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let format = match args.to {
            Some(name) => match TargetFormat::lookup(&name) {
                Some(target) => Some(target.name.to_string()),
                None => {
                    return Err(ConfigError::InvalidSetting {
                        name: "--to",
                        value: name,
                    });
                }
            },
            None => None,
        };

        let separator = args.separator.or(file.separator).unwrap_or_default();
        let missing = if args.strict.or(file.strict).unwrap_or(false) {
            MissingDefinitionPolicy::Fail
        } else {
            MissingDefinitionPolicy::Skip
        };
        let materialize = MaterializeOptions::default()
            .with_separator(separator)
            .with_missing_definitions(missing);

        let pandoc = args
            .pandoc
            .or(file.pandoc)
            .filter(|path| !path.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PANDOC));
        let pandoc_args = if args.pandoc_args.is_empty() {
            file.pandoc_args
        } else {
            args.pandoc_args
        };

        let output = args.output.unwrap_or_else(|| numbered_path(&args.input));

        Ok(Self {
            input: args.input,
            output,
            format,
            track_changes: args.track_changes,
            materialize,
            pandoc,
            pandoc_args,
            json: args.json,
        })
    }
}

/// `<dir>/<stem>_numbered.docx` beside the input.
fn numbered_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{stem}{NUMBERED_SUFFIX}.docx"))
}
