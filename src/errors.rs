//! Error types for configuring and starting a run.
//!
//! ## Notes
//!
//! - Configuration errors carry a diagnostic code and an actionable `help` line (miette).
//! - Example failures are never errors at this level; they are recorded by the reporter and folded
//!   into the verdict.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::loader::LoadError;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Formatter '{name}' unknown - maybe you meant 'documentation' or 'progress'?.")]
    #[diagnostic(code(specrun::config::formatter), help("use `--formatter progress` or `--formatter documentation`"))]
    UnknownFormatter { name: String },

    #[error("invalid line number '{value}'")]
    #[diagnostic(code(specrun::config::line_number), help("line numbers are positive integers, e.g. `-l 42`"))]
    InvalidLineNumber { value: String },

    #[error("invalid example pattern '{pattern}': {source}")]
    #[diagnostic(code(specrun::config::pattern), help("`-e` takes a regular expression matched against full descriptions"))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid filename pattern '{pattern}': {source}")]
    #[diagnostic(code(specrun::config::filename_pattern))]
    InvalidFilenamePattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("{integration} is not available")]
    #[diagnostic(code(specrun::config::missing_dependency), help("{guidance}"))]
    MissingDependency { integration: String, guidance: String },
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not read options file {}: {source}", path.display())]
    OptionsFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl RunError {
    /// `help` text of the underlying diagnostic, if any.
    pub fn help(&self) -> Option<String> {
        match self {
            RunError::Config(error) => error.help().map(|h| h.to_string()),
            _ => None,
        }
    }
}
