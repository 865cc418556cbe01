//! Built-in reporters.
//!
//! ## Formatters
//!
//! - `progress` (default) - one character per example: `.` passed, `F` failed, `*` pending
//! - `documentation` - the nested group and example descriptions, one per line
//!
//! Both share the end-of-run dumps in [`base`]: numbered failures with cleaned backtraces, the
//! `Finished in` line, the example/failure/pending counts, the pending list and, when profiling,
//! the ten slowest examples.

mod base;
mod documentation;
mod progress;

use std::fmt;

use regex::Regex;
use specrun_core::{OutputStream, Reporter};

use crate::errors::ConfigError;

pub use documentation::DocumentationFormatter;
pub use progress::ProgressFormatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatterKind {
    #[default]
    Progress,
    Documentation,
}

impl FormatterKind {
    /// Resolve a `--formatter` value. Any name containing `doc`, as well as `s` and `n`, selects
    /// the documentation formatter.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        if name.contains("doc") || name == "s" || name == "n" {
            Ok(FormatterKind::Documentation)
        } else if name == "progress" {
            Ok(FormatterKind::Progress)
        } else {
            Err(ConfigError::UnknownFormatter { name: name.to_string() })
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FormatterKind::Progress => "progress",
            FormatterKind::Documentation => "documentation",
        }
    }
}

impl fmt::Display for FormatterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Presentation settings shared by the built-in formatters.
#[derive(Debug, Clone, Default)]
pub struct FormatterOptions {
    pub color: bool,
    pub profile: bool,
    /// Backtrace lines matching any of these are left out of failure dumps.
    pub backtrace_clean_patterns: Vec<Regex>,
}

/// Build the reporter for `kind`, writing to `out`.
pub fn build<'o>(kind: FormatterKind, options: FormatterOptions, out: &'o mut dyn OutputStream) -> Box<dyn Reporter + 'o> {
    match kind {
        FormatterKind::Progress => Box::new(ProgressFormatter::new(options, out)),
        FormatterKind::Documentation => Box::new(DocumentationFormatter::new(options, out)),
    }
}
