//! Command-line entry point for specrun.
//!
//! ## Design
//!
//! [`execute`] returns `CliResult<ExitCode>` instead of calling `process::exit`.
//! Only the top-level [`run_with`] handles errors and exits.
//!
//! ## Exit codes
//!
//! - `0` when the run passed (or `--version`/`--help` was printed),
//! - `1` when an example failed, the remote server was unreachable or configuration was rejected,
//! - `2` for command-line usage errors.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::env;
use std::fmt;
use std::io;
use std::process;
use std::sync::Arc;

use clap::error::ErrorKind;
use specrun_core::SyncWriter;

use crate::errors::RunError;
use crate::loader::SpecCatalog;
use crate::runner::Runner;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);

    pub fn from_verdict(success: bool) -> Self {
        if success { Self::SUCCESS } else { Self::FAILURE }
    }
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create an error with a custom exit code.
    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self::new(message, ExitCode(code))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<RunError> for CliError {
    fn from(error: RunError) -> Self {
        match error {
            RunError::Usage(usage) => CliError::with_code(usage.render().to_string(), usage.exit_code()),
            other => {
                let mut message = other.to_string();
                if let Some(help) = other.help() {
                    message.push_str(&format!("\n  help: {}", help));
                }
                CliError::failure(message)
            }
        }
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Entry points
// ============================================================================

/// Run with the process arguments and no registered specs, then exit.
pub fn run() {
    run_with(&Runner::new(Arc::new(SpecCatalog::new())))
}

/// Run `runner` with the process arguments, then exit with the verdict.
///
/// Programs that compile their specs in build a [`Runner`] over their own loader and call this.
pub fn run_with(runner: &Runner) {
    let args: Vec<String> = env::args().skip(1).collect();
    match execute(runner, &args) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message.trim_end());
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Run `args` against stdout/stderr and map the verdict to an exit code.
pub fn execute(runner: &Runner, args: &[String]) -> CliResult<ExitCode> {
    let stdout = io::stdout();
    let mut out = SyncWriter::new(stdout.lock());
    let mut err = io::stderr();
    match runner.run(args, &mut err, &mut out) {
        Ok(success) => Ok(ExitCode::from_verdict(success)),
        Err(RunError::Usage(usage)) if matches!(usage.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{}", usage.render());
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            tracing::debug!(%error, "run aborted");
            Err(error.into())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::errors::ConfigError;
    use crate::options::OptionSet;

    #[test]
    fn test_exit_code_from_verdict() {
        assert_eq!(ExitCode::from_verdict(true), ExitCode::SUCCESS);
        assert_eq!(ExitCode::from_verdict(false), ExitCode::FAILURE);
    }

    #[test]
    fn test_usage_error_keeps_clap_exit_code() {
        let error = OptionSet::parse(["--bogus"]).unwrap_err();
        let cli_error = CliError::from(error);
        assert_eq!(cli_error.exit_code, ExitCode(2));
        assert!(cli_error.message.contains("--bogus"));
    }

    #[test]
    fn test_config_error_includes_help() {
        let error = RunError::Config(ConfigError::UnknownFormatter {
            name: "xml".to_string(),
        });
        let cli_error = CliError::from(error);
        assert_eq!(cli_error.exit_code, ExitCode::FAILURE);
        assert!(cli_error.message.starts_with("Formatter 'xml' unknown"));
    }
}
