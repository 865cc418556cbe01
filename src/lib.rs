#![forbid(unsafe_code)]
//! specrun: a spec-style test-run coordinator.
//!
//! Given command-line arguments this crate decides what to run and how: it parses and merges options
//! (command line over an options file), applies them to a per-run configuration, and then either prints
//! the version, forwards the run to a long-lived server over TCP, or loads the selected spec files and
//! runs their example groups in-process with a progress or documentation report.
//!
//! The test-world vocabulary (groups, hooks, filters, reporters) lives in `specrun_core`.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Example bodies**: panics raised by spec code are caught per example and reported as failures; they never
//!   abort a run.

pub mod cli;
pub mod configuration;
pub mod errors;
pub mod formatters;
pub mod loader;
pub mod options;
pub mod remote;
pub mod runner;
pub mod version;

pub use configuration::RunConfiguration;
pub use errors::{ConfigError, RunError};
pub use formatters::{FormatterKind, FormatterOptions};
pub use loader::{LoadError, SpecCatalog, SpecLoader};
pub use options::OptionSet;
pub use runner::{Execution, LocalExecutor, RemoteProxyExecutor, Runner};
pub use specrun_core;
