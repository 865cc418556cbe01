//! Per-run configuration.
//!
//! A [`RunConfiguration`] is built fresh for every run, customised by the embedding program (hooks,
//! filename pattern, mock framework), then has the parsed [`OptionSet`] applied to it.
//!
//! ## Files to run
//!
//! - A directory expands to every file matching the filename pattern below it. The pattern is a
//!   comma-separated list; each sub-pattern is globbed in list order and the matches are appended
//!   as found, so a file matching two sub-patterns is listed twice.
//! - `path:line` runs the example (or group) declared at `line` of `path`. The line feeds the
//!   inclusion filter, where the first line-number filter of a run wins.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use specrun_core::{
    ExampleContext, ExampleResult, Filter, FilterSet, HookRegistry, HookScope, MockAdapter, MockFramework, NoMocking,
};

use crate::errors::ConfigError;
use crate::formatters::{FormatterKind, FormatterOptions};
use crate::options::OptionSet;

pub const DEFAULT_FILENAME_PATTERN: &str = "**/*_spec.rs";

/// Backtrace frames from the standard library, the runner itself and its dependencies.
const DEFAULT_BACKTRACE_CLEAN_PATTERNS: &[&str] = &[
    r"^\d+: (std|core|alloc)::",
    r"/rustc/[0-9a-f]+/",
    r"specrun_core::",
    r"^\d+: specrun::",
    r"__rust_",
    r"\.cargo/registry/",
];

pub struct RunConfiguration {
    filters: FilterSet,
    hooks: HookRegistry,
    formatter: FormatterKind,
    color_enabled: bool,
    profile_examples: bool,
    debug: bool,
    filename_pattern: String,
    backtrace_clean_patterns: Vec<Regex>,
    run_all_when_everything_filtered: bool,
    mock_framework: MockFramework,
    mock_adapters: HashMap<MockFramework, Arc<dyn MockAdapter>>,
    files_to_run: Vec<String>,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl RunConfiguration {
    pub fn new() -> Self {
        Self {
            filters: FilterSet::new(),
            hooks: HookRegistry::new(),
            formatter: FormatterKind::default(),
            color_enabled: false,
            profile_examples: false,
            debug: false,
            filename_pattern: DEFAULT_FILENAME_PATTERN.to_string(),
            backtrace_clean_patterns: DEFAULT_BACKTRACE_CLEAN_PATTERNS
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
            run_all_when_everything_filtered: false,
            mock_framework: MockFramework::default(),
            mock_adapters: HashMap::new(),
            files_to_run: Vec::new(),
        }
    }

    // ========================================================================
    // Applying options
    // ========================================================================

    /// Apply a parsed (and merged) option set.
    ///
    /// `--line_number` and `--example` are applied before the file list, so they win over a line
    /// given as `path:line`.
    pub fn apply(&mut self, options: &OptionSet) -> Result<(), ConfigError> {
        if let Some(color) = options.color_enabled() {
            self.set_color_enabled(color);
        }
        if let Some(Some(name)) = options.formatter() {
            self.set_formatter(name)?;
        }
        if let Some(profile) = options.profile_examples() {
            self.set_profile_examples(profile);
        }
        if let Some(full) = options.full_backtrace() {
            self.set_full_backtrace(full);
        }
        if let Some(debug) = options.debug() {
            self.set_debug(debug)?;
        }
        if let Some(line) = options.line_number() {
            self.set_line_number(line)?;
        }
        if let Some(pattern) = options.full_description() {
            self.set_full_description(pattern.clone());
        }
        if !options.files_or_directories_to_run().is_empty() {
            self.set_files_or_directories_to_run(options.files_or_directories_to_run())?;
        }
        Ok(())
    }

    // ========================================================================
    // Filters and hooks
    // ========================================================================

    pub fn filter_run(&mut self, criteria: Filter) {
        self.filters.filter_run(criteria);
    }

    pub fn filter_run_excluding(&mut self, criteria: Filter) {
        self.filters.filter_run_excluding(criteria);
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn before<F>(&mut self, scope: HookScope, criteria: Filter, body: F)
    where
        F: Fn(&mut ExampleContext) -> ExampleResult + Send + Sync + 'static,
    {
        self.hooks.before(scope, criteria, body);
    }

    pub fn after<F>(&mut self, scope: HookScope, criteria: Filter, body: F)
    where
        F: Fn(&mut ExampleContext) -> ExampleResult + Send + Sync + 'static,
    {
        self.hooks.after(scope, criteria, body);
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn set_line_number(&mut self, line: &str) -> Result<(), ConfigError> {
        let line = line
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidLineNumber { value: line.to_string() })?;
        self.filter_run(Filter::line_number(line));
        Ok(())
    }

    pub fn set_full_description(&mut self, pattern: Regex) {
        self.filter_run(Filter::full_description(pattern));
    }

    pub fn run_all_when_everything_filtered(&self) -> bool {
        self.run_all_when_everything_filtered
    }

    /// Run the whole world when the inclusion filter selects nothing.
    pub fn set_run_all_when_everything_filtered(&mut self, run_all: bool) {
        self.run_all_when_everything_filtered = run_all;
    }

    // ========================================================================
    // Files
    // ========================================================================

    pub fn filename_pattern(&self) -> &str {
        &self.filename_pattern
    }

    pub fn set_filename_pattern(&mut self, pattern: impl Into<String>) {
        self.filename_pattern = pattern.into();
    }

    pub fn files_to_run(&self) -> &[String] {
        &self.files_to_run
    }

    /// Resolve files, directories and `path:line` arguments into the list of files to load.
    pub fn set_files_or_directories_to_run(&mut self, entries: &[String]) -> Result<(), ConfigError> {
        let mut files = Vec::new();
        for entry in entries {
            if Path::new(entry).is_dir() {
                self.expand_directory(entry, &mut files)?;
            } else if let Some((path, line)) = split_line_number(entry) {
                self.filter_run(Filter::line_number(line));
                files.push(path.to_string());
            } else {
                files.push(entry.clone());
            }
        }
        self.files_to_run = files;
        Ok(())
    }

    fn expand_directory(&self, directory: &str, files: &mut Vec<String>) -> Result<(), ConfigError> {
        let directory = directory.trim_end_matches('/');
        for pattern in self.filename_pattern.split(',') {
            let full = format!("{}/{}", directory, pattern.trim());
            let paths = glob::glob(&full).map_err(|source| ConfigError::InvalidFilenamePattern {
                pattern: full.clone(),
                source,
            })?;
            for path in paths {
                match path {
                    Ok(path) => {
                        tracing::trace!(path = %path.display(), pattern = %full, "expanded spec file");
                        files.push(path.to_string_lossy().into_owned());
                    }
                    Err(error) => tracing::warn!(%error, "skipping unreadable path"),
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Presentation
    // ========================================================================

    pub fn formatter(&self) -> FormatterKind {
        self.formatter
    }

    pub fn set_formatter(&mut self, name: &str) -> Result<(), ConfigError> {
        self.formatter = FormatterKind::from_name(name)?;
        Ok(())
    }

    pub fn color_enabled(&self) -> bool {
        self.color_enabled
    }

    pub fn set_color_enabled(&mut self, color: bool) {
        self.color_enabled = color;
    }

    pub fn profile_examples(&self) -> bool {
        self.profile_examples
    }

    pub fn set_profile_examples(&mut self, profile: bool) {
        self.profile_examples = profile;
    }

    pub fn backtrace_clean_patterns(&self) -> &[Regex] {
        &self.backtrace_clean_patterns
    }

    /// Full backtraces: nothing is cleaned from failure backtraces.
    pub fn set_full_backtrace(&mut self, full: bool) {
        if full {
            self.backtrace_clean_patterns.clear();
        }
    }

    pub fn formatter_options(&self) -> FormatterOptions {
        FormatterOptions {
            color: self.color_enabled,
            profile: self.profile_examples,
            backtrace_clean_patterns: self.backtrace_clean_patterns.clone(),
        }
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Turn on the debugger integration.
    ///
    /// Only available when built with the `debugger` feature; it then also turns on full
    /// backtraces.
    pub fn set_debug(&mut self, debug: bool) -> Result<(), ConfigError> {
        if !debug {
            self.debug = false;
            return Ok(());
        }
        if cfg!(feature = "debugger") {
            self.debug = true;
            self.set_full_backtrace(true);
            Ok(())
        } else {
            Err(ConfigError::MissingDependency {
                integration: "the debugger integration".to_string(),
                guidance: "rebuild specrun with `--features debugger` to run with --debug".to_string(),
            })
        }
    }

    // ========================================================================
    // Mocking
    // ========================================================================

    pub fn mock_framework(&self) -> MockFramework {
        self.mock_framework
    }

    /// Select the mock framework by name (case-insensitive substring match).
    pub fn set_mock_framework(&mut self, name: &str) {
        self.mock_framework = MockFramework::select(name);
        tracing::debug!(requested = name, selected = %self.mock_framework, "selected mock framework");
    }

    /// Provide the adapter used when `framework` is selected.
    pub fn register_mock_adapter(&mut self, framework: MockFramework, adapter: Arc<dyn MockAdapter>) {
        self.mock_adapters.insert(framework, adapter);
    }

    /// Adapter for the selected framework; the no-op adapter when none was registered.
    pub fn mock_adapter(&self) -> Arc<dyn MockAdapter> {
        match self.mock_adapters.get(&self.mock_framework) {
            Some(adapter) => Arc::clone(adapter),
            None => Arc::new(NoMocking),
        }
    }
}

/// Split `path:line` when the suffix after the last `:` is a line number.
pub fn split_line_number(entry: &str) -> Option<(&str, u32)> {
    let (path, line) = entry.rsplit_once(':')?;
    let line = line.parse::<u32>().ok()?;
    if path.is_empty() {
        return None;
    }
    Some((path, line))
}
