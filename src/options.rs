//! Command-line and options-file parsing.
//!
//! ## Model
//!
//! One argument source (the command line, or an options file) parses into one [`OptionSet`]. Every
//! field is optional so that a second source can fill the gaps of the first:
//!
//! - values present on the command line always win over the options file,
//! - `--drb` is enabled when either source sets it, and then forces `debug` off,
//! - an empty file list counts as absent.
//!
//! ## Remote argument vector
//!
//! Alongside the typed fields, the parser keeps the raw tokens of each option in the order they
//! appeared. [`OptionSet::to_remote_argv`] replays them without `--drb` and `--options`, so the remote
//! side re-parses exactly what the user typed. Short clusters are expanded (`-cp` replays as `-c -p`).
//! `--debug` is not replayed in remote mode, and options-file positionals are not replayed when the
//! command line names its own files.
//!
//! ## Notes
//!
//! - Parsing never panics on bad input: unknown flags and malformed values are a usage error.
//! - `--line_number` is kept as text here; it is coerced when applied to a configuration.

use std::fs;
use std::io;
use std::iter;
use std::path::{Path, PathBuf};

use clap::{Arg, CommandFactory, Parser};
use regex::Regex;

use crate::errors::{ConfigError, RunError};

/// Options file read when `--options` is given without a path, or not given at all.
pub const DEFAULT_OPTIONS_FILE: &str = "spec/spec.opts";

const BIN_NAME: &str = "specrun";

// ============================================================================
// Clap definition
// ============================================================================

/// Run example groups locally or on a running specrun server
#[derive(Parser, Debug)]
#[command(name = BIN_NAME)]
#[command(disable_version_flag = true, args_override_self = true)]
pub struct CommandLine {
    /// Enable colour in the output
    #[arg(short = 'c', long = "color", visible_alias = "colour", overrides_with = "no_color")]
    pub color: bool,

    /// Disable colour in the output
    #[arg(long = "no-color", overrides_with = "color")]
    pub no_color: bool,

    /// Output format: progress (default) or documentation
    #[arg(short = 'f', long = "formatter", value_name = "FORMATTER", num_args = 0..=1)]
    pub formatter: Option<Option<String>>,

    /// Report the ten slowest examples
    #[arg(short = 'p', long = "profile")]
    pub profile: bool,

    /// Run the example or group declared at this line
    #[arg(short = 'l', long = "line_number", value_name = "LINE")]
    pub line_number: Option<String>,

    /// Run examples whose full description matches this pattern
    #[arg(short = 'e', long = "example", value_name = "PATTERN")]
    pub example: Option<String>,

    /// Read additional options from a file
    #[arg(short = 'o', long = "options", value_name = "PATH", num_args = 0..=1, default_missing_value = DEFAULT_OPTIONS_FILE)]
    pub options: Option<PathBuf>,

    /// Print full backtraces
    #[arg(short = 'b', long = "backtrace")]
    pub backtrace: bool,

    /// Enable the debugger integration
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Run on a specrun server instead of in this process
    #[arg(short = 'X', long = "drb")]
    pub drb: bool,

    /// Port of the specrun server
    #[arg(long = "drb-port", value_name = "PORT")]
    pub drb_port: Option<u16>,

    /// Print the version and exit
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    /// Spec files or directories, optionally as `path:line`
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,
}

// ============================================================================
// Option set
// ============================================================================

/// The raw tokens of one option (flag plus value, if any) or one positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ArgSegment {
    id: Option<String>,
    tokens: Vec<String>,
}

/// The parsed result of one argument source.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    color_enabled: Option<bool>,
    formatter: Option<Option<String>>,
    profile_examples: Option<bool>,
    line_number: Option<String>,
    full_description: Option<Regex>,
    options_file: Option<PathBuf>,
    full_backtrace: Option<bool>,
    debug: Option<bool>,
    drb: bool,
    drb_port: Option<u16>,
    files_or_directories_to_run: Vec<String>,
    version: bool,
    segments: Vec<ArgSegment>,
}

impl OptionSet {
    /// Parse one argument source (without the program name).
    pub fn parse<I, T>(args: I) -> Result<Self, RunError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let cli = CommandLine::try_parse_from(iter::once(BIN_NAME.to_string()).chain(args.iter().cloned()))?;

        let full_description = match &cli.example {
            Some(pattern) => Some(Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?),
            None => None,
        };
        let color_enabled = if cli.color {
            Some(true)
        } else if cli.no_color {
            Some(false)
        } else {
            None
        };

        Ok(OptionSet {
            color_enabled,
            formatter: cli.formatter,
            profile_examples: cli.profile.then_some(true),
            line_number: cli.line_number,
            full_description,
            options_file: cli.options,
            full_backtrace: cli.backtrace.then_some(true),
            debug: if cli.drb { Some(false) } else { cli.debug.then_some(true) },
            drb: cli.drb,
            drb_port: cli.drb_port,
            files_or_directories_to_run: cli.files,
            version: cli.version,
            segments: segments(&args),
        })
    }

    pub fn color_enabled(&self) -> Option<bool> {
        self.color_enabled
    }

    /// `Some(None)` when `--formatter` was given without a name.
    pub fn formatter(&self) -> Option<Option<&str>> {
        self.formatter.as_ref().map(|f| f.as_deref())
    }

    pub fn profile_examples(&self) -> Option<bool> {
        self.profile_examples
    }

    pub fn line_number(&self) -> Option<&str> {
        self.line_number.as_deref()
    }

    pub fn full_description(&self) -> Option<&Regex> {
        self.full_description.as_ref()
    }

    pub fn options_file(&self) -> Option<&Path> {
        self.options_file.as_deref()
    }

    pub fn full_backtrace(&self) -> Option<bool> {
        self.full_backtrace
    }

    pub fn debug(&self) -> Option<bool> {
        self.debug
    }

    pub fn is_drb(&self) -> bool {
        self.drb
    }

    pub fn drb_port(&self) -> Option<u16> {
        self.drb_port
    }

    pub fn files_or_directories_to_run(&self) -> &[String] {
        &self.files_or_directories_to_run
    }

    pub fn is_version(&self) -> bool {
        self.version
    }

    /// Layer this (command-line) set over one parsed from an options file.
    pub fn merge(self, file: OptionSet) -> OptionSet {
        let drb = self.drb || file.drb;
        // Command-line files replace the file's list; its positionals (and `--`) are not replayed.
        let mut segments: Vec<ArgSegment> = if self.files_or_directories_to_run.is_empty() {
            file.segments
        } else {
            file.segments
                .into_iter()
                .filter(|s| matches!(s.id.as_deref(), Some(id) if id != "files"))
                .collect()
        };
        segments.extend(self.segments);
        OptionSet {
            color_enabled: self.color_enabled.or(file.color_enabled),
            formatter: self.formatter.or(file.formatter),
            profile_examples: self.profile_examples.or(file.profile_examples),
            line_number: self.line_number.or(file.line_number),
            full_description: self.full_description.or(file.full_description),
            options_file: self.options_file.or(file.options_file),
            full_backtrace: self.full_backtrace.or(file.full_backtrace),
            debug: if drb { Some(false) } else { self.debug.or(file.debug) },
            drb,
            drb_port: self.drb_port.or(file.drb_port),
            files_or_directories_to_run: if self.files_or_directories_to_run.is_empty() {
                file.files_or_directories_to_run
            } else {
                self.files_or_directories_to_run
            },
            version: self.version || file.version,
            segments,
        }
    }

    /// Merge with the options file named by `--options` (or the default one), if it exists.
    pub fn merge_with_file(self) -> Result<OptionSet, RunError> {
        let path = self
            .options_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OPTIONS_FILE));
        let args = read_options_file(&path)?;
        if args.is_empty() {
            return Ok(self);
        }
        tracing::debug!(path = %path.display(), ?args, "merging options file");
        let file = OptionSet::parse(args)?;
        Ok(self.merge(file))
    }

    /// Arguments to forward to a remote run: everything as given, minus `--drb` and `--options`.
    ///
    /// `--debug` is dropped too once `--drb` is set, since remote mode already turned it off.
    pub fn to_remote_argv(&self) -> Vec<String> {
        self.segments
            .iter()
            .filter(|s| match s.id.as_deref() {
                Some("drb") | Some("options") => false,
                Some("debug") => !self.drb,
                _ => true,
            })
            .flat_map(|s| s.tokens.iter().cloned())
            .collect()
    }
}

impl PartialEq for OptionSet {
    /// Compares the parsed values; the raw token record is not part of equality.
    fn eq(&self, other: &Self) -> bool {
        self.color_enabled == other.color_enabled
            && self.formatter == other.formatter
            && self.profile_examples == other.profile_examples
            && self.line_number == other.line_number
            && self.full_description.as_ref().map(Regex::as_str) == other.full_description.as_ref().map(Regex::as_str)
            && self.options_file == other.options_file
            && self.full_backtrace == other.full_backtrace
            && self.debug == other.debug
            && self.drb == other.drb
            && self.drb_port == other.drb_port
            && self.files_or_directories_to_run == other.files_or_directories_to_run
            && self.version == other.version
    }
}

/// Read an options file as whitespace-separated arguments. A missing file yields no arguments.
///
/// Lines starting with `#` are comments.
pub fn read_options_file(path: &Path) -> Result<Vec<String>, RunError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(RunError::OptionsFile {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect())
}

// ============================================================================
// Token segmentation
// ============================================================================

/// Split `args` into per-option segments using the clap definition.
///
/// Only called after clap accepted `args`, so every flag is known.
fn segments(args: &[String]) -> Vec<ArgSegment> {
    let mut command = CommandLine::command();
    command.build();
    let known: Vec<&Arg> = command.get_arguments().filter(|a| !a.is_positional()).collect();

    let mut out = Vec::new();
    let mut rest = args.iter().peekable();
    let mut positional_only = false;

    while let Some(token) = rest.next() {
        if positional_only || token == "-" || !token.starts_with('-') {
            out.push(ArgSegment {
                id: Some("files".to_string()),
                tokens: vec![token.clone()],
            });
            continue;
        }
        if token == "--" {
            positional_only = true;
            out.push(ArgSegment {
                id: None,
                tokens: vec![token.clone()],
            });
            continue;
        }

        if let Some(long) = token.strip_prefix("--") {
            let (name, inline) = match long.split_once('=') {
                Some((name, _)) => (name, true),
                None => (long, false),
            };
            let arg = known.iter().copied().find(|a| matches_long(a, name));
            let mut tokens = vec![token.clone()];
            if let Some(arg) = arg {
                if !inline {
                    take_value(arg, &mut rest, &mut tokens);
                }
            }
            out.push(ArgSegment {
                id: arg.map(|a| a.get_id().as_str().to_string()),
                tokens,
            });
            continue;
        }

        // Short cluster: `-cp`, `-fs`, `-l42`.
        let cluster = &token[1..];
        for (offset, short) in cluster.char_indices() {
            let arg = known.iter().copied().find(|a| matches_short(a, short));
            let mut tokens = vec![format!("-{}", short)];
            let attached = &cluster[offset + short.len_utf8()..];
            let takes_value = arg.is_some_and(|a| a.get_action().takes_values());
            if takes_value {
                if !attached.is_empty() {
                    tokens[0].push_str(attached);
                } else if let Some(arg) = arg {
                    take_value(arg, &mut rest, &mut tokens);
                }
            }
            out.push(ArgSegment {
                id: arg.map(|a| a.get_id().as_str().to_string()),
                tokens,
            });
            if takes_value {
                break;
            }
        }
    }
    out
}

fn matches_long(arg: &Arg, name: &str) -> bool {
    arg.get_long() == Some(name) || arg.get_all_aliases().is_some_and(|aliases| aliases.contains(&name))
}

fn matches_short(arg: &Arg, short: char) -> bool {
    arg.get_short() == Some(short) || arg.get_all_short_aliases().is_some_and(|aliases| aliases.contains(&short))
}

/// Move the value of `arg` from `rest` into `tokens` when the option takes one.
fn take_value<'a>(arg: &Arg, rest: &mut iter::Peekable<impl Iterator<Item = &'a String>>, tokens: &mut Vec<String>) {
    if !arg.get_action().takes_values() {
        return;
    }
    let required = arg.get_num_args().is_none_or(|range| range.min_values() > 0);
    if let Some(next) = rest.peek() {
        if required || !next.starts_with('-') {
            tokens.push(next.to_string());
            rest.next();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> OptionSet {
        OptionSet::parse(args.iter().copied()).unwrap()
    }

    #[test]
    fn test_color_flags() {
        assert_eq!(parse(&["-c"]).color_enabled(), Some(true));
        assert_eq!(parse(&["--color"]).color_enabled(), Some(true));
        assert_eq!(parse(&["--colour"]).color_enabled(), Some(true));
        assert_eq!(parse(&["--no-color"]).color_enabled(), Some(false));
        assert_eq!(parse(&[]).color_enabled(), None);
    }

    #[test]
    fn test_later_color_flag_wins() {
        assert_eq!(parse(&["--color", "--no-color"]).color_enabled(), Some(false));
        assert_eq!(parse(&["--no-color", "-c"]).color_enabled(), Some(true));
    }

    #[test]
    fn test_formatter_with_and_without_value() {
        assert_eq!(parse(&["-f"]).formatter(), Some(None));
        assert_eq!(parse(&["--formatter"]).formatter(), Some(None));
        assert_eq!(parse(&["-f", "d"]).formatter(), Some(Some("d")));
        assert_eq!(parse(&["--formatter=documentation"]).formatter(), Some(Some("documentation")));
        assert_eq!(parse(&[]).formatter(), None);
    }

    #[test]
    fn test_line_number_is_kept_as_text() {
        assert_eq!(parse(&["-l", "3"]).line_number(), Some("3"));
        assert_eq!(parse(&["--line_number", "abc"]).line_number(), Some("abc"));
    }

    #[test]
    fn test_example_is_compiled() {
        let options = parse(&["--example", "foo"]);
        assert_eq!(options.full_description().map(Regex::as_str), Some("foo"));
        assert!(OptionSet::parse(["-e", "("]).is_err());
    }

    #[test]
    fn test_options_flag_defaults_path() {
        assert_eq!(parse(&["-o"]).options_file(), Some(Path::new(DEFAULT_OPTIONS_FILE)));
        assert_eq!(parse(&["--options", "custom.opts"]).options_file(), Some(Path::new("custom.opts")));
        assert_eq!(parse(&[]).options_file(), None);
    }

    #[test]
    fn test_drb_forces_debug_off_in_either_order() {
        assert_eq!(parse(&["--debug"]).debug(), Some(true));
        assert_eq!(parse(&["-d", "-X"]).debug(), Some(false));
        assert_eq!(parse(&["--drb", "--debug"]).debug(), Some(false));
        assert!(parse(&["-X"]).is_drb());
    }

    #[test]
    fn test_drb_port_and_version() {
        assert_eq!(parse(&["--drb-port", "1234"]).drb_port(), Some(1234));
        assert!(parse(&["-v"]).is_version());
        assert!(parse(&["--version"]).is_version());
        assert!(!parse(&[]).is_version());
    }

    #[test]
    fn test_unknown_flag_is_usage_error() {
        assert!(matches!(OptionSet::parse(["--bogus"]), Err(RunError::Usage(_))));
        assert!(matches!(OptionSet::parse(["--drb-port", "x"]), Err(RunError::Usage(_))));
    }

    #[test]
    fn test_remote_argv_drops_drb() {
        let options = parse(&[
            "--drb", "--colour", "--formatter", "s", "--line_number", "1", "--example", "pattern", "--profile",
            "--backtrace",
        ]);
        assert_eq!(
            options.to_remote_argv(),
            vec!["--colour", "--formatter", "s", "--line_number", "1", "--example", "pattern", "--profile", "--backtrace"]
        );
    }

    #[test]
    fn test_remote_argv_drops_options_and_value() {
        let options = parse(&["--drb", "--options", "my_spec.opts", "-f", "s", "spec/a_spec.rs"]);
        assert_eq!(options.to_remote_argv(), vec!["-f", "s", "spec/a_spec.rs"]);
    }

    #[test]
    fn test_remote_argv_expands_short_clusters() {
        let options = parse(&["-Xcp", "-fs"]);
        assert!(options.is_drb());
        assert_eq!(options.formatter(), Some(Some("s")));
        assert_eq!(options.to_remote_argv(), vec!["-c", "-p", "-fs"]);
    }

    #[test]
    fn test_merge_prefers_command_line() {
        let cli = parse(&["-f", "progress", "spec/a_spec.rs"]);
        let file = parse(&["-f", "documentation", "--colour", "spec/b_spec.rs"]);
        let merged = cli.merge(file);
        assert_eq!(merged.formatter(), Some(Some("progress")));
        assert_eq!(merged.color_enabled(), Some(true));
        assert_eq!(merged.files_or_directories_to_run(), ["spec/a_spec.rs"]);
    }

    #[test]
    fn test_merge_drb_from_file_disables_debug() {
        let merged = parse(&["--debug"]).merge(parse(&["--drb", "--colour"]));
        assert!(merged.is_drb());
        assert_eq!(merged.debug(), Some(false));
        assert_eq!(merged.to_remote_argv(), vec!["--colour"]);
    }

    #[test]
    fn test_remote_argv_drops_debug_in_remote_mode() {
        let options = parse(&["-d", "-X", "-p"]);
        assert_eq!(options.debug(), Some(false));
        assert_eq!(options.to_remote_argv(), vec!["-p"]);
        assert_eq!(parse(&["-Xdc"]).to_remote_argv(), vec!["-c"]);
    }

    #[test]
    fn test_merge_drops_file_list_replaced_by_command_line() {
        let merged = parse(&["--drb", "spec/a_spec.rs"]).merge(parse(&["spec/b_spec.rs", "--colour"]));
        assert_eq!(merged.files_or_directories_to_run(), ["spec/a_spec.rs"]);
        assert_eq!(merged.to_remote_argv(), vec!["--colour", "spec/a_spec.rs"]);

        let kept = parse(&["--drb", "-c"]).merge(parse(&["spec/b_spec.rs"]));
        assert_eq!(kept.to_remote_argv(), vec!["spec/b_spec.rs", "-c"]);
    }

    // ------------------------------------------------------------------------
    // Remote argv through a real options file
    // ------------------------------------------------------------------------

    fn options_file(contents: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.opts");
        fs::write(&path, contents).unwrap();
        let path = path.to_string_lossy().into_owned();
        (dir, path)
    }

    fn merged(args: &[&str]) -> OptionSet {
        parse(args).merge_with_file().unwrap()
    }

    #[test]
    fn test_drb_in_options_file() {
        let (_dir, path) = options_file("--drb\n--colour\n");
        let options = merged(&["-o", path.as_str(), "-f", "s", "spec/a_spec.rs"]);
        assert!(options.is_drb());
        assert_eq!(options.to_remote_argv(), vec!["--colour", "-f", "s", "spec/a_spec.rs"]);
    }

    #[test]
    fn test_drb_in_options_file_and_command_line() {
        let (_dir, path) = options_file("--drb -p");
        let options = merged(&["--drb", "-o", path.as_str(), "spec/a_spec.rs"]);
        assert!(options.is_drb());
        assert_eq!(options.to_remote_argv(), vec!["-p", "spec/a_spec.rs"]);
    }

    #[test]
    fn test_drb_with_options_file_on_command_line() {
        let (_dir, path) = options_file("spec/b_spec.rs\n--profile\n");
        let options = merged(&["--drb", "--options", path.as_str(), "-c"]);
        let argv = options.to_remote_argv();
        assert_eq!(argv, vec!["spec/b_spec.rs", "--profile", "-c"]);
        assert_eq!(OptionSet::parse(argv).unwrap().files_or_directories_to_run(), ["spec/b_spec.rs"]);
    }

    #[test]
    fn test_command_line_files_replace_options_file_files() {
        let (_dir, path) = options_file("spec/b_spec.rs --colour");
        let options = merged(&["--drb", "-o", path.as_str(), "spec/a_spec.rs"]);
        assert_eq!(options.files_or_directories_to_run(), ["spec/a_spec.rs"]);
        let remote = OptionSet::parse(options.to_remote_argv()).unwrap();
        assert_eq!(remote.files_or_directories_to_run(), ["spec/a_spec.rs"]);
        assert_eq!(remote.color_enabled(), Some(true));
    }

    #[test]
    fn test_debug_in_options_file_is_turned_off_by_drb() {
        let (_dir, path) = options_file("--debug\n");
        let options = merged(&["--drb", "-o", path.as_str()]);
        assert_eq!(options.debug(), Some(false));
        assert!(options.to_remote_argv().is_empty());
    }
}
