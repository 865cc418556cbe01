//! State and end-of-run dumps shared by the built-in formatters.

use std::io::{self, Write};
use std::time::Duration;

use specrun_core::{ExampleReport, ExampleStatus, Failure, OutputStream};

use super::FormatterOptions;

const GREEN: &str = "32";
const RED: &str = "31";
const YELLOW: &str = "33";

const SLOWEST_EXAMPLES: usize = 10;

pub(super) struct BaseFormatter<'o> {
    pub(super) out: &'o mut dyn OutputStream,
    options: FormatterOptions,
    examples: Vec<ExampleReport>,
    failure_count: usize,
    pending_count: usize,
    duration: Duration,
}

impl<'o> BaseFormatter<'o> {
    pub(super) fn new(options: FormatterOptions, out: &'o mut dyn OutputStream) -> Self {
        Self {
            out,
            options,
            examples: Vec::new(),
            failure_count: 0,
            pending_count: 0,
            duration: Duration::ZERO,
        }
    }

    /// Keep `example` for the dumps. Returns its failure number when it failed.
    pub(super) fn record(&mut self, example: &ExampleReport) -> Option<usize> {
        let number = match example.status {
            ExampleStatus::Passed => None,
            ExampleStatus::Failed(_) => {
                self.failure_count += 1;
                Some(self.failure_count)
            }
            ExampleStatus::Pending(_) => {
                self.pending_count += 1;
                None
            }
        };
        self.examples.push(example.clone());
        number
    }

    pub(super) fn colour(&self, text: &str, code: &str) -> String {
        if self.options.color {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    pub(super) fn green(&self, text: &str) -> String {
        self.colour(text, GREEN)
    }

    pub(super) fn red(&self, text: &str) -> String {
        self.colour(text, RED)
    }

    pub(super) fn yellow(&self, text: &str) -> String {
        self.colour(text, YELLOW)
    }

    pub(super) fn start_dump(&mut self, duration: Duration) -> io::Result<()> {
        self.duration = duration;
        writeln!(self.out)?;
        if self.options.profile {
            self.dump_profile()?;
        }
        Ok(())
    }

    fn dump_profile(&mut self) -> io::Result<()> {
        let mut slowest: Vec<&ExampleReport> = self.examples.iter().collect();
        slowest.sort_by(|a, b| b.run_time.cmp(&a.run_time));
        slowest.truncate(SLOWEST_EXAMPLES);

        writeln!(self.out, "\nTop {} slowest examples:", slowest.len())?;
        for example in slowest {
            writeln!(
                self.out,
                "{:.7} seconds {}",
                example.run_time.as_secs_f64(),
                example.full_description
            )?;
        }
        Ok(())
    }

    pub(super) fn dump_failures(&mut self) -> io::Result<()> {
        let failures: Vec<(&ExampleReport, &Failure)> = self
            .examples
            .iter()
            .filter_map(|e| match &e.status {
                ExampleStatus::Failed(failure) => Some((e, failure)),
                _ => None,
            })
            .collect();

        let mut text = String::new();
        for (index, (example, failure)) in failures.into_iter().enumerate() {
            text.push_str(&format!("\n{})\n", index + 1));
            text.push_str(&self.red(&format!("'{}' FAILED", example.full_description)));
            text.push('\n');
            text.push_str(&self.red(&failure.message));
            text.push('\n');
            for line in self.clean_backtrace(&failure.backtrace) {
                text.push_str(line);
                text.push('\n');
            }
            text.push_str(&format!("# {}\n", example.location));
        }
        self.out.write_all(text.as_bytes())
    }

    pub(super) fn dump_summary(&mut self) -> io::Result<()> {
        let mut summary = format!(
            "{}, {}",
            pluralize(self.examples.len(), "example"),
            pluralize(self.failure_count, "failure")
        );
        if self.pending_count > 0 {
            summary.push_str(&format!(", {} pending", self.pending_count));
        }
        let summary = if self.failure_count > 0 {
            self.red(&summary)
        } else if self.pending_count > 0 {
            self.yellow(&summary)
        } else {
            self.green(&summary)
        };
        writeln!(self.out, "\nFinished in {} seconds\n", format_seconds(self.duration))?;
        writeln!(self.out, "{}", summary)
    }

    pub(super) fn dump_pending(&mut self) -> io::Result<()> {
        if self.pending_count == 0 {
            return Ok(());
        }
        let mut text = String::from("\nPending:\n");
        for example in &self.examples {
            if let ExampleStatus::Pending(reason) = &example.status {
                text.push_str(&self.yellow(&format!("{} ({})", example.full_description, reason)));
                text.push_str(&format!("\n  # {}\n", example.location));
            }
        }
        self.out.write_all(text.as_bytes())
    }

    pub(super) fn close(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn clean_backtrace<'b>(&self, backtrace: &'b [String]) -> impl Iterator<Item = &'b str> {
        let patterns = self.options.backtrace_clean_patterns.clone();
        backtrace
            .iter()
            .map(String::as_str)
            .filter(move |line| !patterns.iter().any(|p| p.is_match(line)))
    }
}

fn pluralize(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

/// Seconds with trailing zeros trimmed: `0.5`, `1.25`, `3`.
fn format_seconds(duration: Duration) -> String {
    let text = format!("{:.5}", duration.as_secs_f64());
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(0, "failure"), "0 failures");
        assert_eq!(pluralize(1, "example"), "1 example");
        assert_eq!(pluralize(2, "example"), "2 examples");
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(Duration::from_millis(500)), "0.5");
        assert_eq!(format_seconds(Duration::from_millis(1250)), "1.25");
        assert_eq!(format_seconds(Duration::from_secs(3)), "3");
        assert_eq!(format_seconds(Duration::ZERO), "0");
    }

    #[test]
    fn test_colour_only_when_enabled() {
        let mut out: Vec<u8> = Vec::new();
        let plain = BaseFormatter::new(FormatterOptions::default(), &mut out);
        assert_eq!(plain.green("ok"), "ok");
        drop(plain);

        let options = FormatterOptions {
            color: true,
            ..FormatterOptions::default()
        };
        let coloured = BaseFormatter::new(options, &mut out);
        assert_eq!(coloured.red("F"), "\x1b[31mF\x1b[0m");
        assert_eq!(coloured.yellow("*"), "\x1b[33m*\x1b[0m");
    }
}
