use std::io::{self, Write};
use std::time::Duration;

use specrun_core::{ExampleReport, ExampleStatus, OutputStream, Reporter};

use super::FormatterOptions;
use super::base::BaseFormatter;

/// One character per example.
pub struct ProgressFormatter<'o> {
    base: BaseFormatter<'o>,
}

impl<'o> ProgressFormatter<'o> {
    pub fn new(options: FormatterOptions, out: &'o mut dyn OutputStream) -> Self {
        Self {
            base: BaseFormatter::new(options, out),
        }
    }
}

impl Reporter for ProgressFormatter<'_> {
    fn output(&mut self) -> &mut dyn OutputStream {
        &mut *self.base.out
    }

    fn start(&mut self, _example_count: usize) -> io::Result<()> {
        Ok(())
    }

    fn example_finished(&mut self, example: &ExampleReport) -> io::Result<()> {
        self.base.record(example);
        let mark = match example.status {
            ExampleStatus::Passed => self.base.green("."),
            ExampleStatus::Failed(_) => self.base.red("F"),
            ExampleStatus::Pending(_) => self.base.yellow("*"),
        };
        write!(self.base.out, "{}", mark)
    }

    fn start_dump(&mut self, duration: Duration) -> io::Result<()> {
        self.base.start_dump(duration)
    }

    fn dump_failures(&mut self) -> io::Result<()> {
        self.base.dump_failures()
    }

    fn dump_summary(&mut self) -> io::Result<()> {
        self.base.dump_summary()
    }

    fn dump_pending(&mut self) -> io::Result<()> {
        self.base.dump_pending()
    }

    fn close(&mut self) -> io::Result<()> {
        self.base.close()
    }
}
