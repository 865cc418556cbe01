use std::io::{self, Write};
use std::time::Duration;

use specrun_core::{ExampleReport, ExampleStatus, GroupReport, OutputStream, Reporter};

use super::FormatterOptions;
use super::base::BaseFormatter;

/// Group and example descriptions, indented by nesting.
pub struct DocumentationFormatter<'o> {
    base: BaseFormatter<'o>,
}

impl<'o> DocumentationFormatter<'o> {
    pub fn new(options: FormatterOptions, out: &'o mut dyn OutputStream) -> Self {
        Self {
            base: BaseFormatter::new(options, out),
        }
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

impl Reporter for DocumentationFormatter<'_> {
    fn output(&mut self) -> &mut dyn OutputStream {
        &mut *self.base.out
    }

    fn start(&mut self, _example_count: usize) -> io::Result<()> {
        Ok(())
    }

    fn example_group_started(&mut self, group: &GroupReport) -> io::Result<()> {
        if group.depth == 0 {
            writeln!(self.base.out)?;
        }
        writeln!(self.base.out, "{}{}", indent(group.depth), group.description)
    }

    fn example_finished(&mut self, example: &ExampleReport) -> io::Result<()> {
        let failure_number = self.base.record(example);
        let line = match (&example.status, failure_number) {
            (ExampleStatus::Failed(_), Some(number)) => {
                self.base.red(&format!("{} (FAILED - {})", example.description, number))
            }
            (ExampleStatus::Pending(reason), _) => {
                self.base.yellow(&format!("{} (PENDING: {})", example.description, reason))
            }
            _ => self.base.green(&example.description),
        };
        writeln!(self.base.out, "{}{}", indent(example.depth), line)
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
