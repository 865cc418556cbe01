//! Reporter and output-stream contracts.
//!
//! ## Reporter
//!
//! A run drives its reporter in a fixed order: `start(total)`, then per group/example notifications
//! while groups run, then `start_dump(elapsed)`, `dump_failures`, `dump_summary`, `dump_pending` and
//! `close`. The coordinator never looks inside a reporter except for its output stream, which it
//! switches to synchronous writes for the duration of the run (see [`SyncGuard`]).
//!
//! ## Output streams
//!
//! [`OutputStream`] is a `Write` that may support a synchronous mode (every write flushed at once).
//! Streams without such a mode report `None` from [`OutputStream::sync`] and are left alone.

use std::io::{self, Write};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use crate::failure::Failure;

// ============================================================================
// Output streams
// ============================================================================

pub trait OutputStream: Write {
    /// Current synchronous mode, or `None` when the stream does not support one.
    fn sync(&self) -> Option<bool> {
        None
    }

    fn set_sync(&mut self, _sync: bool) {}
}

impl OutputStream for Vec<u8> {}

impl OutputStream for io::Sink {}

impl OutputStream for io::Cursor<Vec<u8>> {}

const SYNC_WRITER_CAPACITY: usize = 8 * 1024;

/// Buffered writer whose buffering can be switched off.
///
/// In synchronous mode every write goes straight to the inner writer and is flushed.
pub struct SyncWriter<W: Write> {
    inner: W,
    buffer: Vec<u8>,
    sync: bool,
}

impl<W: Write> SyncWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(SYNC_WRITER_CAPACITY),
            sync: false,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    fn flush_buffer(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            self.inner.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }
}

impl<W: Write> Write for SyncWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.sync {
            self.flush_buffer()?;
            self.inner.write_all(buf)?;
            self.inner.flush()?;
        } else {
            self.buffer.extend_from_slice(buf);
            if self.buffer.len() >= SYNC_WRITER_CAPACITY {
                self.flush_buffer()?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buffer()?;
        self.inner.flush()
    }
}

impl<W: Write> OutputStream for SyncWriter<W> {
    fn sync(&self) -> Option<bool> {
        Some(self.sync)
    }

    fn set_sync(&mut self, sync: bool) {
        if sync && !self.sync {
            // Ignored here; a failing stream fails again on the next write.
            let _ = self.flush();
        }
        self.sync = sync;
    }
}

impl<W: Write> Drop for SyncWriter<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

// ============================================================================
// Reports
// ============================================================================

/// A group about to run its examples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub description: String,
    /// Nesting level, 0 for top-level groups.
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExampleStatus {
    Passed,
    Failed(Failure),
    Pending(String),
}

/// A finished example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleReport {
    pub description: String,
    pub full_description: String,
    /// `path:line` of the declaration.
    pub location: String,
    pub depth: usize,
    pub status: ExampleStatus,
    pub run_time: Duration,
}

impl ExampleReport {
    pub fn passed(&self) -> bool {
        matches!(self.status, ExampleStatus::Passed)
    }
}

// ============================================================================
// Reporter
// ============================================================================

pub trait Reporter {
    /// The stream the reporter writes to.
    fn output(&mut self) -> &mut dyn OutputStream;

    /// Called once before any group runs.
    fn start(&mut self, example_count: usize) -> io::Result<()>;

    fn example_group_started(&mut self, _group: &GroupReport) -> io::Result<()> {
        Ok(())
    }

    fn example_finished(&mut self, example: &ExampleReport) -> io::Result<()>;

    /// Called once after every group ran, with the elapsed wall-clock time.
    fn start_dump(&mut self, duration: Duration) -> io::Result<()>;

    fn dump_failures(&mut self) -> io::Result<()>;

    fn dump_summary(&mut self) -> io::Result<()>;

    fn dump_pending(&mut self) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;
}

/// Holds a reporter's output in synchronous mode and restores the previous mode on drop.
pub struct SyncGuard<'r, 'a> {
    reporter: &'r mut (dyn Reporter + 'a),
    previous: Option<bool>,
}

impl<'r, 'a> SyncGuard<'r, 'a> {
    pub fn acquire(reporter: &'r mut (dyn Reporter + 'a)) -> Self {
        let previous = reporter.output().sync();
        if previous.is_some() {
            reporter.output().set_sync(true);
        }
        Self { reporter, previous }
    }
}

impl<'a> Deref for SyncGuard<'_, 'a> {
    type Target = dyn Reporter + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.reporter
    }
}

impl DerefMut for SyncGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.reporter
    }
}

impl Drop for SyncGuard<'_, '_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous {
            self.reporter.output().set_sync(previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullReporter<'a> {
        out: &'a mut dyn OutputStream,
    }

    impl Reporter for NullReporter<'_> {
        fn output(&mut self) -> &mut dyn OutputStream {
            &mut *self.out
        }

        fn start(&mut self, _example_count: usize) -> io::Result<()> {
            Ok(())
        }

        fn example_finished(&mut self, _example: &ExampleReport) -> io::Result<()> {
            Ok(())
        }

        fn start_dump(&mut self, _duration: Duration) -> io::Result<()> {
            Ok(())
        }

        fn dump_failures(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn dump_summary(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn dump_pending(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sync_writer_buffers_until_flush() {
        let mut writer = SyncWriter::new(Vec::new());
        writer.write_all(b"abc").unwrap();
        assert!(writer.get_ref().is_empty());
        writer.flush().unwrap();
        assert_eq!(writer.get_ref(), b"abc");
    }

    #[test]
    fn test_sync_writer_writes_through_in_sync_mode() {
        let mut writer = SyncWriter::new(Vec::new());
        writer.write_all(b"a").unwrap();
        writer.set_sync(true);
        assert_eq!(writer.get_ref(), b"a");
        writer.write_all(b"b").unwrap();
        assert_eq!(writer.get_ref(), b"ab");
    }

    #[test]
    fn test_sync_guard_restores_previous_mode() {
        let mut out = SyncWriter::new(Vec::new());
        {
            let mut reporter = NullReporter { out: &mut out };
            let mut guard = SyncGuard::acquire(&mut reporter);
            assert_eq!(guard.output().sync(), Some(true));
        }
        assert_eq!(out.sync(), Some(false));
    }

    #[test]
    fn test_sync_guard_restores_on_unwind() {
        let mut out = SyncWriter::new(Vec::new());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut reporter = NullReporter { out: &mut out };
            let _guard = SyncGuard::acquire(&mut reporter);
            panic!("group blew up");
        }));
        assert!(result.is_err());
        assert_eq!(out.sync(), Some(false));
    }

    #[test]
    fn test_sync_guard_leaves_plain_streams_alone() {
        let mut out: Vec<u8> = Vec::new();
        let mut reporter = NullReporter { out: &mut out };
        let mut guard = SyncGuard::acquire(&mut reporter);
        assert_eq!(guard.output().sync(), None);
    }
}
