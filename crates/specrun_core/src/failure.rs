//! Example outcomes other than success.
//!
//! Example bodies and hooks return [`ExampleResult`]. Assertion panics raised inside them are
//! caught by [`capture`] and turned into a [`Failure`], so a failing example never unwinds past the
//! group that runs it.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::requirements::MissingCapability;

/// A failed expectation, with the backtrace captured where it was raised (when capture is enabled).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    pub backtrace: Vec<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        let backtrace = Backtrace::capture();
        let backtrace = match backtrace.status() {
            BacktraceStatus::Captured => backtrace
                .to_string()
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
            _ => Vec::new(),
        };
        Self { message: message.into(), backtrace }
    }

    /// A failure whose backtrace is already known (for failures shipped from elsewhere).
    pub fn with_backtrace(message: impl Into<String>, backtrace: Vec<String>) -> Self {
        Self {
            message: message.into(),
            backtrace,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<MissingCapability> for Failure {
    fn from(missing: MissingCapability) -> Self {
        Failure::new(missing.to_string())
    }
}

/// Why an example did not pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExampleError {
    Failure(Failure),
    Pending(String),
}

impl From<Failure> for ExampleError {
    fn from(failure: Failure) -> Self {
        ExampleError::Failure(failure)
    }
}

impl From<MissingCapability> for ExampleError {
    fn from(missing: MissingCapability) -> Self {
        ExampleError::Failure(missing.into())
    }
}

pub type ExampleResult = Result<(), ExampleError>;

/// Fail the current example with `message`.
pub fn fail(message: impl Into<String>) -> ExampleResult {
    Err(ExampleError::Failure(Failure::new(message)))
}

/// Run `body`, turning a panic into a [`Failure`].
pub fn capture<F>(body: F) -> ExampleResult
where
    F: FnOnce() -> ExampleResult,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => Err(ExampleError::Failure(Failure::new(panic_message(payload.as_ref())))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "example panicked".to_string()
    }
}
