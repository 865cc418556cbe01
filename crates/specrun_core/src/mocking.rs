//! Mock-framework strategy.
//!
//! The framework is chosen once per run by name and the resulting adapter is handed to every example
//! through its [`ExampleContext`](crate::ExampleContext). Adapters themselves are supplied by the
//! embedding program; the only built-in one is [`NoMocking`].

use std::fmt;

use crate::failure::Failure;

/// The closed set of mock frameworks a run can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MockFramework {
    Rspec,
    Mocha,
    Rr,
    Flexmock,
    #[default]
    Nothing,
}

impl MockFramework {
    /// Select by case-insensitive substring, checked in declaration order. Unknown names select
    /// [`MockFramework::Nothing`].
    pub fn select(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("rspec") {
            MockFramework::Rspec
        } else if name.contains("mocha") {
            MockFramework::Mocha
        } else if name.contains("rr") {
            MockFramework::Rr
        } else if name.contains("flexmock") {
            MockFramework::Flexmock
        } else {
            MockFramework::Nothing
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MockFramework::Rspec => "rspec",
            MockFramework::Mocha => "mocha",
            MockFramework::Rr => "rr",
            MockFramework::Flexmock => "flexmock",
            MockFramework::Nothing => "nothing",
        }
    }
}

impl fmt::Display for MockFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Lifecycle calls a mock framework needs around each example.
pub trait MockAdapter: Send + Sync {
    fn setup(&self) {}

    /// Check expectations recorded during the example.
    fn verify(&self) -> Result<(), Failure> {
        Ok(())
    }

    fn teardown(&self) {}
}

/// Adapter used when no framework is selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMocking;

impl MockAdapter for NoMocking {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_is_case_insensitive() {
        assert_eq!(MockFramework::select("RSpec"), MockFramework::Rspec);
        assert_eq!(MockFramework::select("Mocha"), MockFramework::Mocha);
        assert_eq!(MockFramework::select("rr"), MockFramework::Rr);
        assert_eq!(MockFramework::select("FlexMock"), MockFramework::Flexmock);
    }

    #[test]
    fn test_select_matches_substrings() {
        assert_eq!(MockFramework::select("rspec-mocks"), MockFramework::Rspec);
        assert_eq!(MockFramework::select("with_mocha"), MockFramework::Mocha);
    }

    #[test]
    fn test_unknown_selects_nothing() {
        assert_eq!(MockFramework::select("jest"), MockFramework::Nothing);
        assert_eq!(MockFramework::select(""), MockFramework::Nothing);
    }

    #[test]
    fn test_no_mocking_verifies() {
        assert!(NoMocking.verify().is_ok());
    }
}
