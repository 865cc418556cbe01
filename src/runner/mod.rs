//! Choosing and running an execution strategy.
//!
//! ## Dispatch
//!
//! After the command line is parsed and merged with the options file:
//!
//! 1. `--version` prints the version and succeeds without loading anything,
//! 2. `--drb` forwards the run to a server ([`RemoteProxyExecutor`]),
//! 3. anything else runs in this process ([`LocalExecutor`]).
//!
//! Every call to [`Runner::run`] builds a fresh [`RunConfiguration`] and a fresh world, so a
//! long-lived server can reuse one `Runner` for many runs.

mod local;
mod remote;

use std::env;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use specrun_core::OutputStream;

use crate::configuration::RunConfiguration;
use crate::errors::RunError;
use crate::loader::SpecLoader;
use crate::options::OptionSet;
use crate::version::SPECRUN_VERSION;

pub use local::LocalExecutor;
pub use remote::{DEFAULT_DRB_HOST, DEFAULT_DRB_PORT, DRB_PORT_ENV, RemoteError, RemoteProxyExecutor, resolve_drb_port};

pub type Configure = Arc<dyn Fn(&mut RunConfiguration) + Send + Sync>;

/// What a parsed option set asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    Version,
    Remote { argv: Vec<String>, port: u16 },
    Local,
}

impl Execution {
    /// `env_port` is the value of the remote-port environment variable, if set.
    pub fn select(options: &OptionSet, env_port: Option<&str>) -> Execution {
        if options.is_version() {
            Execution::Version
        } else if options.is_drb() {
            Execution::Remote {
                argv: options.to_remote_argv(),
                port: resolve_drb_port(options.drb_port(), env_port),
            }
        } else {
            Execution::Local
        }
    }
}

#[derive(Clone)]
pub struct Runner {
    loader: Arc<dyn SpecLoader>,
    configure: Option<Configure>,
}

impl Runner {
    pub fn new(loader: Arc<dyn SpecLoader>) -> Self {
        Self { loader, configure: None }
    }

    /// Customise every run's configuration (hooks, filename pattern, mock framework, ...) before
    /// command-line options are applied.
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: Fn(&mut RunConfiguration) + Send + Sync + 'static,
    {
        self.configure = Some(Arc::new(configure));
        self
    }

    /// Run with `args` (without the program name). Returns the verdict.
    pub fn run(&self, args: &[String], err: &mut dyn Write, out: &mut dyn OutputStream) -> Result<bool, RunError> {
        let options = OptionSet::parse(args.iter().cloned())?.merge_with_file()?;
        let env_port = env::var(DRB_PORT_ENV).ok();
        let execution = Execution::select(&options, env_port.as_deref());
        tracing::debug!(?execution, "dispatching run");

        match execution {
            Execution::Version => {
                writeln!(out, "specrun {}", SPECRUN_VERSION)?;
                Ok(true)
            }
            Execution::Remote { argv, port } => Ok(RemoteProxyExecutor::new(argv, port).run(err, out)),
            Execution::Local => {
                let mut configuration = RunConfiguration::new();
                if let Some(configure) = &self.configure {
                    configure(&mut configuration);
                }
                configuration.apply(&options)?;
                LocalExecutor::new(configuration, Arc::clone(&self.loader)).run(err, out)
            }
        }
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("configured", &self.configure.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(args: &[&str], env_port: Option<&str>) -> Execution {
        Execution::select(&OptionSet::parse(args.iter().copied()).unwrap(), env_port)
    }

    #[test]
    fn test_version_wins() {
        assert_eq!(select(&["--version", "--drb"], None), Execution::Version);
    }

    #[test]
    fn test_drb_selects_remote() {
        assert_eq!(
            select(&["--drb", "-c", "spec/a_spec.rs"], None),
            Execution::Remote {
                argv: vec!["-c".to_string(), "spec/a_spec.rs".to_string()],
                port: DEFAULT_DRB_PORT,
            }
        );
    }

    #[test]
    fn test_port_precedence() {
        assert!(matches!(
            select(&["--drb", "--drb-port", "1234"], Some("4321")),
            Execution::Remote { port: 1234, .. }
        ));
        assert!(matches!(select(&["--drb"], Some("4321")), Execution::Remote { port: 4321, .. }));
        assert!(matches!(
            select(&["--drb"], Some("not a port")),
            Execution::Remote { port: DEFAULT_DRB_PORT, .. }
        ));
    }

    #[test]
    fn test_default_is_local() {
        assert_eq!(select(&["spec/a_spec.rs"], None), Execution::Local);
    }
}
