use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use specrun_core::{
    ExampleContext, ExampleError, HookKind, HookScope, OutputStream, RunContext, SyncGuard, World, capture,
};

use crate::configuration::RunConfiguration;
use crate::errors::RunError;
use crate::formatters;
use crate::loader::{LoadError, SpecLoader};

/// Runs the selected examples in this process.
pub struct LocalExecutor {
    configuration: RunConfiguration,
    loader: Arc<dyn SpecLoader>,
}

impl LocalExecutor {
    pub fn new(configuration: RunConfiguration, loader: Arc<dyn SpecLoader>) -> Self {
        Self { configuration, loader }
    }

    pub fn configuration(&self) -> &RunConfiguration {
        &self.configuration
    }

    /// Load, run and report. Returns whether every example passed.
    ///
    /// The report goes to `out`, which is switched to synchronous mode for the duration of the run.
    /// A failing `before(:suite)` hook is written to `err` and no groups run.
    pub fn run(&self, err: &mut dyn Write, out: &mut dyn OutputStream) -> Result<bool, RunError> {
        let world = self.load()?;
        let config = &self.configuration;

        let mut filters = config.filters().clone();
        let mut total = world.total_examples_to_run(&filters);
        if total == 0 && config.run_all_when_everything_filtered() && filters.inclusion().is_some() {
            tracing::info!(inclusion = ?filters.inclusion(), "no examples matched the filter; running all examples");
            filters = filters.without_inclusion();
            total = world.total_examples_to_run(&filters);
        }

        let mut reporter = formatters::build(config.formatter(), config.formatter_options(), out);
        let mut reporter = SyncGuard::acquire(reporter.as_mut());

        reporter.start(total)?;
        let started = Instant::now();

        let mut success = run_suite_hooks(config, HookKind::Before, err)?;
        if success {
            let run = RunContext {
                hooks: config.hooks(),
                filters: &filters,
                mocks: config.mock_adapter(),
            };
            for group in world.example_groups_to_run(&filters) {
                success &= group.run(&run, &mut *reporter)?;
            }
        }
        success &= run_suite_hooks(config, HookKind::After, err)?;

        reporter.start_dump(started.elapsed())?;
        reporter.dump_failures()?;
        reporter.dump_summary()?;
        reporter.dump_pending()?;
        reporter.close()?;

        tracing::debug!(total, success, "local run finished");
        Ok(success)
    }

    fn load(&self) -> Result<World, RunError> {
        let mut world = World::new();
        let mut loaded = HashSet::new();
        for file in self.configuration.files_to_run() {
            if !loaded.insert(file.as_str()) {
                continue;
            }
            match self.loader.load(file, &mut world) {
                Ok(()) => {}
                Err(LoadError::Unregistered { path }) => {
                    tracing::warn!(%path, "no specs registered for file; skipping");
                }
                Err(error) => return Err(error.into()),
            }
        }
        Ok(world)
    }
}

/// Run every suite hook of `kind`. Failures are written to `err`.
fn run_suite_hooks(config: &RunConfiguration, kind: HookKind, err: &mut dyn Write) -> Result<bool, RunError> {
    let label = match kind {
        HookKind::Before => "before(:suite)",
        HookKind::After => "after(:suite)",
    };
    let mut context = ExampleContext::detached();
    let mut success = true;
    for hook in config.hooks().hooks(kind, HookScope::Suite) {
        match capture(|| hook(&mut context)) {
            Ok(()) => {}
            Err(ExampleError::Failure(failure)) => {
                writeln!(err, "{} hook failed: {}", label, failure.message)?;
                success = false;
            }
            Err(ExampleError::Pending(reason)) => {
                tracing::debug!(hook = label, %reason, "suite hook marked pending");
            }
        }
    }
    Ok(success)
}
