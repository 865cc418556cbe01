//! Loading spec files into a [`World`].
//!
//! Spec files are Rust code compiled into the program that runs them, so "loading a file" means
//! looking up the groups registered for that path. [`SpecCatalog`] is the built-in loader: a table of
//! group builders keyed by path.

use std::fmt;
use std::sync::Arc;

use specrun_core::{ExampleGroup, World};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// Nothing is registered under the path. Runs skip such files with a warning.
    #[error("no specs registered for {path}")]
    Unregistered { path: String },

    #[error("could not load {path}: {message}")]
    Failed { path: String, message: String },
}

pub trait SpecLoader: Send + Sync {
    /// Register the groups declared in `path` with `world`.
    fn load(&self, path: &str, world: &mut World) -> Result<(), LoadError>;
}

type GroupBuilder = Arc<dyn Fn() -> Vec<ExampleGroup> + Send + Sync>;

/// Maps spec file paths to the groups they declare.
///
/// A path matches an entry when it is equal to the registered path or ends with it, so
/// `./spec/stack_spec.rs` and `/work/spec/stack_spec.rs` both load `spec/stack_spec.rs`.
#[derive(Clone, Default)]
pub struct SpecCatalog {
    entries: Vec<(String, GroupBuilder)>,
}

impl SpecCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the groups built by `build` under `path`. Builders run on every load, so each run
    /// gets fresh groups.
    pub fn register<F>(&mut self, path: impl Into<String>, build: F)
    where
        F: Fn() -> Vec<ExampleGroup> + Send + Sync + 'static,
    {
        self.entries.push((path.into(), Arc::new(build)));
    }

    pub fn with<F>(mut self, path: impl Into<String>, build: F) -> Self
    where
        F: Fn() -> Vec<ExampleGroup> + Send + Sync + 'static,
    {
        self.register(path, build);
        self
    }

    /// Registered paths, in registration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }

    fn find(&self, path: &str) -> Option<&GroupBuilder> {
        let path = path.strip_prefix("./").unwrap_or(path);
        self.entries
            .iter()
            .find(|(registered, _)| path == registered || path.ends_with(&format!("/{}", registered)))
            .map(|(_, build)| build)
    }
}

impl SpecLoader for SpecCatalog {
    fn load(&self, path: &str, world: &mut World) -> Result<(), LoadError> {
        let build = self.find(path).ok_or_else(|| LoadError::Unregistered { path: path.to_string() })?;
        for mut group in build() {
            group.set_file(path);
            world.register(group);
        }
        Ok(())
    }
}

impl fmt::Debug for SpecCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecCatalog")
            .field("paths", &self.paths().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SpecCatalog {
        SpecCatalog::new().with("spec/stack_spec.rs", || {
            vec![ExampleGroup::describe("Stack").it("pushes", |_| Ok(()))]
        })
    }

    #[test]
    fn test_load_registers_groups_with_file() {
        let mut world = World::new();
        catalog().load("spec/stack_spec.rs", &mut world).unwrap();
        assert_eq!(world.groups().len(), 1);
        assert_eq!(world.groups()[0].file(), Some("spec/stack_spec.rs"));
    }

    #[test]
    fn test_load_matches_path_suffix() {
        let mut world = World::new();
        catalog().load("./spec/stack_spec.rs", &mut world).unwrap();
        catalog().load("/work/project/spec/stack_spec.rs", &mut world).unwrap();
        assert_eq!(world.groups().len(), 2);
    }

    #[test]
    fn test_unregistered_path_is_an_error() {
        let mut world = World::new();
        let error = catalog().load("spec/queue_spec.rs", &mut world).unwrap_err();
        assert_eq!(error.to_string(), "no specs registered for spec/queue_spec.rs");
        assert!(catalog().load("spec/other_stack_spec.rs", &mut world).is_err());
    }
}
