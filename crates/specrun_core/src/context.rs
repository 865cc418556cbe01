//! Per-example execution context.
//!
//! Every example body and hook receives an [`ExampleContext`]. It carries the example's identity,
//! the instance state hooks set up, the capabilities provided by the enclosing group chain and the
//! mock adapter selected for the run.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::failure::{ExampleError, ExampleResult};
use crate::metadata::Metadata;
use crate::mocking::{MockAdapter, NoMocking};
use crate::requirements::{Capabilities, MissingCapability};

pub struct ExampleContext {
    description: String,
    full_description: String,
    metadata: Metadata,
    state: HashMap<String, Arc<dyn Any + Send + Sync>>,
    capabilities: Capabilities,
    mocks: Arc<dyn MockAdapter>,
}

impl ExampleContext {
    pub(crate) fn new(
        description: String,
        full_description: String,
        metadata: Metadata,
        capabilities: Capabilities,
        mocks: Arc<dyn MockAdapter>,
    ) -> Self {
        Self {
            description,
            full_description,
            metadata,
            state: HashMap::new(),
            capabilities,
            mocks,
        }
    }

    /// A context not tied to any example (suite hooks, tests).
    pub fn detached() -> Self {
        Self::new(
            String::new(),
            String::new(),
            Metadata::new(),
            Capabilities::default(),
            Arc::new(NoMocking),
        )
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn full_description(&self) -> &str {
        &self.full_description
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Store an instance variable.
    pub fn set<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.state.insert(name.into(), Arc::new(value));
    }

    /// Read an instance variable of type `T`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.state.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.state.contains_key(name)
    }

    /// Resolve an instance method, falling back to a class method of the same name.
    pub fn call(&self, name: &str) -> Result<&str, MissingCapability> {
        self.capabilities
            .instance_method(name)
            .or_else(|| self.capabilities.class_method(name))
            .ok_or_else(|| MissingCapability::Undefined { name: name.to_string() })
    }

    pub fn class_method(&self, name: &str) -> Result<&str, MissingCapability> {
        self.capabilities
            .class_method(name)
            .ok_or_else(|| MissingCapability::Undefined { name: name.to_string() })
    }

    pub fn mocks(&self) -> &dyn MockAdapter {
        self.mocks.as_ref()
    }

    /// Mark the running example as pending.
    pub fn pending(&self, reason: impl Into<String>) -> ExampleResult {
        Err(ExampleError::Pending(reason.into()))
    }

    pub(crate) fn inherit_state(&mut self, other: &ExampleContext) {
        for (name, value) in &other.state {
            self.state.entry(name.clone()).or_insert_with(|| Arc::clone(value));
        }
    }
}

impl fmt::Debug for ExampleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.state.keys().collect();
        names.sort();
        f.debug_struct("ExampleContext")
            .field("full_description", &self.full_description)
            .field("state", &names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_typed() {
        let mut ctx = ExampleContext::detached();
        ctx.set("@count", 3usize);
        assert_eq!(ctx.get::<usize>("@count"), Some(&3));
        assert_eq!(ctx.get::<String>("@count"), None);
        assert!(ctx.is_set("@count"));
        assert!(!ctx.is_set("@other"));
    }

    #[test]
    fn test_call_falls_back_to_class_method() {
        let mut caps = Capabilities::default();
        caps.provide_instance_method("host", "instance");
        caps.provide_class_method("kind", "class");
        let ctx = ExampleContext::new(String::new(), String::new(), Metadata::new(), caps, Arc::new(NoMocking));
        assert_eq!(ctx.call("host"), Ok("instance"));
        assert_eq!(ctx.call("kind"), Ok("class"));
        assert!(ctx.call("nothing").is_err());
        assert!(ctx.class_method("host").is_err());
    }

    #[test]
    fn test_inherit_state_keeps_own_values() {
        let mut parent = ExampleContext::detached();
        parent.set("@a", 1i32);
        parent.set("@b", 2i32);
        let mut child = ExampleContext::detached();
        child.set("@b", 20i32);
        child.inherit_state(&parent);
        assert_eq!(child.get::<i32>("@a"), Some(&1));
        assert_eq!(child.get::<i32>("@b"), Some(&20));
    }
}
