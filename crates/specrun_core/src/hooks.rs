//! Before/after hooks bucketed by scope.
//!
//! Entries are only ever appended. Resolution returns matching bodies in registration order; it never
//! reorders by how close the matching tag was in the group chain.

use std::fmt;
use std::sync::Arc;

use crate::context::ExampleContext;
use crate::failure::ExampleResult;
use crate::filter::{Filter, FilterSubject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Before,
    After,
}

/// What a hook wraps: each example, all examples of a group, or the whole suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HookScope {
    #[default]
    Each,
    All,
    Suite,
}

pub type Hook = Arc<dyn Fn(&mut ExampleContext) -> ExampleResult + Send + Sync>;

#[derive(Clone)]
pub struct HookEntry {
    pub kind: HookKind,
    pub scope: HookScope,
    pub filter: Filter,
    pub body: Hook,
}

impl fmt::Debug for HookEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookEntry")
            .field("kind", &self.kind)
            .field("scope", &self.scope)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    entries: Vec<HookEntry>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before<F>(&mut self, scope: HookScope, filter: Filter, body: F)
    where
        F: Fn(&mut ExampleContext) -> ExampleResult + Send + Sync + 'static,
    {
        self.register(HookKind::Before, scope, filter, Arc::new(body));
    }

    pub fn after<F>(&mut self, scope: HookScope, filter: Filter, body: F)
    where
        F: Fn(&mut ExampleContext) -> ExampleResult + Send + Sync + 'static,
    {
        self.register(HookKind::After, scope, filter, Arc::new(body));
    }

    pub fn register(&mut self, kind: HookKind, scope: HookScope, filter: Filter, body: Hook) {
        self.entries.push(HookEntry {
            kind,
            scope,
            filter,
            body,
        });
    }

    /// Bodies of every `kind`/`scope` hook whose filter is satisfied by `subject`, in registration order.
    pub fn find_hook(&self, kind: HookKind, scope: HookScope, subject: &dyn FilterSubject) -> Vec<Hook> {
        self.entries
            .iter()
            .filter(|e| e.kind == kind && e.scope == scope && e.filter.applies_to(subject))
            .map(|e| Arc::clone(&e.body))
            .collect()
    }

    /// Bodies of every `kind`/`scope` hook regardless of filters.
    pub fn hooks(&self, kind: HookKind, scope: HookScope) -> impl Iterator<Item = &Hook> {
        self.entries
            .iter()
            .filter(move |e| e.kind == kind && e.scope == scope)
            .map(|e| &e.body)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
