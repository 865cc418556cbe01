//! Example groups, examples and how a group runs.
//!
//! ## Run order
//!
//! For one group, with `config` meaning hooks registered on the run's [`HookRegistry`]:
//!
//! 1. config `before(:all)` matching the group chain, then the group's own `before(:all)`
//! 2. for each selected example:
//!    capability check, config `before(:each)`, own `before(:each)` of every group outer to inner,
//!    instance-variable check, body, own `after(:each)` inner to outer, config `after(:each)`,
//!    mock verify and teardown, report
//! 3. nested groups
//! 4. own `after(:all)`, then config `after(:all)`
//!
//! A failing `before(:all)` fails every selected example of the subtree without running it. State
//! stored by `before(:all)` hooks is copied into every example context of the subtree.
//!
//! ## Notes
//!
//! - Panics inside bodies and hooks are caught per call; nothing unwinds out of [`ExampleGroup::run`].
//! - `after` hooks always run, even when a `before` hook or the body failed. The first error wins.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use crate::context::ExampleContext;
use crate::failure::{ExampleError, ExampleResult, capture};
use crate::filter::{FilterSet, FilterSubject};
use crate::hooks::{Hook, HookKind, HookRegistry, HookScope};
use crate::metadata::{Metadata, MetadataValue};
use crate::mocking::MockAdapter;
use crate::reporter::{ExampleReport, ExampleStatus, GroupReport, Reporter};
use crate::requirements::{Capabilities, Requirement};

/// Pending message for an example declared without a body.
pub const NOT_YET_IMPLEMENTED: &str = "Not Yet Implemented";

// ============================================================================
// Descriptions
// ============================================================================

pub type DescriptionFn = Arc<dyn Fn(&Capabilities) -> String + Send + Sync>;

/// An example description, either fixed or built from the capabilities of the group chain.
#[derive(Clone)]
pub enum Description {
    Static(String),
    Dynamic(DescriptionFn),
}

impl Description {
    pub fn resolve(&self, capabilities: &Capabilities) -> String {
        match self {
            Description::Static(text) => text.clone(),
            Description::Dynamic(build) => build(capabilities),
        }
    }
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Description::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Description::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for Description {
    fn from(text: &str) -> Self {
        Description::Static(text.to_string())
    }
}

impl From<String> for Description {
    fn from(text: String) -> Self {
        Description::Static(text)
    }
}

// ============================================================================
// Examples
// ============================================================================

#[derive(Clone)]
pub struct Example {
    description: Description,
    line: u32,
    metadata: Metadata,
    body: Option<Hook>,
}

impl Example {
    pub fn new(description: impl Into<Description>) -> Self {
        Self {
            description: description.into(),
            line: 0,
            metadata: Metadata::new(),
            body: None,
        }
    }

    /// An example whose description is computed from the group chain (e.g. from a class method
    /// a shared group expects its host to provide).
    pub fn described_by<F>(build: F) -> Self
    where
        F: Fn(&Capabilities) -> String + Send + Sync + 'static,
    {
        Self::new(Description::Dynamic(Arc::new(build)))
    }

    pub fn at(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn tag(mut self, name: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(name, value);
        self
    }

    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut ExampleContext) -> ExampleResult + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn is_pending(&self) -> bool {
        self.body.is_none()
    }
}

impl fmt::Debug for Example {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Example")
            .field("description", &self.description)
            .field("line", &self.line)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Groups
// ============================================================================

#[derive(Clone, Default)]
pub struct ExampleGroup {
    description: String,
    file: Option<String>,
    line: u32,
    metadata: Metadata,
    examples: Vec<Example>,
    children: Vec<ExampleGroup>,
    before_each: Vec<Hook>,
    after_each: Vec<Hook>,
    before_all: Vec<Hook>,
    after_all: Vec<Hook>,
    requirements: Vec<Requirement>,
    capabilities: Capabilities,
}

impl ExampleGroup {
    pub fn describe(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn tag(mut self, name: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(name, value);
        self
    }

    pub fn example(mut self, example: Example) -> Self {
        self.examples.push(example);
        self
    }

    pub fn it<F>(self, description: impl Into<Description>, body: F) -> Self
    where
        F: Fn(&mut ExampleContext) -> ExampleResult + Send + Sync + 'static,
    {
        self.example(Example::new(description).body(body))
    }

    /// An example with no body; it is reported as pending.
    pub fn pending(self, description: impl Into<Description>) -> Self {
        self.example(Example::new(description))
    }

    pub fn child(mut self, group: ExampleGroup) -> Self {
        self.children.push(group);
        self
    }

    pub fn before_each<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ExampleContext) -> ExampleResult + Send + Sync + 'static,
    {
        self.before_each.push(Arc::new(hook));
        self
    }

    pub fn after_each<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ExampleContext) -> ExampleResult + Send + Sync + 'static,
    {
        self.after_each.push(Arc::new(hook));
        self
    }

    pub fn before_all<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ExampleContext) -> ExampleResult + Send + Sync + 'static,
    {
        self.before_all.push(Arc::new(hook));
        self
    }

    pub fn after_all<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ExampleContext) -> ExampleResult + Send + Sync + 'static,
    {
        self.after_all.push(Arc::new(hook));
        self
    }

    pub fn require_instance_method(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.requirements.push(Requirement::InstanceMethod {
            name: name.into(),
            description: description.into(),
        });
        self
    }

    pub fn require_instance_variable(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.requirements.push(Requirement::InstanceVariable {
            name: name.into(),
            description: description.into(),
        });
        self
    }

    pub fn require_class_method(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.requirements.push(Requirement::ClassMethod {
            name: name.into(),
            description: description.into(),
        });
        self
    }

    pub fn provide_instance_method(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.capabilities.provide_instance_method(name, value);
        self
    }

    pub fn provide_class_method(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.capabilities.provide_class_method(name, value);
        self
    }

    /// Record the file this group (and everything nested in it) was declared in.
    pub fn set_file(&mut self, file: &str) {
        self.file = Some(file.to_string());
        for child in &mut self.children {
            child.set_file(file);
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn children(&self) -> &[ExampleGroup] {
        &self.children
    }

    /// Number of examples in this subtree selected by `filters`.
    pub fn count_selected(&self, filters: &FilterSet) -> usize {
        self.count_selected_in(&GroupChain::root(self), filters)
    }

    pub fn has_selected(&self, filters: &FilterSet) -> bool {
        self.count_selected(filters) > 0
    }

    fn count_selected_in(&self, chain: &GroupChain<'_>, filters: &FilterSet) -> usize {
        let own = self
            .examples
            .iter()
            .filter(|example| filters.selects(&ExampleSubject::new(chain, example)))
            .count();
        let nested: usize = self
            .children
            .iter()
            .map(|child| child.count_selected_in(&chain.push(child), filters))
            .sum();
        own + nested
    }

    /// Run the selected examples of this group and its nested groups.
    ///
    /// Returns `Ok(false)` when any example or `after(:all)` hook failed; `Err` only when the
    /// reporter could not write.
    pub fn run(&self, run: &RunContext<'_>, reporter: &mut dyn Reporter) -> io::Result<bool> {
        self.run_in(&GroupChain::root(self), None, None, run, reporter)
    }

    fn run_in<'g>(
        &'g self,
        chain: &GroupChain<'g>,
        parent: Option<&ExampleContext>,
        blocked: Option<&ExampleError>,
        run: &RunContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> io::Result<bool> {
        if self.count_selected_in(chain, run.filters) == 0 {
            return Ok(true);
        }
        reporter.example_group_started(&GroupReport {
            description: self.description.clone(),
            depth: chain.depth() - 1,
        })?;
        tracing::trace!(group = %chain.full_description(), "running group");

        let capabilities = chain.capabilities();
        let mut group_ctx = ExampleContext::new(
            self.description.clone(),
            chain.full_description(),
            self.metadata.clone(),
            capabilities.clone(),
            Arc::clone(&run.mocks),
        );
        if let Some(parent) = parent {
            group_ctx.inherit_state(parent);
        }

        let mut blocked = blocked.cloned();
        if blocked.is_none() {
            let config = run.hooks.find_hook(HookKind::Before, HookScope::All, chain);
            blocked = run_hooks(config.iter().chain(&self.before_all), &mut group_ctx).err();
        }

        let mut success = true;
        for example in &self.examples {
            let subject = ExampleSubject::new(chain, example);
            if !run.filters.selects(&subject) {
                continue;
            }
            let report = self.run_example(chain, example, &subject, &group_ctx, blocked.as_ref(), run);
            success &= !matches!(report.status, ExampleStatus::Failed(_));
            reporter.example_finished(&report)?;
        }

        for child in &self.children {
            success &= child.run_in(&chain.push(child), Some(&group_ctx), blocked.as_ref(), run, reporter)?;
        }

        let config = run.hooks.find_hook(HookKind::After, HookScope::All, chain);
        let mut after_all = Ok(());
        for hook in self.after_all.iter().chain(&config) {
            let result = capture(|| hook(&mut group_ctx));
            if after_all.is_ok() {
                after_all = result;
            }
        }
        if let Err(ExampleError::Failure(failure)) = after_all {
            success = false;
            reporter.example_finished(&ExampleReport {
                description: "after(:all)".to_string(),
                full_description: format!("{} after(:all)", chain.full_description()),
                location: self.location(self.line),
                depth: chain.depth(),
                status: ExampleStatus::Failed(failure),
                run_time: Default::default(),
            })?;
        }

        Ok(success)
    }

    fn run_example(
        &self,
        chain: &GroupChain<'_>,
        example: &Example,
        subject: &ExampleSubject,
        group_ctx: &ExampleContext,
        blocked: Option<&ExampleError>,
        run: &RunContext<'_>,
    ) -> ExampleReport {
        let started = Instant::now();
        let mut ctx = ExampleContext::new(
            subject.description.clone(),
            subject.full_description.clone(),
            example.metadata.clone(),
            chain.capabilities(),
            Arc::clone(&run.mocks),
        );
        ctx.inherit_state(group_ctx);

        let outcome = match blocked {
            Some(error) => Err(error.clone()),
            None => execute(chain, example, &mut ctx, run),
        };
        let status = match outcome {
            Ok(()) => ExampleStatus::Passed,
            Err(ExampleError::Failure(failure)) => ExampleStatus::Failed(failure),
            Err(ExampleError::Pending(reason)) => ExampleStatus::Pending(reason),
        };

        ExampleReport {
            description: subject.description.clone(),
            full_description: subject.full_description.clone(),
            location: self.location(example.line),
            depth: chain.depth(),
            status,
            run_time: started.elapsed(),
        }
    }

    fn location(&self, line: u32) -> String {
        format!("{}:{}", self.file.as_deref().unwrap_or("-"), line)
    }
}

impl fmt::Debug for ExampleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExampleGroup")
            .field("description", &self.description)
            .field("file", &self.file)
            .field("line", &self.line)
            .field("metadata", &self.metadata)
            .field("examples", &self.examples)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Run `hooks` in order, stopping at the first error.
fn run_hooks<'h>(hooks: impl IntoIterator<Item = &'h Hook>, ctx: &mut ExampleContext) -> ExampleResult {
    for hook in hooks {
        capture(|| hook(ctx))?;
    }
    Ok(())
}

fn execute(chain: &GroupChain<'_>, example: &Example, ctx: &mut ExampleContext, run: &RunContext<'_>) -> ExampleResult {
    let capabilities = chain.capabilities();
    for requirement in chain.requirements() {
        let met = match requirement {
            Requirement::InstanceMethod { name, .. } => capabilities.instance_method(name).is_some(),
            Requirement::ClassMethod { name, .. } => capabilities.class_method(name).is_some(),
            Requirement::InstanceVariable { .. } => true,
        };
        if !met {
            return Err(requirement.missing().into());
        }
    }

    let Some(body) = &example.body else {
        return Err(ExampleError::Pending(NOT_YET_IMPLEMENTED.to_string()));
    };

    run.mocks.setup();

    let config_before = run.hooks.find_hook(HookKind::Before, HookScope::Each, chain);
    let own_before = chain.groups.iter().flat_map(|g| g.before_each.iter());
    let mut result = run_hooks(config_before.iter().chain(own_before), ctx);

    if result.is_ok() {
        result = check_instance_variables(chain, ctx);
    }
    if result.is_ok() {
        result = capture(|| body(ctx));
    }

    let own_after = chain.groups.iter().rev().flat_map(|g| g.after_each.iter());
    let config_after = run.hooks.find_hook(HookKind::After, HookScope::Each, chain);
    for hook in own_after.chain(&config_after) {
        let after = capture(|| hook(ctx));
        if result.is_ok() {
            result = after;
        }
    }

    if result.is_ok() {
        if let Err(failure) = run.mocks.verify() {
            result = Err(ExampleError::Failure(failure));
        }
    }
    run.mocks.teardown();
    result
}

fn check_instance_variables(chain: &GroupChain<'_>, ctx: &ExampleContext) -> ExampleResult {
    for requirement in chain.requirements() {
        if let Requirement::InstanceVariable { name, .. } = requirement {
            if !ctx.is_set(name) {
                return Err(requirement.missing().into());
            }
        }
    }
    Ok(())
}

// ============================================================================
// Group chains
// ============================================================================

/// A group together with its ancestors, outermost first.
#[derive(Debug, Clone)]
pub struct GroupChain<'g> {
    groups: Vec<&'g ExampleGroup>,
}

impl<'g> GroupChain<'g> {
    pub fn root(group: &'g ExampleGroup) -> Self {
        Self { groups: vec![group] }
    }

    /// This chain extended by a nested group.
    pub fn push(&self, group: &'g ExampleGroup) -> Self {
        let mut groups = self.groups.clone();
        groups.push(group);
        Self { groups }
    }

    pub fn depth(&self) -> usize {
        self.groups.len()
    }

    /// Capabilities provided along the chain; inner groups override outer ones.
    pub fn capabilities(&self) -> Capabilities {
        let mut merged = Capabilities::default();
        for group in &self.groups {
            merged.extend(&group.capabilities);
        }
        merged
    }

    /// Requirements declared along the chain, innermost group first.
    pub fn requirements(&self) -> impl Iterator<Item = &'g Requirement> + '_ {
        self.groups.iter().rev().copied().flat_map(|g| g.requirements.iter())
    }

    fn description(&self) -> String {
        self.groups
            .iter()
            .map(|g| g.description.as_str())
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FilterSubject for GroupChain<'_> {
    fn matches_line(&self, line: u32) -> bool {
        self.groups.iter().any(|g| g.line == line)
    }

    fn full_description(&self) -> String {
        self.description()
    }

    fn tag(&self, name: &str) -> Option<&MetadataValue> {
        self.groups.iter().rev().find_map(|g| g.metadata.get(name))
    }
}

/// An example seen through its group chain, for filtering.
struct ExampleSubject<'c, 'g> {
    chain: &'c GroupChain<'g>,
    example: &'c Example,
    description: String,
    full_description: String,
}

impl<'c, 'g> ExampleSubject<'c, 'g> {
    fn new(chain: &'c GroupChain<'g>, example: &'c Example) -> Self {
        let description = example.description.resolve(&chain.capabilities());
        let group = chain.description();
        let full_description = if group.is_empty() {
            description.clone()
        } else {
            format!("{} {}", group, description)
        };
        Self {
            chain,
            example,
            description,
            full_description,
        }
    }
}

impl FilterSubject for ExampleSubject<'_, '_> {
    fn matches_line(&self, line: u32) -> bool {
        self.example.line == line || self.chain.matches_line(line)
    }

    fn full_description(&self) -> String {
        self.full_description.clone()
    }

    fn tag(&self, name: &str) -> Option<&MetadataValue> {
        self.example.metadata.get(name).or_else(|| self.chain.tag(name))
    }
}

// ============================================================================
// Run context
// ============================================================================

/// What every group of a run shares.
#[derive(Clone)]
pub struct RunContext<'a> {
    pub hooks: &'a HookRegistry,
    pub filters: &'a FilterSet,
    pub mocks: Arc<dyn MockAdapter>,
}

impl fmt::Debug for RunContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("hooks", &self.hooks.len())
            .field("filters", self.filters)
            .finish_non_exhaustive()
    }
}
