//! Provide the test-world vocabulary shared by the specrun coordinator and the code that declares specs.
//!
//! This crate holds everything a run is made of, independent of how the run is started:
//! - metadata and filters used to select examples and to match hooks against groups,
//! - the hook registry (`before`/`after` at `each`, `all` and `suite` scope),
//! - example groups, examples and the per-example context handed to bodies,
//! - capability requirements for shared groups,
//! - the mock-adapter strategy and the reporter/output contracts.
//!
//! ## Notes
//!
//! - No global state: a [`World`] and a [`HookRegistry`] are plain values owned by one run.
//! - No command-line or network concerns; those live in the `specrun` crate.

pub mod context;
pub mod failure;
pub mod filter;
pub mod group;
pub mod hooks;
pub mod metadata;
pub mod mocking;
pub mod reporter;
pub mod requirements;
pub mod world;

pub use context::ExampleContext;
pub use failure::{ExampleError, ExampleResult, Failure, capture, fail};
pub use filter::{Filter, FilterSet, FilterSubject};
pub use group::{Description, Example, ExampleGroup, GroupChain, NOT_YET_IMPLEMENTED, RunContext};
pub use hooks::{Hook, HookKind, HookRegistry, HookScope};
pub use metadata::{Metadata, MetadataValue};
pub use mocking::{MockAdapter, MockFramework, NoMocking};
pub use reporter::{ExampleReport, ExampleStatus, GroupReport, OutputStream, Reporter, SyncGuard, SyncWriter};
pub use requirements::{Capabilities, MissingCapability, Requirement};
pub use world::World;
