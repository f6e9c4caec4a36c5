//! Pyxis Core
//!
//! Core library for a declarative infrastructure reconciliation engine.
//! Callers describe the resources they want as a set of
//! [`ResourceDescriptor`]s with dependency edges; the engine orders them,
//! diffs each against the state observed through a [`ProviderAdapter`], and
//! either predicts ([`Engine::plan`]) or executes ([`Engine::apply`]) the
//! create/delete calls needed to converge, returning a [`RunReport`] per
//! invocation.
//!
//! The engine holds no state between runs: observed state is re-queried
//! every time, and persistence of reports or manifests is left to the
//! caller.

pub mod descriptor;
pub mod differ;
pub mod engine;
pub mod error;
pub mod graph;
pub mod provider;
pub mod report;

// Re-export main types for convenience
pub use descriptor::{Manifest, ObservedState, ResourceDescriptor, ResourceKind, Scope};
pub use differ::Action;
pub use engine::{CancelFlag, Engine, EngineConfig, Mode};
pub use error::ErrorKind;
pub use graph::{Direction, order};
pub use provider::{AdapterError, AdapterResult, BoxFuture, ProviderAdapter};
pub use report::{NodeReport, RunReport, RunSummary};
