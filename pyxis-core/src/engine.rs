//! Engine - Plan/apply driver over the ordered dependency graph
//!
//! Walks the creation sequence one node at a time, diffing desired against
//! observed state and, in apply mode, issuing the matching adapter calls.
//! Retired resources are processed first, dependents before their
//! dependencies. A failed node blocks its dependents but independent
//! branches of the graph continue, which bounds the blast radius of a
//! single resource failure without a global abort.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::descriptor::{Manifest, ObservedState, ResourceDescriptor};
use crate::differ::{self, Action};
use crate::error::ErrorKind;
use crate::graph::{self, Direction};
use crate::provider::{AdapterError, AdapterResult, ProviderAdapter};
use crate::report::{NodeReport, RunReport};

/// Whether a run only predicts actions or also executes them
///
/// In `Plan` mode no mutating adapter call is ever issued; only `describe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Plan,
    Apply,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Plan => f.write_str("plan"),
            Mode::Apply => f.write_str("apply"),
        }
    }
}

/// Cooperative cancellation handle
///
/// Clones share the same flag. The engine checks it between nodes: once set,
/// no further node is started and the remaining nodes are reported as
/// skipped. In-flight adapter calls run to completion (or to their timeout).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Upper bound for a single adapter call; `None` waits indefinitely
    pub call_timeout: Option<Duration>,
    /// Shared cancellation flag checked between nodes
    pub cancel: CancelFlag,
}

/// Plan/apply engine driving a provider adapter
pub struct Engine<P: ProviderAdapter> {
    adapter: P,
    config: EngineConfig,
}

impl<P: ProviderAdapter> Engine<P> {
    pub fn new(adapter: P) -> Self {
        Self {
            adapter,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Predict the actions an apply would execute, without mutating anything
    pub async fn plan(&self, manifest: &Manifest) -> Result<RunReport, ErrorKind> {
        self.run(manifest, Mode::Plan).await
    }

    /// Drive observed state toward the manifest's desired state
    pub async fn apply(&self, manifest: &Manifest) -> Result<RunReport, ErrorKind> {
        self.run(manifest, Mode::Apply).await
    }

    /// Tear down an entire descriptor set, dependents first
    pub async fn destroy(&self, descriptors: &[ResourceDescriptor]) -> Result<RunReport, ErrorKind> {
        self.run(&Manifest::destroy_all(descriptors.to_vec()), Mode::Apply)
            .await
    }

    async fn run(&self, manifest: &Manifest, mode: Mode) -> Result<RunReport, ErrorKind> {
        // Validation covers the union, so a duplicate across desired and
        // removed, an unresolved edge, or a cycle fails the run before any
        // adapter call is made.
        let mut union: Vec<ResourceDescriptor> = manifest.desired.clone();
        union.extend(manifest.removed.iter().cloned());
        let create_order = graph::order(&union, Direction::Create)?;

        let removed_ids: HashSet<&str> = manifest.removed.iter().map(|d| d.id.as_str()).collect();

        // Reverse edges: dependency id -> ids that depend on it
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for descriptor in &union {
            for dep in &descriptor.depends_on {
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(descriptor.id.clone());
            }
        }

        info!(%mode, nodes = union.len(), "starting run");

        let mut blocked: HashSet<String> = HashSet::new();
        let mut report = RunReport::new();

        // Teardown pass: retired resources, dependents before dependencies
        for descriptor in create_order
            .iter()
            .rev()
            .filter(|d| removed_ids.contains(d.id.as_str()))
        {
            if self.config.cancel.is_cancelled() {
                report.push(NodeReport::skipped(
                    &descriptor.id,
                    descriptor.kind,
                    ErrorKind::Cancelled,
                ));
                continue;
            }

            let node_dependents = dependents
                .get(&descriptor.id)
                .map(|v| v.as_slice())
                .unwrap_or(&[]);

            // A retired resource must outlive everything that depends on it
            if let Some(holder) = node_dependents
                .iter()
                .find(|d| !removed_ids.contains(d.as_str()))
            {
                let err = ErrorKind::Conflict(format!("still required by '{holder}'"));
                warn!(id = %descriptor.id, %err, "refusing to retire resource");
                report.push(NodeReport::failed(&descriptor.id, descriptor.kind, err));
                blocked.insert(descriptor.id.clone());
                continue;
            }

            // Teardown cascade runs against dependents: if one of them could
            // not be deleted, this resource must stay
            if let Some(failed) = node_dependents.iter().find(|d| blocked.contains(d.as_str())) {
                report.push(NodeReport::skipped(
                    &descriptor.id,
                    descriptor.kind,
                    ErrorKind::DependencyFailed {
                        dependency: failed.clone(),
                    },
                ));
                blocked.insert(descriptor.id.clone());
                continue;
            }

            let observed = match self.describe(descriptor).await {
                Ok(state) => state,
                Err(err) => {
                    warn!(id = %descriptor.id, %err, "describe failed");
                    report.push(NodeReport::failed(&descriptor.id, descriptor.kind, err));
                    blocked.insert(descriptor.id.clone());
                    continue;
                }
            };

            let action = differ::diff_retired(&observed);
            debug!(id = %descriptor.id, %action, "retired node diffed");

            if mode == Mode::Plan || action == Action::NoOp {
                report.push(NodeReport::ok(&descriptor.id, descriptor.kind, action));
                continue;
            }

            match self
                .timed(self.adapter.delete(descriptor.kind, &descriptor.id, descriptor.scope))
                .await
            {
                Ok(Ok(())) => {
                    report.push(NodeReport::ok(&descriptor.id, descriptor.kind, Action::Delete));
                }
                // Deleted out-of-band since the describe; nothing left to do
                Ok(Err(AdapterError::AlreadyAbsent)) => {
                    report.push(NodeReport::ok(&descriptor.id, descriptor.kind, Action::NoOp));
                }
                Ok(Err(err)) => {
                    warn!(id = %descriptor.id, %err, "delete failed");
                    report.push(NodeReport::failed(&descriptor.id, descriptor.kind, err.into()));
                    blocked.insert(descriptor.id.clone());
                }
                Err(kind) => {
                    warn!(id = %descriptor.id, %kind, "delete failed");
                    report.push(NodeReport::failed(&descriptor.id, descriptor.kind, kind));
                    blocked.insert(descriptor.id.clone());
                }
            }
        }

        // Creation pass: desired resources, dependencies before dependents
        for descriptor in create_order
            .iter()
            .filter(|d| !removed_ids.contains(d.id.as_str()))
        {
            if self.config.cancel.is_cancelled() {
                report.push(NodeReport::skipped(
                    &descriptor.id,
                    descriptor.kind,
                    ErrorKind::Cancelled,
                ));
                continue;
            }

            if let Some(failed) = descriptor
                .depends_on
                .iter()
                .find(|dep| blocked.contains(dep.as_str()))
            {
                report.push(NodeReport::skipped(
                    &descriptor.id,
                    descriptor.kind,
                    ErrorKind::DependencyFailed {
                        dependency: failed.clone(),
                    },
                ));
                blocked.insert(descriptor.id.clone());
                continue;
            }

            let observed = match self.describe(descriptor).await {
                Ok(state) => state,
                Err(err) => {
                    warn!(id = %descriptor.id, %err, "describe failed");
                    report.push(NodeReport::failed(&descriptor.id, descriptor.kind, err));
                    blocked.insert(descriptor.id.clone());
                    continue;
                }
            };

            let action = differ::diff(descriptor, &observed);
            debug!(id = %descriptor.id, %action, "desired node diffed");

            if mode == Mode::Plan || action == Action::NoOp {
                report.push(NodeReport::ok(&descriptor.id, descriptor.kind, action));
                continue;
            }

            match self.execute(descriptor, action).await {
                Ok(done) => {
                    report.push(NodeReport::ok(&descriptor.id, descriptor.kind, done));
                }
                Err(err) => {
                    warn!(id = %descriptor.id, %err, "apply failed");
                    report.push(NodeReport::failed(&descriptor.id, descriptor.kind, err));
                    blocked.insert(descriptor.id.clone());
                }
            }
        }

        info!(%mode, summary = %report.summary(), "run finished");
        Ok(report)
    }

    /// Execute a single mutating action for a desired resource
    async fn execute(&self, descriptor: &ResourceDescriptor, action: Action) -> Result<Action, ErrorKind> {
        match action {
            Action::Recreate => {
                match self
                    .timed(self.adapter.delete(descriptor.kind, &descriptor.id, descriptor.scope))
                    .await
                {
                    Ok(Ok(())) | Ok(Err(AdapterError::AlreadyAbsent)) => {}
                    Ok(Err(err)) => return Err(err.into()),
                    Err(kind) => return Err(kind),
                }
                match self.timed(self.adapter.create(descriptor)).await {
                    Ok(Ok(())) => Ok(Action::Recreate),
                    Ok(Err(AdapterError::AlreadyExists)) => Ok(Action::NoOp),
                    Ok(Err(err)) => Err(err.into()),
                    Err(kind) => Err(kind),
                }
            }
            Action::Create => match self.timed(self.adapter.create(descriptor)).await {
                Ok(Ok(())) => Ok(Action::Create),
                // Created out-of-band since the describe; idempotent outcome
                Ok(Err(AdapterError::AlreadyExists)) => Ok(Action::NoOp),
                Ok(Err(err)) => Err(err.into()),
                Err(kind) => Err(kind),
            },
            // diff never hands anything else to execute
            other => Ok(other),
        }
    }

    async fn describe(&self, descriptor: &ResourceDescriptor) -> Result<ObservedState, ErrorKind> {
        match self
            .timed(self.adapter.describe(descriptor.kind, &descriptor.id, descriptor.scope))
            .await
        {
            Ok(Ok(state)) => Ok(state),
            Ok(Err(err)) => Err(err.into()),
            Err(kind) => Err(kind),
        }
    }

    /// Await an adapter call under the configured per-call timeout
    async fn timed<T, F>(&self, fut: F) -> Result<AdapterResult<T>, ErrorKind>
    where
        F: Future<Output = AdapterResult<T>>,
    {
        match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| ErrorKind::Timeout),
            None => Ok(fut.await),
        }
    }
}
