//! Report - Per-node outcomes of one plan or apply run
//!
//! A report is produced fresh per invocation and returned to the caller;
//! the core never persists it.

use serde::Serialize;

use crate::descriptor::ResourceKind;
use crate::differ::Action;
use crate::error::ErrorKind;

/// Outcome for a single resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
    pub id: String,
    pub kind: ResourceKind,
    pub action: Action,
    /// Set for `Fail` entries, and for `Skip` entries as the skip reason
    /// (`DependencyFailed` or `Cancelled`).
    pub error: Option<ErrorKind>,
}

impl NodeReport {
    pub fn ok(id: impl Into<String>, kind: ResourceKind, action: Action) -> Self {
        Self {
            id: id.into(),
            kind,
            action,
            error: None,
        }
    }

    pub fn skipped(id: impl Into<String>, kind: ResourceKind, reason: ErrorKind) -> Self {
        Self {
            id: id.into(),
            kind,
            action: Action::Skip,
            error: Some(reason),
        }
    }

    pub fn failed(id: impl Into<String>, kind: ResourceKind, error: ErrorKind) -> Self {
        Self {
            id: id.into(),
            kind,
            action: Action::Fail,
            error: Some(error),
        }
    }
}

/// Ordered sequence of node outcomes for one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    entries: Vec<NodeReport>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: NodeReport) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[NodeReport] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the entry for a resource id
    pub fn entry(&self, id: &str) -> Option<&NodeReport> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// The (id, action) pairs in report order; convenient for comparing a
    /// plan against a later apply
    pub fn actions(&self) -> Vec<(&str, Action)> {
        self.entries
            .iter()
            .map(|e| (e.id.as_str(), e.action))
            .collect()
    }

    /// True when no entry failed or was skipped
    pub fn is_success(&self) -> bool {
        self.entries
            .iter()
            .all(|e| !matches!(e.action, Action::Fail | Action::Skip))
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for entry in &self.entries {
            match entry.action {
                Action::NoOp => summary.noop += 1,
                Action::Create => summary.create += 1,
                Action::Recreate => summary.recreate += 1,
                Action::Delete => summary.delete += 1,
                Action::Skip => summary.skip += 1,
                Action::Fail => summary.fail += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub create: usize,
    pub recreate: usize,
    pub delete: usize,
    pub noop: usize,
    pub skip: usize,
    pub fail: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to recreate, {} to delete, {} unchanged",
            self.create, self.recreate, self.delete, self.noop
        )?;
        if self.skip > 0 || self.fail > 0 {
            write!(f, " ({} skipped, {} failed)", self.skip, self.fail)?;
        }
        Ok(())
    }
}
