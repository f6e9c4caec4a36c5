//! Error taxonomy for validation and per-node reconciliation failures

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by ordering, planning and applying
///
/// `CycleDetected`, `UnknownDependency` and `DuplicateId` are validation
/// errors: they fail a whole run before any adapter call is made. Everything
/// else is captured per node inside the [`RunReport`](crate::report::RunReport)
/// and never raised out of `run`, so side effects already applied stay
/// visible to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The dependency relation is not acyclic
    #[error("dependency cycle detected involving: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    /// A `depends_on` reference does not resolve within the given set
    #[error("unknown dependency '{reference}' (required by '{referrer}')")]
    UnknownDependency { reference: String, referrer: String },

    /// The same id appears more than once in one run
    #[error("duplicate resource id '{0}'")]
    DuplicateId(String),

    /// The provider cannot be reached
    #[error("provider unavailable: {0}")]
    AdapterUnavailable(String),

    /// The adapter call was rejected for auth reasons
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// An adapter call exceeded the configured per-call timeout
    #[error("adapter call timed out")]
    Timeout,

    /// The resource is in an unexpected state that cannot be safely recreated
    #[error("conflict: {0}")]
    Conflict(String),

    /// The node was skipped because an ancestor failed
    #[error("dependency '{dependency}' failed")]
    DependencyFailed { dependency: String },

    /// The run was cancelled before this node was started
    #[error("run cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Whether this error fails the whole run rather than a single node
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorKind::CycleDetected(_)
                | ErrorKind::UnknownDependency { .. }
                | ErrorKind::DuplicateId(_)
        )
    }
}
