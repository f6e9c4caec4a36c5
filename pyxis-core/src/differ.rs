//! Differ - Compare a desired descriptor with observed provider state
//!
//! Every resource kind is treated as immutable-in-place: there is no update
//! path, so a spec change always yields `Recreate` (delete then create,
//! processed in dependency order).

use serde::{Deserialize, Serialize};

use crate::descriptor::{ObservedState, ResourceDescriptor};

/// What the engine does (or would do) to one resource
///
/// `diff` only ever produces `NoOp`, `Create`, `Recreate` or `Delete`;
/// `Skip` and `Fail` appear in run reports when a node is blocked by a
/// failed ancestor or fails itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    NoOp,
    Create,
    Recreate,
    Delete,
    Skip,
    Fail,
}

impl Action {
    /// Whether executing this action issues a mutating adapter call
    pub fn is_mutating(&self) -> bool {
        matches!(self, Action::Create | Action::Recreate | Action::Delete)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::NoOp => "no-op",
            Action::Create => "create",
            Action::Recreate => "recreate",
            Action::Delete => "delete",
            Action::Skip => "skip",
            Action::Fail => "fail",
        };
        f.write_str(s)
    }
}

/// Compute the action for a desired resource against its observed state
pub fn diff(desired: &ResourceDescriptor, observed: &ObservedState) -> Action {
    match observed {
        ObservedState::Absent => Action::Create,
        ObservedState::Present(current) if *current == desired.spec => Action::NoOp,
        ObservedState::Present(_) => Action::Recreate,
    }
}

/// Compute the action for a retired resource (present in the removed set)
pub fn diff_retired(observed: &ObservedState) -> Action {
    match observed {
        ObservedState::Present(_) => Action::Delete,
        ObservedState::Absent => Action::NoOp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ResourceKind;
    use serde_json::json;

    #[test]
    fn absent_resource_needs_create() {
        let desired = ResourceDescriptor::new("ip", ResourceKind::StaticIp);
        assert_eq!(diff(&desired, &ObservedState::Absent), Action::Create);
    }

    #[test]
    fn matching_spec_is_noop() {
        let desired = ResourceDescriptor::new("ip", ResourceKind::StaticIp)
            .with_spec(json!({"tier": "premium"}));
        let observed = ObservedState::Present(json!({"tier": "premium"}));
        assert_eq!(diff(&desired, &observed), Action::NoOp);
    }

    #[test]
    fn diverged_spec_needs_recreate() {
        let desired = ResourceDescriptor::new("ip", ResourceKind::StaticIp)
            .with_spec(json!({"tier": "premium"}));
        let observed = ObservedState::Present(json!({"tier": "standard"}));
        assert_eq!(diff(&desired, &observed), Action::Recreate);
    }

    #[test]
    fn retired_resource_is_deleted_only_when_present() {
        assert_eq!(
            diff_retired(&ObservedState::Present(json!({}))),
            Action::Delete
        );
        assert_eq!(diff_retired(&ObservedState::Absent), Action::NoOp);
    }

    #[test]
    fn mutating_actions() {
        assert!(Action::Create.is_mutating());
        assert!(Action::Recreate.is_mutating());
        assert!(Action::Delete.is_mutating());
        assert!(!Action::NoOp.is_mutating());
        assert!(!Action::Skip.is_mutating());
    }
}
