//! Graph - Dependency ordering for resource descriptors
//!
//! Orders a set of descriptors into a valid creation sequence (dependencies
//! before dependents) or the exact reverse for teardown. Ordering is
//! deterministic: ties are broken by ascending id, so two runs over the same
//! input always produce the same plan.

use std::collections::{BTreeMap, HashSet};

use crate::descriptor::ResourceDescriptor;
use crate::error::ErrorKind;

/// Whether the sequence is for creation or teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Create,
    Destroy,
}

/// Order descriptors by their dependency relation
///
/// Depth-first topological sort with on-stack cycle detection. Fails with
/// `CycleDetected` (listing the ids on the cycle) if the relation is not
/// acyclic, `UnknownDependency` if an edge does not resolve within the given
/// set, and `DuplicateId` if an id appears twice.
pub fn order(
    descriptors: &[ResourceDescriptor],
    direction: Direction,
) -> Result<Vec<ResourceDescriptor>, ErrorKind> {
    // BTreeMap gives the ascending-id iteration order for the tie-break
    let mut by_id: BTreeMap<&str, &ResourceDescriptor> = BTreeMap::new();
    for descriptor in descriptors {
        if by_id.insert(descriptor.id.as_str(), descriptor).is_some() {
            return Err(ErrorKind::DuplicateId(descriptor.id.clone()));
        }
    }

    for descriptor in descriptors {
        for dep in &descriptor.depends_on {
            if !by_id.contains_key(dep.as_str()) {
                return Err(ErrorKind::UnknownDependency {
                    reference: dep.clone(),
                    referrer: descriptor.id.clone(),
                });
            }
        }
    }

    fn visit(
        id: &str,
        by_id: &BTreeMap<&str, &ResourceDescriptor>,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
        sorted: &mut Vec<ResourceDescriptor>,
    ) -> Result<(), ErrorKind> {
        if visited.contains(id) {
            return Ok(());
        }
        if let Some(pos) = path.iter().position(|n| n == id) {
            let mut cycle: Vec<String> = path[pos..].to_vec();
            cycle.push(id.to_string());
            return Err(ErrorKind::CycleDetected(cycle));
        }

        path.push(id.to_string());
        // BTreeSet iteration keeps dependencies in ascending order
        for dep in &by_id[id].depends_on {
            visit(dep, by_id, visited, path, sorted)?;
        }
        path.pop();

        visited.insert(id.to_string());
        sorted.push((*by_id.get(id).unwrap()).clone());
        Ok(())
    }

    let mut sorted = Vec::with_capacity(descriptors.len());
    let mut visited = HashSet::new();
    let mut path = Vec::new();

    let ids: Vec<&str> = by_id.keys().copied().collect();
    for id in ids {
        visit(id, &by_id, &mut visited, &mut path, &mut sorted)?;
    }

    if direction == Direction::Destroy {
        sorted.reverse();
    }
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ResourceKind;

    fn descriptor(id: &str, deps: &[&str]) -> ResourceDescriptor {
        let mut d = ResourceDescriptor::new(id, ResourceKind::Vm);
        for dep in deps {
            d = d.depends_on(*dep);
        }
        d
    }

    fn ids(ordered: &[ResourceDescriptor]) -> Vec<&str> {
        ordered.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn chain_orders_dependencies_first() {
        let set = vec![
            descriptor("rule", &["proxy"]),
            descriptor("proxy", &["cert"]),
            descriptor("cert", &["ip"]),
            descriptor("ip", &[]),
        ];

        let ordered = order(&set, Direction::Create).unwrap();
        assert_eq!(ids(&ordered), vec!["ip", "cert", "proxy", "rule"]);
    }

    #[test]
    fn destroy_is_exact_reverse_of_create() {
        let set = vec![
            descriptor("vm", &["fw", "ip"]),
            descriptor("fw", &[]),
            descriptor("ip", &[]),
            descriptor("group", &["vm"]),
        ];

        let mut create = order(&set, Direction::Create).unwrap();
        let destroy = order(&set, Direction::Destroy).unwrap();
        create.reverse();
        assert_eq!(ids(&create), ids(&destroy));
    }

    #[test]
    fn independent_nodes_sorted_by_id() {
        let set = vec![
            descriptor("zeta", &[]),
            descriptor("alpha", &[]),
            descriptor("mid", &[]),
        ];

        let ordered = order(&set, Direction::Create).unwrap();
        assert_eq!(ids(&ordered), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn cycle_is_detected_with_involved_ids() {
        let set = vec![
            descriptor("a", &["b"]),
            descriptor("b", &["c"]),
            descriptor("c", &["a"]),
        ];

        match order(&set, Direction::Create) {
            Err(ErrorKind::CycleDetected(involved)) => {
                assert!(involved.contains(&"a".to_string()));
                assert!(involved.contains(&"b".to_string()));
                assert!(involved.contains(&"c".to_string()));
            }
            other => panic!("expected CycleDetected, got {:?}", other),
        }
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let set = vec![descriptor("proxy", &["cert"])];

        let err = order(&set, Direction::Create).unwrap_err();
        assert_eq!(
            err,
            ErrorKind::UnknownDependency {
                reference: "cert".into(),
                referrer: "proxy".into(),
            }
        );
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let set = vec![descriptor("ip", &[]), descriptor("ip", &[])];

        let err = order(&set, Direction::Create).unwrap_err();
        assert_eq!(err, ErrorKind::DuplicateId("ip".into()));
    }

    #[test]
    fn order_is_deterministic_across_runs() {
        let set = vec![
            descriptor("b", &["shared"]),
            descriptor("a", &["shared"]),
            descriptor("shared", &[]),
        ];

        let first = order(&set, Direction::Create).unwrap();
        let second = order(&set, Direction::Create).unwrap();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(ids(&first), vec!["shared", "a", "b"]);
    }
}
