//! Role inheritance graph
//!
//! Expansion walks `inherits` edges with a visited set, so cycles terminate.
//! Cycle reporting uses Kahn's algorithm run in both edge directions: a role
//! left over by both passes sits on (or between) inheritance cycles.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::policy::RoleDefinition;

/// Role name -> directly inherited roles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleGraph {
    inherits: BTreeMap<String, Vec<String>>,
}

impl RoleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later definitions with the same name replace earlier ones
    pub fn from_roles(roles: &[RoleDefinition]) -> Self {
        let inherits = roles
            .iter()
            .map(|role| (role.name.clone(), role.inherits.clone()))
            .collect();

        Self { inherits }
    }

    pub fn add_role(&mut self, name: impl Into<String>, inherits: Vec<String>) {
        self.inherits.insert(name.into(), inherits);
    }

    pub fn inherited(&self, role: &str) -> &[String] {
        self.inherits.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.inherits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inherits.is_empty()
    }

    /// Assigned roles plus everything they inherit, deduplicated and sorted
    ///
    /// Roles without a definition are kept as-is.
    pub fn resolve_effective_roles(&self, assigned: &[String]) -> Vec<String> {
        let mut visited = BTreeSet::new();
        let mut stack: Vec<&str> = assigned.iter().map(String::as_str).collect();

        while let Some(role) = stack.pop() {
            if !visited.insert(role) {
                continue;
            }

            for parent in self.inherited(role) {
                if !visited.contains(parent.as_str()) {
                    stack.push(parent.as_str());
                }
            }
        }

        visited.into_iter().map(str::to_string).collect()
    }

    /// Defined roles that lie on an inheritance cycle, sorted
    pub fn cyclic_roles(&self) -> Vec<String> {
        let forward = self.kahn_leftovers(false);
        if forward.is_empty() {
            return Vec::new();
        }

        let backward = self.kahn_leftovers(true);
        forward.intersection(&backward).map(|s| s.to_string()).collect()
    }

    /// Nodes Kahn's algorithm cannot remove, over defined roles only
    fn kahn_leftovers(&self, reversed: bool) -> BTreeSet<&str> {
        let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut in_degree: HashMap<&str, usize> =
            self.inherits.keys().map(|name| (name.as_str(), 0)).collect();

        for (role, parents) in &self.inherits {
            for parent in parents {
                if !self.inherits.contains_key(parent) {
                    continue;
                }

                let (from, to) = if reversed {
                    (parent.as_str(), role.as_str())
                } else {
                    (role.as_str(), parent.as_str())
                };
                edges.entry(from).or_default().push(to);
                if let Some(degree) = in_degree.get_mut(to) {
                    *degree += 1;
                }
            }
        }

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();

        while let Some(node) = queue.pop_front() {
            in_degree.remove(node);
            for &next in edges.get(node).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        in_degree.into_keys().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn graph(edges: &[(&str, &[&str])]) -> RoleGraph {
        let mut graph = RoleGraph::new();
        for (name, parents) in edges {
            graph.add_role(*name, roles(parents));
        }
        graph
    }

    #[test]
    fn test_transitive_expansion() {
        let g = graph(&[
            ("admin", &["manager"]),
            ("manager", &["employee"]),
            ("employee", &[]),
        ]);

        assert_eq!(
            g.resolve_effective_roles(&roles(&["admin"])),
            roles(&["admin", "employee", "manager"])
        );
        assert_eq!(g.resolve_effective_roles(&[]), Vec::<String>::new());
    }

    #[test]
    fn test_unknown_roles_are_kept() {
        let g = graph(&[("admin", &["ghost"])]);
        assert_eq!(
            g.resolve_effective_roles(&roles(&["admin", "contractor", "admin"])),
            roles(&["admin", "contractor", "ghost"])
        );
    }

    #[test]
    fn test_cycles_terminate() {
        let g = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"]), ("d", &["a"])]);

        assert_eq!(g.resolve_effective_roles(&roles(&["a"])), roles(&["a", "b", "c"]));
        assert_eq!(
            g.resolve_effective_roles(&roles(&["d"])),
            roles(&["a", "b", "c", "d"])
        );
        assert_eq!(g.cyclic_roles(), roles(&["a", "b", "c"]));
    }

    #[test]
    fn test_acyclic_graph_reports_nothing() {
        let g = graph(&[("a", &["b"]), ("b", &[]), ("c", &["a", "b"])]);
        assert!(g.cyclic_roles().is_empty());

        let self_loop = graph(&[("a", &["a"])]);
        assert_eq!(self_loop.cyclic_roles(), roles(&["a"]));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        const NAMES: [&str; 6] = ["r0", "r1", "r2", "r3", "r4", "r5"];

        fn names(indexes: impl IntoIterator<Item = usize>) -> Vec<String> {
            indexes.into_iter().map(|i| NAMES[i].to_string()).collect()
        }

        /// Parent indexes per role
        fn arb_edges() -> impl Strategy<Value = Vec<Vec<usize>>> {
            prop::collection::vec(prop::collection::vec(0..NAMES.len(), 0..4), NAMES.len())
        }

        fn arb_graph() -> impl Strategy<Value = RoleGraph> {
            arb_edges().prop_map(|parents| {
                let mut graph = RoleGraph::new();
                for (i, edges) in parents.into_iter().enumerate() {
                    graph.add_role(NAMES[i], names(edges));
                }
                graph
            })
        }

        proptest! {
            #[test]
            fn prop_expansion_is_closed(
                g in arb_graph(),
                assigned in prop::collection::vec(0..NAMES.len(), 0..4),
            ) {
                let assigned = names(assigned);
                let effective = g.resolve_effective_roles(&assigned);

                for role in &assigned {
                    prop_assert!(effective.contains(role));
                }
                for role in &effective {
                    for parent in g.inherited(role) {
                        prop_assert!(effective.contains(parent));
                    }
                }

                let mut sorted = effective.clone();
                sorted.sort();
                sorted.dedup();
                prop_assert_eq!(sorted, effective);
            }

            #[test]
            fn prop_downward_edges_are_acyclic(parents in arb_edges()) {
                let mut g = RoleGraph::new();
                for (i, edges) in parents.into_iter().enumerate() {
                    g.add_role(NAMES[i], names(edges.into_iter().filter(|p| *p < i)));
                }
                prop_assert!(g.cyclic_roles().is_empty());
            }
        }
    }
}
