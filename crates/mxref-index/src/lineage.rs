//! Transitive supersession queries.
//!
//! Supersession edges may form cycles (two manifests claiming to replace each
//! other). Traversals keep a visited set and a depth bound, and cycles are
//! reported separately through strongly connected components.

use crate::index::CrossReferenceIndex;
use mxref_core::{LineageDirection, ManifestPath};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};

impl CrossReferenceIndex {
    /// Manifests reachable from `path` by following supersession edges, in
    /// breadth-first order, at most `max_depth` hops away. The start manifest
    /// itself is never included.
    pub fn lineage(
        &self,
        path: &str,
        direction: LineageDirection,
        max_depth: usize,
    ) -> Vec<ManifestPath> {
        let start = self.manifest_key(path);
        if !self.entries.contains_key(&start) {
            return Vec::new();
        }

        let mut visited: HashSet<ManifestPath> = HashSet::from([start.clone()]);
        let mut queue = VecDeque::from([(start, 0usize)]);
        let mut result = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let chain = self.supersession_chain(&current);
            let next = match direction {
                LineageDirection::Ancestors => chain.parents,
                LineageDirection::Descendants => chain.children,
            };
            for neighbor in next {
                if visited.insert(neighbor.clone()) {
                    result.push(neighbor.clone());
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }

        result
    }

    /// Groups of manifests that supersede each other in a loop. Each group is
    /// sorted, and the groups are sorted by their first member.
    pub fn supersession_cycles(&self) -> Vec<Vec<ManifestPath>> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

        let mut paths: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        paths.sort_unstable();
        for path in paths {
            nodes.insert(path, graph.add_node(path));
        }

        for entry in self.entries.values() {
            for target in &entry.supersedes {
                if let (Some(&from), Some(&to)) =
                    (nodes.get(entry.path.as_str()), nodes.get(target.as_str()))
                {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let mut cycles: Vec<Vec<ManifestPath>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1 || graph.contains_edge(component[0], component[0])
            })
            .map(|component| {
                let mut members: Vec<ManifestPath> =
                    component.iter().map(|&n| graph[n].to_string()).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();

        if !cycles.is_empty() {
            tracing::debug!("Found {} supersession cycles", cycles.len());
        }
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn supersedes(target: Option<&str>) -> String {
        match target {
            Some(t) => format!(r#"{{"supersedes": ["{t}"]}}"#),
            None => "{}".to_string(),
        }
    }

    fn index_with(items: &[(&str, Option<&str>)]) -> CrossReferenceIndex {
        let mut index = CrossReferenceIndex::with_roots([PathBuf::from("/ws")]);
        index.build_index(
            items
                .iter()
                .map(|(path, target)| (format!("/ws/{path}"), Ok(supersedes(*target))))
                .collect::<Vec<_>>(),
        );
        index
    }

    fn ws(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| format!("/ws/{n}")).collect()
    }

    #[test]
    fn descendants_follow_supersedes_transitively() {
        // c -> b -> a
        let index = index_with(&[
            ("a.json", None),
            ("b.json", Some("a.json")),
            ("c.json", Some("b.json")),
        ]);
        assert_eq!(
            index.lineage("c.json", LineageDirection::Descendants, 32),
            ws(&["b.json", "a.json"])
        );
        assert_eq!(
            index.lineage("a.json", LineageDirection::Ancestors, 32),
            ws(&["b.json", "c.json"])
        );
        assert!(index.lineage("a.json", LineageDirection::Descendants, 32).is_empty());
    }

    #[test]
    fn depth_bound_limits_traversal() {
        let index = index_with(&[
            ("a.json", None),
            ("b.json", Some("a.json")),
            ("c.json", Some("b.json")),
        ]);
        assert_eq!(
            index.lineage("c.json", LineageDirection::Descendants, 1),
            ws(&["b.json"])
        );
        assert!(index.lineage("c.json", LineageDirection::Descendants, 0).is_empty());
    }

    #[test]
    fn cycles_terminate_and_are_reported() {
        let index = index_with(&[
            ("a.json", Some("b.json")),
            ("b.json", Some("a.json")),
            ("c.json", Some("c.json")),
            ("d.json", Some("a.json")),
        ]);

        assert_eq!(
            index.lineage("a.json", LineageDirection::Descendants, 32),
            ws(&["b.json"])
        );
        assert_eq!(
            index.lineage("a.json", LineageDirection::Ancestors, 32),
            ws(&["b.json", "d.json"])
        );
        assert!(index.lineage("c.json", LineageDirection::Descendants, 32).is_empty());

        assert_eq!(
            index.supersession_cycles(),
            vec![ws(&["a.json", "b.json"]), ws(&["c.json"])]
        );
    }

    #[test]
    fn missing_targets_are_not_traversed() {
        let index = index_with(&[("b.json", Some("gone.json"))]);
        assert!(index.lineage("b.json", LineageDirection::Descendants, 32).is_empty());
        assert!(index.lineage("unknown.json", LineageDirection::Ancestors, 32).is_empty());
        assert!(index.supersession_cycles().is_empty());
    }
}
