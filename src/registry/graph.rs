//! Dependency graph helpers: topological order, cycle paths, dependents.
//!
//! Graphs map a component name to the names it depends on (`A → B` means A
//! needs B). Iteration follows the map's insertion order, so results are
//! deterministic in registration order.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;

pub(crate) type Graph = IndexMap<String, Vec<String>>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Orders the nodes of `graph` so every node comes after its dependencies.
///
/// Dependencies that are not nodes of `graph` are ignored. On a cycle returns
/// its path, first node repeated at the end (`[x, y, x]`).
pub(crate) fn topo_order(graph: &Graph) -> Result<Vec<String>, Vec<String>> {
    let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(graph.len());
    let mut path: Vec<&str> = Vec::new();
    let mut order = Vec::with_capacity(graph.len());

    for node in graph.keys() {
        visit(graph, node, &mut marks, &mut path, &mut order)?;
    }
    Ok(order)
}

fn visit<'a>(
    graph: &'a Graph,
    node: &'a str,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
    order: &mut Vec<String>,
) -> Result<(), Vec<String>> {
    match marks.get(node) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => {
            let start = path.iter().position(|n| *n == node).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
            cycle.push(node.to_string());
            return Err(cycle);
        }
        None => {}
    }
    let Some(deps) = graph.get(node) else {
        return Ok(());
    };

    marks.insert(node, Mark::InProgress);
    path.push(node);
    for dep in deps {
        visit(graph, dep, marks, path, order)?;
    }
    path.pop();
    marks.insert(node, Mark::Done);
    order.push(node.to_string());
    Ok(())
}

/// `(component, dependency)` pairs whose dependency is not a node, in graph order.
pub(crate) fn missing(graph: &Graph) -> Vec<(String, String)> {
    graph
        .iter()
        .flat_map(|(name, deps)| {
            deps.iter()
                .filter(|dep| !graph.contains_key(dep.as_str()))
                .map(move |dep| (name.clone(), dep.clone()))
        })
        .collect()
}

/// Nodes that depend on `name` directly, in graph order.
pub(crate) fn direct_dependents(graph: &Graph, name: &str) -> Vec<String> {
    graph
        .iter()
        .filter(|(_, deps)| deps.iter().any(|d| d == name))
        .map(|(n, _)| n.clone())
        .collect()
}

/// Nodes that depend on `name` directly or transitively, excluding `name`.
pub(crate) fn transitive_dependents(graph: &Graph, name: &str) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([name.to_string()]);
    while let Some(current) = queue.pop_front() {
        for dependent in direct_dependents(graph, &current) {
            if dependent != name && seen.insert(dependent.clone()) {
                queue.push_back(dependent);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> Graph {
        edges
            .iter()
            .map(|(n, deps)| (n.to_string(), deps.iter().map(|d| d.to_string()).collect()))
            .collect()
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn test_dependencies_come_first() {
        let g = graph(&[("c", &["a", "b"]), ("b", &["a"]), ("a", &[]), ("d", &["c"])]);
        let order = topo_order(&g).unwrap();
        assert_eq!(order.len(), 4);
        for (node, deps) in &g {
            for dep in deps {
                assert!(position(&order, dep) < position(&order, node));
            }
        }
    }

    #[test]
    fn test_registration_order_kept_for_independent_nodes() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["a", "b"])]);
        assert_eq!(topo_order(&g).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_two_node_cycle_path() {
        let g = graph(&[("x", &["y"]), ("y", &["x"])]);
        assert_eq!(topo_order(&g).unwrap_err(), vec!["x", "y", "x"]);
    }

    #[test]
    fn test_cycle_path_excludes_entry_prefix() {
        let g = graph(&[("root", &["a"]), ("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        assert_eq!(topo_order(&g).unwrap_err(), vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let g = graph(&[("a", &["a"])]);
        assert_eq!(topo_order(&g).unwrap_err(), vec!["a", "a"]);
    }

    #[test]
    fn test_unknown_dependencies_are_skipped_and_reported() {
        let g = graph(&[("a", &["ghost"]), ("b", &["a", "phantom"])]);
        assert_eq!(topo_order(&g).unwrap(), vec!["a", "b"]);
        assert_eq!(
            missing(&g),
            vec![
                ("a".to_string(), "ghost".to_string()),
                ("b".to_string(), "phantom".to_string())
            ]
        );
    }

    #[test]
    fn test_dependents() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["b"]), ("d", &[])]);
        assert_eq!(direct_dependents(&g, "a"), vec!["b"]);
        let all = transitive_dependents(&g, "a");
        assert_eq!(all.len(), 2);
        assert!(all.contains("b") && all.contains("c"));
        assert!(transitive_dependents(&g, "d").is_empty());
    }
}
