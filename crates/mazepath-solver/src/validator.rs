//! Path validation
//!
//! `is_valid_path` is the gate every solver result passes before it is
//! returned. `is_likely_suboptimal` is advisory and only feeds logging.

use mazepath_types::{Component, NodeId};
use std::collections::{HashMap, HashSet};

/// Check that `path` is a simple path in `component`
///
/// Paths of length 0 or 1 are always valid. Edges are checked in both
/// directions, so asymmetric input adjacency is tolerated.
pub fn is_valid_path(component: &Component, path: &[NodeId]) -> bool {
    if path.len() <= 1 {
        return true;
    }

    let mut seen = HashSet::with_capacity(path.len());
    if !path.iter().all(|node| seen.insert(node.as_str())) {
        return false;
    }

    path.windows(2).all(|pair| component.has_edge(&pair[0], &pair[1]))
}

/// Heuristic hint that `path` could be extended
///
/// True when some node off the path touches two path nodes that are
/// consecutive on the path, so the path could detour through it.
pub fn is_likely_suboptimal(component: &Component, path: &[NodeId]) -> bool {
    if path.len() < 2 {
        return false;
    }

    let position: HashMap<&str, usize> = path
        .iter()
        .enumerate()
        .map(|(i, node)| (node.as_str(), i))
        .collect();

    component
        .nodes()
        .filter(|node| !position.contains_key(node.as_str()))
        .any(|node| {
            let mut on_path: Vec<usize> = component
                .neighbors(node)
                .filter_map(|n| position.get(n.as_str()).copied())
                .collect();
            if on_path.len() < 2 {
                return false;
            }
            on_path.sort_unstable();
            on_path.windows(2).any(|w| w[1] == w[0] + 1)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn component(value: serde_json::Value) -> Component {
        Component::normalize(&value).unwrap()
    }

    fn path(nodes: &[&str]) -> Vec<NodeId> {
        nodes.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_short_paths_are_valid() {
        let c = component(json!({"1": ["2"]}));

        assert!(is_valid_path(&c, &[]));
        assert!(is_valid_path(&c, &path(&["1"])));
        assert!(is_valid_path(&c, &path(&["9"])));
    }

    #[test]
    fn test_repeated_node_is_invalid() {
        let c = component(json!({"1": ["2"], "2": ["3"], "3": ["1"]}));

        assert!(!is_valid_path(&c, &path(&["1", "2", "3", "1"])));
    }

    #[test]
    fn test_missing_edge_is_invalid() {
        let c = component(json!({"1": ["2"], "2": ["3"]}));

        assert!(is_valid_path(&c, &path(&["1", "2", "3"])));
        assert!(!is_valid_path(&c, &path(&["1", "3"])));
    }

    #[test]
    fn test_edges_checked_in_both_directions() {
        let c = component(json!({"1": ["2"], "3": ["2"]}));

        assert!(is_valid_path(&c, &path(&["3", "2", "1"])));
    }

    #[test]
    fn test_detour_marks_path_suboptimal() {
        // square 1-2-3-4 with a node 5 attached to both 2 and 3
        let c = component(json!({
            "1": ["2"], "2": ["3", "5"], "3": ["4", "5"]
        }));

        assert!(is_likely_suboptimal(&c, &path(&["1", "2", "3", "4"])));
        assert!(!is_likely_suboptimal(&c, &path(&["1", "2", "5", "3", "4"])));
    }

    #[test]
    fn test_non_adjacent_path_neighbors_are_not_flagged() {
        let c = component(json!({
            "1": ["2", "5"], "2": ["3"], "3": ["4"], "4": ["5"]
        }));

        assert!(!is_likely_suboptimal(&c, &path(&["1", "2", "3", "4"])));
    }
}
