//! Maze components - undirected adjacency graphs keyed by node label
//!
//! Components arrive from callers in loosely structured JSON. This module
//! normalizes them into a symmetric adjacency map so that every consumer can
//! treat an edge as present from either direction.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Opaque node label
pub type NodeId = String;

/// Reasons a raw component cannot be turned into adjacency form
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// The value is neither an adjacency map nor an edge list
    #[error("Unsupported component shape: {0}")]
    UnsupportedShape(String),

    /// A node label is not a string or integer
    #[error("Invalid node label: {0}")]
    InvalidLabel(String),

    /// An adjacency entry is not a list of labels
    #[error("Neighbors of node {0} are not a list")]
    InvalidNeighbors(String),
}

/// An undirected graph component
///
/// Adjacency is always stored symmetrically, even when the caller listed an
/// edge under only one of its endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<NodeId, Vec<NodeId>>", into = "BTreeMap<NodeId, Vec<NodeId>>")]
pub struct Component {
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl Component {
    /// Create an empty component
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a component from an adjacency map that may be asymmetric
    pub fn from_adjacency<I, N>(adjacency: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, N)>,
        N: IntoIterator<Item = NodeId>,
    {
        let mut component = Self::new();
        for (node, neighbors) in adjacency {
            component.add_node(node.clone());
            for neighbor in neighbors {
                component.add_edge(node.clone(), neighbor);
            }
        }
        component
    }

    /// Build a component from a list of undirected edges
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let mut component = Self::new();
        for (a, b) in edges {
            component.add_edge(a, b);
        }
        component
    }

    /// Normalize a raw JSON component
    ///
    /// Accepts an adjacency object (`{"a": ["b"]}`) or an edge list
    /// (`[["a", "b"], ...]`). Labels may be strings or integers.
    pub fn normalize(raw: &Value) -> Result<Self, NormalizeError> {
        match raw {
            Value::Object(map) => {
                let mut component = Self::new();
                for (node, neighbors) in map {
                    component.add_node(node.clone());
                    let list = neighbors
                        .as_array()
                        .ok_or_else(|| NormalizeError::InvalidNeighbors(node.clone()))?;
                    for neighbor in list {
                        component.add_edge(node.clone(), label(neighbor)?);
                    }
                }
                Ok(component)
            }
            Value::Array(items) if !items.is_empty() => {
                let mut edges = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_array().map(Vec::as_slice) {
                        Some([a, b]) => edges.push((label(a)?, label(b)?)),
                        _ => {
                            return Err(NormalizeError::UnsupportedShape(
                                "list elements must be [from, to] pairs".to_string(),
                            ))
                        }
                    }
                }
                Ok(Self::from_edges(edges))
            }
            Value::Array(_) => Err(NormalizeError::UnsupportedShape("empty list".to_string())),
            other => Err(NormalizeError::UnsupportedShape(shape_name(other).to_string())),
        }
    }

    /// Insert a node without edges
    pub fn add_node(&mut self, node: NodeId) {
        self.adjacency.entry(node).or_default();
    }

    /// Insert an undirected edge; self-loops only register the node
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            self.add_node(a);
            return;
        }
        self.adjacency.entry(a.clone()).or_default().insert(b.clone());
        self.adjacency.entry(b).or_default().insert(a);
    }

    /// Number of distinct nodes
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Nodes in label order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.adjacency.keys()
    }

    pub fn contains(&self, node: &str) -> bool {
        self.adjacency.contains_key(node)
    }

    /// Neighbors of a node in label order (empty for unknown nodes)
    pub fn neighbors(&self, node: &str) -> impl Iterator<Item = &NodeId> {
        self.adjacency.get(node).into_iter().flatten()
    }

    pub fn degree(&self, node: &str) -> usize {
        self.adjacency.get(node).map_or(0, BTreeSet::len)
    }

    /// Direction-tolerant edge lookup
    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.adjacency.get(a).is_some_and(|n| n.contains(b))
            || self.adjacency.get(b).is_some_and(|n| n.contains(a))
    }

    /// Adjacency as plain lists, the shape the wire format uses
    pub fn to_adjacency_lists(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        self.adjacency
            .iter()
            .map(|(node, neighbors)| (node.clone(), neighbors.iter().cloned().collect()))
            .collect()
    }
}

impl From<BTreeMap<NodeId, Vec<NodeId>>> for Component {
    fn from(adjacency: BTreeMap<NodeId, Vec<NodeId>>) -> Self {
        Self::from_adjacency(adjacency)
    }
}

impl From<Component> for BTreeMap<NodeId, Vec<NodeId>> {
    fn from(component: Component) -> Self {
        component.to_adjacency_lists()
    }
}

fn label(value: &Value) -> Result<NodeId, NormalizeError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        other => Err(NormalizeError::InvalidLabel(other.to_string())),
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_asymmetric_adjacency_is_symmetrized() {
        let component = Component::normalize(&json!({"a": ["b"], "b": []})).unwrap();

        assert!(component.has_edge("a", "b"));
        assert!(component.has_edge("b", "a"));
        assert_eq!(component.degree("b"), 1);
        assert_eq!(component.edge_count(), 1);
    }

    #[test]
    fn test_neighbor_only_nodes_are_added() {
        let component = Component::normalize(&json!({"1": ["2", "3"]})).unwrap();

        assert_eq!(component.node_count(), 3);
        assert!(component.contains("3"));
    }

    #[test]
    fn test_edge_list_with_integer_labels() {
        let component = Component::normalize(&json!([[1, 2], [2, 3]])).unwrap();

        assert_eq!(component.node_count(), 3);
        assert!(component.has_edge("2", "3"));
    }

    #[test]
    fn test_flat_list_is_rejected() {
        let result = Component::normalize(&json!(["1", "2", "3"]));
        assert!(matches!(result, Err(NormalizeError::UnsupportedShape(_))));

        let result = Component::normalize(&json!("not a graph"));
        assert!(matches!(result, Err(NormalizeError::UnsupportedShape(_))));
    }

    #[test]
    fn test_self_loops_and_duplicates_are_ignored() {
        let component = Component::normalize(&json!({"1": ["1", "2", "2"]})).unwrap();

        assert_eq!(component.degree("1"), 1);
        assert!(!component.has_edge("1", "1"));
    }

    #[test]
    fn test_serde_uses_adjacency_lists() {
        let component = Component::normalize(&json!({"1": ["2"]})).unwrap();
        let value = serde_json::to_value(&component).unwrap();

        assert_eq!(value, json!({"1": ["2"], "2": ["1"]}));
    }
}
