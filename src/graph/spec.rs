use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Pure-data adjacency representation of a job graph: node name -> its successors.
///
/// Keys must be unique (enforced by construction, since this wraps a `HashMap`);
/// every name appearing in a `next` list is expected to also be a key, but that
/// invariant is only *checked* by [`crate::graph::GraphValidator`], not here.
///
/// # Examples
///
/// ```
/// use dagflow::graph::GraphSpec;
///
/// let mut spec = GraphSpec::new();
/// spec.add_node("square");
/// spec.add_node("multiply");
/// spec.add_edge("square", "multiply");
///
/// assert_eq!(spec.successors("square"), &["multiply".to_string()]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSpec {
    nodes: HashMap<String, Vec<String>>,
}

impl GraphSpec {
    pub fn new() -> Self {
        Self { nodes: HashMap::new() }
    }

    /// Insert a node with no successors if it is not already present.
    pub fn add_node(&mut self, name: impl Into<String>) {
        self.nodes.entry(name.into()).or_default();
    }

    /// Record an edge `from -> to`, creating `from` if necessary. Does not create `to`;
    /// dangling targets are a validation concern, not a construction-time error.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let to = to.into();
        let entry = self.nodes.entry(from.into()).or_default();
        if !entry.contains(&to) {
            entry.push(to);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn successors(&self, name: &str) -> &[String] {
        self.nodes.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_names(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes that appear in no `next` list: candidate heads.
    pub fn heads(&self) -> Vec<String> {
        let mut referenced: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for succs in self.nodes.values() {
            for s in succs {
                referenced.insert(s.as_str());
            }
        }
        let mut heads: Vec<String> = self
            .nodes
            .keys()
            .filter(|n| !referenced.contains(n.as_str()))
            .cloned()
            .collect();
        heads.sort();
        heads
    }

    /// Nodes with an empty `next` list: candidate tails.
    pub fn tails(&self) -> Vec<String> {
        let mut tails: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, succs)| succs.is_empty())
            .map(|(n, _)| n.clone())
            .collect();
        tails.sort();
        tails
    }

    pub(crate) fn raw(&self) -> &HashMap<String, Vec<String>> {
        &self.nodes
    }
}

impl From<HashMap<String, Vec<String>>> for GraphSpec {
    fn from(nodes: HashMap<String, Vec<String>>) -> Self {
        Self { nodes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heads_and_tails_of_a_chain() {
        let mut spec = GraphSpec::new();
        spec.add_edge("a", "b");
        spec.add_edge("b", "c");
        spec.add_node("c");

        assert_eq!(spec.heads(), vec!["a".to_string()]);
        assert_eq!(spec.tails(), vec!["c".to_string()]);
    }

    #[test]
    fn multiple_heads_detected() {
        let mut spec = GraphSpec::new();
        spec.add_edge("h1", "m");
        spec.add_edge("h2", "m");
        spec.add_node("m");

        assert_eq!(spec.heads(), vec!["h1".to_string(), "h2".to_string()]);
        assert_eq!(spec.tails(), vec!["m".to_string()]);
    }
}
