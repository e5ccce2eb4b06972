use thiserror::Error;

/// Errors produced by [`crate::graph::GraphValidator`] while checking a [`crate::graph::GraphSpec`].
///
/// Validation is all-or-nothing: callers receive every violation found in a single
/// pass rather than bailing out on the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphValidationError {
    /// A `next` edge points at a cycle; `path` lists the node names forming the loop.
    #[error("cyclic graph detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    /// A `next` edge names a node that does not exist in the graph.
    #[error("node '{node}' has a dangling reference to '{missing}'")]
    DanglingReference { node: String, missing: String },

    /// No node is free of incoming edges.
    #[error("graph has no head: every node is referenced by some other node's `next`")]
    NoHead,

    /// More than one node is free of incoming edges and no synthetic head was requested.
    #[error("graph has multiple heads: {}", heads.join(", "))]
    MultipleHeads { heads: Vec<String> },

    /// No node has an empty `next` list.
    #[error("graph has no tail: every node has at least one outgoing edge")]
    NoTail,

    /// More than one node has an empty `next` list.
    #[error("graph has multiple tails: {}", tails.join(", "))]
    MultipleTails { tails: Vec<String> },

    /// A subgraph level references a node that belongs to a different level.
    #[error("node '{node}' in level '{level}' references '{target}' outside its level")]
    CrossLevelReference {
        level: String,
        node: String,
        target: String,
    },
}

/// A non-empty collection of [`GraphValidationError`]s, returned by a single validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("graph validation failed with {} error(s): {}", .0.len(), .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
pub struct GraphValidationErrors(pub Vec<GraphValidationError>);
