use std::collections::{HashMap, HashSet};

use crate::errors::{GraphValidationError, GraphValidationErrors};
use crate::graph::GraphSpec;
use crate::observability::messages::{validation::GraphValidationFailed, StructuredLog};

/// Validates a [`GraphSpec`] against the invariants required before it can be wired
/// into a [`crate::job_graph::JobGraph`]: every reference resolves, the graph is
/// acyclic, and it has exactly one head and exactly one tail.
///
/// Validation is all-or-nothing: every violation found in a single pass is returned
/// together rather than stopping at the first one.
pub struct GraphValidator;

impl GraphValidator {
    /// Run every check and return the full set of violations, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use dagflow::graph::{GraphSpec, GraphValidator};
    ///
    /// let mut spec = GraphSpec::new();
    /// spec.add_edge("square", "multiply");
    /// spec.add_node("multiply");
    ///
    /// assert!(GraphValidator::validate(&spec).is_ok());
    /// ```
    pub fn validate(spec: &GraphSpec) -> Result<(), GraphValidationErrors> {
        let mut errors = Vec::new();

        errors.extend(Self::dangling_references(spec));

        // Cycle detection only makes sense once references resolve; a dangling
        // reference would otherwise be indistinguishable from a missing node during
        // the DFS walk.
        if errors.is_empty() {
            errors.extend(Self::cycles(spec));
        }

        errors.extend(Self::head_checks(spec));
        errors.extend(Self::tail_checks(spec));

        if errors.is_empty() {
            Ok(())
        } else {
            let bundled = GraphValidationErrors(errors);
            GraphValidationFailed {
                error_count: bundled.0.len(),
                summary: &bundled.to_string(),
            }
            .log();
            Err(bundled)
        }
    }

    fn dangling_references(spec: &GraphSpec) -> Vec<GraphValidationError> {
        let mut errors = Vec::new();
        for node in spec.node_names() {
            for target in spec.successors(node) {
                if !spec.contains(target) {
                    errors.push(GraphValidationError::DanglingReference {
                        node: node.clone(),
                        missing: target.clone(),
                    });
                }
            }
        }
        errors
    }

    fn cycles(spec: &GraphSpec) -> Vec<GraphValidationError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut colors: HashMap<&str, Color> =
            spec.node_names().map(|n| (n.as_str(), Color::White)).collect();
        let mut errors = Vec::new();

        fn visit<'a>(
            node: &'a str,
            spec: &'a GraphSpec,
            colors: &mut HashMap<&'a str, Color>,
            stack: &mut Vec<&'a str>,
            errors: &mut Vec<GraphValidationError>,
        ) {
            colors.insert(node, Color::Gray);
            stack.push(node);

            for succ in spec.successors(node) {
                match colors.get(succ.as_str()).copied() {
                    Some(Color::White) | None => {
                        visit(succ.as_str(), spec, colors, stack, errors);
                    }
                    Some(Color::Gray) => {
                        let start = stack.iter().position(|n| *n == succ.as_str()).unwrap_or(0);
                        let mut path: Vec<String> =
                            stack[start..].iter().map(|s| s.to_string()).collect();
                        path.push(succ.clone());
                        errors.push(GraphValidationError::Cycle { path });
                    }
                    Some(Color::Black) => {}
                }
            }

            stack.pop();
            colors.insert(node, Color::Black);
        }

        let mut stack = Vec::new();
        let node_names: Vec<&str> = spec.node_names().map(|s| s.as_str()).collect();
        for node in node_names {
            if colors.get(node).copied() == Some(Color::White) {
                visit(node, spec, &mut colors, &mut stack, &mut errors);
            }
        }
        errors
    }

    fn head_checks(spec: &GraphSpec) -> Vec<GraphValidationError> {
        if spec.is_empty() {
            return Vec::new();
        }
        match spec.heads().len() {
            0 => vec![GraphValidationError::NoHead],
            1 => Vec::new(),
            _ => vec![GraphValidationError::MultipleHeads { heads: spec.heads() }],
        }
    }

    fn tail_checks(spec: &GraphSpec) -> Vec<GraphValidationError> {
        if spec.is_empty() {
            return Vec::new();
        }
        match spec.tails().len() {
            0 => vec![GraphValidationError::NoTail],
            1 => Vec::new(),
            _ => vec![GraphValidationError::MultipleTails { tails: spec.tails() }],
        }
    }

    /// Like [`Self::validate`] but permits multiple heads, which the builder resolves
    /// by synthesizing a `DefaultHead` (see [`crate::job_graph::JobGraph::build`]).
    /// Used internally by the compiler pipeline before head synthesis has happened.
    pub fn validate_allowing_multiple_heads(spec: &GraphSpec) -> Result<(), GraphValidationErrors> {
        let mut errors = Vec::new();
        errors.extend(Self::dangling_references(spec));
        if errors.is_empty() {
            errors.extend(Self::cycles(spec));
        }
        errors.extend(Self::tail_checks(spec));
        if spec.heads().is_empty() && !spec.is_empty() {
            errors.push(GraphValidationError::NoHead);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(GraphValidationErrors(errors))
        }
    }

    /// Validates a collection of independent subgraph "levels", asserting that no
    /// level's `next` targets reach outside that level's own node set.
    pub fn validate_levels(
        levels: &HashMap<String, GraphSpec>,
    ) -> Result<(), GraphValidationErrors> {
        let mut errors = Vec::new();
        for (level_name, spec) in levels {
            let local: HashSet<&str> = spec.node_names().map(|s| s.as_str()).collect();
            for node in spec.node_names() {
                for target in spec.successors(node) {
                    if !local.contains(target.as_str()) {
                        errors.push(GraphValidationError::CrossLevelReference {
                            level: level_name.clone(),
                            node: node.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GraphValidationErrors(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_simple_chain() {
        let mut spec = GraphSpec::new();
        spec.add_edge("a", "b");
        spec.add_node("b");
        assert!(GraphValidator::validate(&spec).is_ok());
    }

    #[test]
    fn rejects_dangling_reference() {
        let mut spec = GraphSpec::new();
        spec.add_edge("a", "ghost");
        let err = GraphValidator::validate(&spec).unwrap_err();
        assert!(err
            .0
            .iter()
            .any(|e| matches!(e, GraphValidationError::DanglingReference { .. })));
    }

    #[test]
    fn rejects_cycles() {
        let mut spec = GraphSpec::new();
        spec.add_edge("a", "b");
        spec.add_edge("b", "a");
        let err = GraphValidator::validate(&spec).unwrap_err();
        assert!(err.0.iter().any(|e| matches!(e, GraphValidationError::Cycle { .. })));
    }

    #[test]
    fn rejects_multiple_heads() {
        let mut spec = GraphSpec::new();
        spec.add_edge("h1", "m");
        spec.add_edge("h2", "m");
        spec.add_node("m");
        let err = GraphValidator::validate(&spec).unwrap_err();
        assert!(err
            .0
            .iter()
            .any(|e| matches!(e, GraphValidationError::MultipleHeads { .. })));
    }

    #[test]
    fn rejects_multiple_tails() {
        let mut spec = GraphSpec::new();
        spec.add_edge("h", "t1");
        spec.add_edge("h", "t2");
        spec.add_node("t1");
        spec.add_node("t2");
        let err = GraphValidator::validate(&spec).unwrap_err();
        assert!(err
            .0
            .iter()
            .any(|e| matches!(e, GraphValidationError::MultipleTails { .. })));
    }

    #[test]
    fn allows_multiple_heads_in_relaxed_mode() {
        let mut spec = GraphSpec::new();
        spec.add_edge("h1", "m");
        spec.add_edge("h2", "m");
        spec.add_node("m");
        assert!(GraphValidator::validate_allowing_multiple_heads(&spec).is_ok());
    }

    #[test]
    fn cross_level_reference_rejected() {
        let mut levels = HashMap::new();
        let mut inner = GraphSpec::new();
        inner.add_edge("a", "outside");
        levels.insert("level1".to_string(), inner);

        let err = GraphValidator::validate_levels(&levels).unwrap_err();
        assert!(err
            .0
            .iter()
            .any(|e| matches!(e, GraphValidationError::CrossLevelReference { .. })));
    }
}
