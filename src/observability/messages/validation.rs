// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph validation outcomes.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A [`crate::graph::GraphSpec`] passed validation.
///
/// # Example
/// ```
/// use dagflow::observability::messages::validation::GraphValidated;
///
/// let msg = GraphValidated { node_count: 4 };
/// tracing::info!("{}", msg);
/// ```
pub struct GraphValidated {
    pub node_count: usize,
}

impl Display for GraphValidated {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Graph validated: {} nodes", self.node_count)
    }
}

impl StructuredLog for GraphValidated {
    fn log(&self) {
        tracing::info!(node_count = self.node_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("graph_validated", span_name = name, node_count = self.node_count)
    }
}

/// Graph validation failed with one or more errors.
///
/// # Example
/// ```
/// use dagflow::observability::messages::validation::GraphValidationFailed;
///
/// let msg = GraphValidationFailed { error_count: 2, summary: "cycle, dangling reference" };
/// tracing::error!("{}", msg);
/// ```
pub struct GraphValidationFailed<'a> {
    pub error_count: usize,
    pub summary: &'a str,
}

impl Display for GraphValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph validation failed with {} error(s): {}",
            self.error_count, self.summary
        )
    }
}

impl StructuredLog for GraphValidationFailed<'_> {
    fn log(&self) {
        tracing::error!(error_count = self.error_count, summary = self.summary, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "graph_validation_failed",
            span_name = name,
            error_count = self.error_count,
            summary = self.summary,
        )
    }
}
