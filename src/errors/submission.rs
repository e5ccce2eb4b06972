use thiserror::Error;

/// Errors raised synchronously by [`crate::flow_manager::FlowManager`] submission calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("no graph registered under fq_name '{fq_name}'")]
    UnknownFqName { fq_name: String },

    #[error("graph_name '{graph_name}' variant '{variant}' matches {} graphs, expected exactly one: {}", matches.len(), matches.join(", "))]
    AmbiguousShortName {
        graph_name: String,
        variant: String,
        matches: Vec<String>,
    },

    #[error("no graphs have been registered with this FlowManager yet")]
    GraphNotRegistered,
}
