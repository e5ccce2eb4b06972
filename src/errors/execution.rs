use std::collections::BTreeSet;

use thiserror::Error;

/// A job's join wait exceeded `job.timeout` before its expected inputs all arrived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("join timeout on '{job}': expected {expected:?}, received {received:?}")]
pub struct JoinTimeout {
    pub job: String,
    pub expected: BTreeSet<String>,
    pub received: BTreeSet<String>,
}

/// A concrete job's `run` returned an error.
#[derive(Debug, Error)]
#[error("job '{job}' failed: {source}")]
pub struct JobRunError {
    pub job: String,
    #[source]
    pub source: anyhow::Error,
}

/// Unified error type returned by [`crate::executor::Executor::execute`] and the
/// [`crate::flow_manager::FlowManager`] completion handler.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] super::graph::GraphValidationErrors),

    #[error(transparent)]
    Submission(#[from] super::submission::SubmissionError),

    #[error(transparent)]
    JoinTimeout(#[from] JoinTimeout),

    #[error(transparent)]
    JobRun(#[from] JobRunError),

    #[error(transparent)]
    Mp(#[from] super::mp::MpError),
}
