// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for dataflow executor lifecycle: job activation, join waits,
//! fan-out, and tail-result propagation.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A job activation began for a task.
///
/// # Example
/// ```
/// use dagflow::observability::messages::executor::JobActivated;
///
/// let msg = JobActivated { job: "g$$$$square$$", task_id: "t-1" };
/// tracing::debug!("{}", msg);
/// ```
pub struct JobActivated<'a> {
    pub job: &'a str,
    pub task_id: &'a str,
}

impl Display for JobActivated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Job '{}' activated for task {}", self.job, self.task_id)
    }
}

impl StructuredLog for JobActivated<'_> {
    fn log(&self) {
        tracing::debug!(job = self.job, task_id = self.task_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("job_activated", span_name = name, job = self.job, task_id = self.task_id)
    }
}

/// A job's second-or-later activator observed the once-flag already set and bailed.
pub struct JobAlreadyStarted<'a> {
    pub job: &'a str,
    pub task_id: &'a str,
}

impl Display for JobAlreadyStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Job '{}' already started for task {}; later activator returning early",
            self.job, self.task_id
        )
    }
}

impl StructuredLog for JobAlreadyStarted<'_> {
    fn log(&self) {
        tracing::trace!(job = self.job, task_id = self.task_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!("job_already_started", span_name = name, job = self.job, task_id = self.task_id)
    }
}

/// A job finished executing and its result was fanned out to its successors.
pub struct JobCompleted<'a> {
    pub job: &'a str,
    pub task_id: &'a str,
    pub successor_count: usize,
    pub duration: std::time::Duration,
}

impl Display for JobCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Job '{}' completed for task {} in {:?}, fanning out to {} successor(s)",
            self.job, self.task_id, self.duration, self.successor_count
        )
    }
}

impl StructuredLog for JobCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            job = self.job,
            task_id = self.task_id,
            successor_count = self.successor_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "job_completed",
            span_name = name,
            job = self.job,
            task_id = self.task_id,
            successor_count = self.successor_count,
        )
    }
}

/// A job's join wait exceeded its configured timeout.
pub struct JoinTimedOut<'a> {
    pub job: &'a str,
    pub task_id: &'a str,
    pub expected: &'a [String],
    pub received: &'a [String],
}

impl Display for JoinTimedOut<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Join timeout on '{}' for task {}: expected {:?}, received {:?}",
            self.job, self.task_id, self.expected, self.received
        )
    }
}

impl StructuredLog for JoinTimedOut<'_> {
    fn log(&self) {
        tracing::error!(
            job = self.job,
            task_id = self.task_id,
            expected = ?self.expected,
            received = ?self.received,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("join_timed_out", span_name = name, job = self.job, task_id = self.task_id)
    }
}

/// A concrete job's `run` returned an error.
pub struct JobRunFailed<'a> {
    pub job: &'a str,
    pub task_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for JobRunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Job '{}' failed for task {}: {}", self.job, self.task_id, self.error)
    }
}

impl StructuredLog for JobRunFailed<'_> {
    fn log(&self) {
        tracing::error!(job = self.job, task_id = self.task_id, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "job_run_failed",
            span_name = name,
            job = self.job,
            task_id = self.task_id,
            error = %self.error,
        )
    }
}
