// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for `FlowManager`/`FlowManagerMp` submission, completion, and
//! shutdown events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A workflow (DSL or config-loaded graph) was registered.
pub struct WorkflowAdded<'a> {
    pub fq_name: &'a str,
    pub node_count: usize,
}

impl Display for WorkflowAdded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Registered workflow '{}' with {} nodes", self.fq_name, self.node_count)
    }
}

impl StructuredLog for WorkflowAdded<'_> {
    fn log(&self) {
        tracing::info!(fq_name = self.fq_name, node_count = self.node_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("workflow_added", span_name = name, fq_name = self.fq_name)
    }
}

/// A task was accepted and handed to the scheduler.
pub struct TaskSubmitted<'a> {
    pub fq_name: &'a str,
    pub task_id: &'a str,
}

impl Display for TaskSubmitted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Submitted task {} to '{}'", self.task_id, self.fq_name)
    }
}

impl StructuredLog for TaskSubmitted<'_> {
    fn log(&self) {
        tracing::debug!(fq_name = self.fq_name, task_id = self.task_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("task_submitted", span_name = name, fq_name = self.fq_name, task_id = self.task_id)
    }
}

/// A task completed successfully and its envelope was buffered / delivered to the callback.
pub struct TaskCompleted<'a> {
    pub fq_name: &'a str,
    pub task_id: &'a str,
}

impl Display for TaskCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Task {} on '{}' completed", self.task_id, self.fq_name)
    }
}

impl StructuredLog for TaskCompleted<'_> {
    fn log(&self) {
        tracing::info!(fq_name = self.fq_name, task_id = self.task_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("task_completed", span_name = name, fq_name = self.fq_name, task_id = self.task_id)
    }
}

/// A task failed and was recorded in the errors buffer.
pub struct TaskFailed<'a> {
    pub fq_name: &'a str,
    pub task_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for TaskFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Task {} on '{}' failed: {}", self.task_id, self.fq_name, self.error)
    }
}

impl StructuredLog for TaskFailed<'_> {
    fn log(&self) {
        tracing::error!(fq_name = self.fq_name, task_id = self.task_id, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "task_failed",
            span_name = name,
            fq_name = self.fq_name,
            task_id = self.task_id,
            error = %self.error,
        )
    }
}

/// `wait_for_completion` is still polling.
pub struct WaitingForCompletion {
    pub submitted: u64,
    pub completed: u64,
    pub errors: u64,
}

impl Display for WaitingForCompletion {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Waiting for completion: submitted={}, completed={}, errors={}",
            self.submitted, self.completed, self.errors
        )
    }
}

impl StructuredLog for WaitingForCompletion {
    fn log(&self) {
        tracing::info!(
            submitted = self.submitted,
            completed = self.completed,
            errors = self.errors,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("waiting_for_completion", span_name = name, submitted = self.submitted)
    }
}

/// An MP-variant worker or result-processor thread shut down.
pub struct WorkerShutDown<'a> {
    pub role: &'a str,
}

impl Display for WorkerShutDown<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} thread shut down", self.role)
    }
}

impl StructuredLog for WorkerShutDown<'_> {
    fn log(&self) {
        tracing::info!(role = self.role, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("worker_shut_down", span_name = name, role = self.role)
    }
}
