// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`Task`] and [`TaskContext`]: the per-submission payload and the scoped state the
//! [`crate::executor::Executor`] threads through a single traversal of a
//! [`crate::job_graph::JobGraph`].

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::job_graph::JobGraph;

/// Reserved key in a submitted task naming the target graph.
pub const FQ_NAME_KEY: &str = "fq_name";

/// A single input mapping submitted by a caller, carrying a generated unique id.
///
/// Equality and hashing are by `task_id` only, mirroring the Python original's
/// `Task(dict)` subtype.
#[derive(Debug, Clone)]
pub struct Task {
    pub task_id: String,
    pub data: Map<String, Value>,
}

impl Task {
    /// Wrap `data` as a new task, stamping it with a fresh id. If `fq_name` is given
    /// and the data does not already carry an `fq_name` key, it is recorded.
    pub fn new(mut data: Map<String, Value>, fq_name: Option<&str>) -> Self {
        if let Some(fq_name) = fq_name {
            data.entry(FQ_NAME_KEY.to_string())
                .or_insert_with(|| Value::String(fq_name.to_string()));
        }
        Self {
            task_id: Uuid::new_v4().to_string(),
            data,
        }
    }

    pub fn fq_name(&self) -> Option<&str> {
        self.data.get(FQ_NAME_KEY).and_then(Value::as_str)
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.data.clone())
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.task_id == other.task_id
    }
}
impl Eq for Task {}

impl std::hash::Hash for Task {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.task_id.hash(state);
    }
}

/// Per-job join gate for a single task: accumulated predecessor inputs, a one-shot
/// ready signal, and the once-flag that guarantees at-most-one execution.
pub struct JoinState {
    pub inputs: Mutex<HashMap<String, Value>>,
    pub ready: Notify,
    pub started: AtomicBool,
}

impl JoinState {
    fn new() -> Self {
        Self {
            inputs: Mutex::new(HashMap::new()),
            ready: Notify::new(),
            started: AtomicBool::new(false),
        }
    }
}

/// Per-task scoped state: one [`JoinState`] per job in the graph, a saved-results
/// map, the original task payload, and a free-form shared bag.
///
/// Lives exactly as long as one [`crate::executor::Executor::execute`] call. Unlike
/// the Python original, which stores this in a `ContextVar` restored around each
/// scheduler suspension point, this implementation threads an `Arc<TaskContext>`
/// explicitly through the recursive execution calls (see SPEC_FULL.md §9).
pub struct TaskContext {
    pub task_id: String,
    join_states: HashMap<String, JoinState>,
    pub saved_results: Mutex<HashMap<String, Value>>,
    pub task_passthrough: Mutex<Option<Value>>,
    pub shared_bag: Arc<SyncMutex<Value>>,
}

impl TaskContext {
    pub fn new(graph: &JobGraph, task_id: String) -> Self {
        let join_states = graph
            .fq_names()
            .map(|fq| (fq.to_string(), JoinState::new()))
            .collect();
        Self {
            task_id,
            join_states,
            saved_results: Mutex::new(HashMap::new()),
            task_passthrough: Mutex::new(None),
            shared_bag: Arc::new(SyncMutex::new(Value::Object(Map::new()))),
        }
    }

    pub fn join_state(&self, fq_name: &str) -> &JoinState {
        self.join_states
            .get(fq_name)
            .unwrap_or_else(|| panic!("no JoinState registered for job '{fq_name}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_are_equal_only_by_id() {
        let mut data = Map::new();
        data.insert("x".to_string(), Value::from(1));
        let a = Task::new(data.clone(), None);
        let b = Task::new(data, None);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn fq_name_key_is_recorded_when_absent() {
        let task = Task::new(Map::new(), Some("g$$$$head$$"));
        assert_eq!(task.fq_name(), Some("g$$$$head$$"));
    }

    #[test]
    fn existing_fq_name_key_is_not_overridden() {
        let mut data = Map::new();
        data.insert(FQ_NAME_KEY.to_string(), Value::from("explicit$$$$head$$"));
        let task = Task::new(data, Some("other$$$$head$$"));
        assert_eq!(task.fq_name(), Some("explicit$$$$head$$"));
    }
}
