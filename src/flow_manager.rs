// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`FlowManager`]: the long-lived submission front-end. Registers named graphs,
//! accepts tasks from synchronous callers, runs executions concurrently on the
//! owning `tokio` runtime, and exposes lifecycle counters and result buffers.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;

use crate::dsl::{compile, Dsl};
use crate::errors::{FlowError, JobRunError, SubmissionError};
use crate::executor::Executor;
use crate::job_graph::JobGraph;
use crate::observability::messages::flow_manager::{
    TaskCompleted, TaskFailed, TaskSubmitted, WaitingForCompletion, WorkflowAdded,
};
use crate::observability::messages::StructuredLog;
use crate::task::Task;

/// A graph's external identity, distinct from the four-part job FQ-name grammar:
/// `graph_name$$variant` (no short name, no trailing separator), used to address a
/// whole registered graph rather than one of its jobs.
fn graph_fq(graph_name: &str, variant: &str) -> String {
    format!("{graph_name}$${variant}")
}

/// A task that failed during execution, recorded in [`ResultBuffers::errors`].
#[derive(Debug, Clone)]
pub struct ErrorEntry {
    pub task_id: String,
    pub error: String,
}

/// The two buffers [`FlowManager::pop_results`] atomically drains.
#[derive(Debug, Default)]
pub struct ResultBuffers {
    pub completed: HashMap<String, Vec<Value>>,
    pub errors: HashMap<String, Vec<ErrorEntry>>,
}

/// Either a bare DSL value for the default variant, or a variant-keyed map of DSL
/// values, the two shapes [`FlowManager::add_dsl_dict`] accepts per graph name.
pub enum DslDictEntry {
    Single(Dsl),
    Variants(HashMap<String, Dsl>),
}

type OnCompleteCallback = Arc<dyn Fn(&Value) + Send + Sync>;

static INSTANCE: OnceLock<Mutex<Option<FlowManager>>> = OnceLock::new();

struct Inner {
    graphs: Mutex<HashMap<String, Arc<JobGraph>>>,
    registered: Mutex<HashSet<String>>,
    submitted: AtomicU64,
    completed: AtomicU64,
    errors: AtomicU64,
    buffers: Mutex<ResultBuffers>,
    on_complete: Mutex<Option<OnCompleteCallback>>,
}

/// Cheaply cloneable handle to the shared submission state; every clone refers to
/// the same graphs, counters, and buffers.
#[derive(Clone)]
pub struct FlowManager(Arc<Inner>);

impl Default for FlowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowManager {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            graphs: Mutex::new(HashMap::new()),
            registered: Mutex::new(HashSet::new()),
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            buffers: Mutex::new(ResultBuffers::default()),
            on_complete: Mutex::new(None),
        }))
    }

    /// Compile, validate, and wire `dsl` under `graph_name`/`variant`, returning its
    /// graph FQ name. Idempotent for a repeated `(graph_name, variant)` pair: the
    /// Rust-idiomatic substitute for the Python original's per-DSL-object identity
    /// check, since a composed [`Dsl`] owns its jobs by value rather than by
    /// reference (see DESIGN.md).
    pub fn add_workflow(&self, dsl: Dsl, graph_name: &str, variant: &str) -> Result<String, FlowError> {
        let fq = graph_fq(graph_name, variant);
        if self.0.registered.lock().contains(&fq) {
            return Ok(fq);
        }

        let compiled = compile(dsl);
        let graph = JobGraph::build(compiled, graph_name, variant)?;
        let node_count = graph.len();
        let graph = Arc::new(graph);

        self.0.graphs.lock().insert(fq.clone(), graph);
        self.0.registered.lock().insert(fq.clone());
        WorkflowAdded { fq_name: &fq, node_count }.log();
        Ok(fq)
    }

    /// Add many graphs at once, supporting both the plain `{graph_name: dsl}` and
    /// the variant-keyed `{graph_name: {variant: dsl}}` shapes.
    pub fn add_dsl_dict(
        &self,
        dict: HashMap<String, DslDictEntry>,
    ) -> Result<Vec<String>, FlowError> {
        let mut fq_names = Vec::new();
        for (graph_name, entry) in dict {
            match entry {
                DslDictEntry::Single(dsl) => {
                    fq_names.push(self.add_workflow(dsl, &graph_name, "")?);
                }
                DslDictEntry::Variants(variants) => {
                    for (variant, dsl) in variants {
                        fq_names.push(self.add_workflow(dsl, &graph_name, &variant)?);
                    }
                }
            }
        }
        Ok(fq_names)
    }

    /// Submit one or more tasks against an already-registered graph FQ name.
    pub fn submit_task(&self, tasks: Vec<Task>, fq_name: &str) -> Result<(), FlowError> {
        let graph = self
            .0
            .graphs
            .lock()
            .get(fq_name)
            .cloned()
            .ok_or_else(|| SubmissionError::UnknownFqName { fq_name: fq_name.to_string() })?;

        for task in tasks {
            self.spawn_execution(graph.clone(), task, fq_name.to_string());
        }
        Ok(())
    }

    /// Submit a single task by `graph_name`/`variant` rather than a full FQ name.
    /// An empty `variant` matches any registered variant of `graph_name`, failing
    /// if that matches zero or more than one registered graph.
    pub fn submit_short(&self, task: Task, graph_name: &str, variant: &str) -> Result<(), FlowError> {
        let fq = if variant.is_empty() {
            let prefix = format!("{graph_name}$$");
            let matches: Vec<String> = self
                .0
                .graphs
                .lock()
                .keys()
                .filter(|fq| fq.starts_with(&prefix))
                .cloned()
                .collect();
            match matches.len() {
                1 => matches.into_iter().next().unwrap(),
                0 => {
                    return Err(SubmissionError::UnknownFqName { fq_name: graph_name.to_string() }.into())
                }
                _ => {
                    return Err(SubmissionError::AmbiguousShortName {
                        graph_name: graph_name.to_string(),
                        variant: variant.to_string(),
                        matches,
                    }
                    .into())
                }
            }
        } else {
            graph_fq(graph_name, variant)
        };
        self.submit_task(vec![task], &fq)
    }

    fn spawn_execution(&self, graph: Arc<JobGraph>, task: Task, fq_name: String) {
        let task_id = task.task_id.clone();
        self.0.submitted.fetch_add(1, Ordering::SeqCst);
        TaskSubmitted { fq_name: &fq_name, task_id: &task_id }.log();

        let inner = self.0.clone();
        tokio::spawn(async move {
            match Executor::execute(graph, task).await {
                Ok(envelope) => {
                    inner.completed.fetch_add(1, Ordering::SeqCst);
                    TaskCompleted { fq_name: &fq_name, task_id: &task_id }.log();
                    let callback = inner.on_complete.lock().clone();
                    inner
                        .buffers
                        .lock()
                        .completed
                        .entry(fq_name.clone())
                        .or_default()
                        .push(envelope.clone());
                    if let Some(callback) = callback {
                        callback(&envelope);
                    }
                }
                Err(err) => {
                    inner.errors.fetch_add(1, Ordering::SeqCst);
                    TaskFailed { fq_name: &fq_name, task_id: &task_id, error: &err }.log();
                    inner.buffers.lock().errors.entry(fq_name).or_default().push(ErrorEntry {
                        task_id,
                        error: err.to_string(),
                    });
                }
            }
        });
    }

    /// Register a callback invoked once per successfully completed task, in
    /// addition to (not instead of) buffering its envelope in [`ResultBuffers`].
    pub fn on_complete<F>(&self, callback: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        *self.0.on_complete.lock() = Some(Arc::new(callback));
    }

    /// Poll until `submitted == completed + errors` or `timeout` elapses, logging
    /// status every `log_interval`. Returns `Ok(true)` on completion, `Ok(false)`
    /// on timeout, or `Err` if `raise_on_error` is set and any task failed.
    pub async fn wait_for_completion(
        &self,
        timeout: Duration,
        check_interval: Duration,
        log_interval: Duration,
        raise_on_error: bool,
    ) -> Result<bool, FlowError> {
        let start = Instant::now();
        let mut last_logged = Instant::now();

        loop {
            let submitted = self.0.submitted.load(Ordering::SeqCst);
            let completed = self.0.completed.load(Ordering::SeqCst);
            let errors = self.0.errors.load(Ordering::SeqCst);

            if submitted == completed + errors {
                if raise_on_error && errors > 0 {
                    return Err(FlowError::JobRun(JobRunError {
                        job: "*".to_string(),
                        source: anyhow::anyhow!("{errors} of {submitted} task(s) failed"),
                    }));
                }
                return Ok(true);
            }

            if start.elapsed() >= timeout {
                return Ok(false);
            }

            if last_logged.elapsed() >= log_interval {
                WaitingForCompletion { submitted, completed, errors }.log();
                last_logged = Instant::now();
            }

            tokio::time::sleep(check_interval).await;
        }
    }

    /// Atomically drain and return both result buffers.
    pub fn pop_results(&self) -> ResultBuffers {
        std::mem::take(&mut *self.0.buffers.lock())
    }

    /// One-shot convenience: register `dsl` if given, submit `task`, wait, and
    /// return `(error_count, result)` for that task's graph.
    pub async fn execute(
        &self,
        task: Task,
        dsl: Option<Dsl>,
        graph_name: &str,
        variant: &str,
        timeout: Duration,
    ) -> Result<(u64, Option<Value>), FlowError> {
        let fq = match dsl {
            Some(dsl) => self.add_workflow(dsl, graph_name, variant)?,
            None => graph_fq(graph_name, variant),
        };
        self.submit_task(vec![task], &fq)?;
        self.wait_for_completion(timeout, Duration::from_millis(10), Duration::from_secs(5), false)
            .await?;

        let mut buffers = self.pop_results();
        let result = buffers.completed.remove(&fq).and_then(|mut envelopes| envelopes.pop());
        let error_count = buffers.errors.remove(&fq).map(|errs| errs.len() as u64).unwrap_or(0);
        Ok((error_count, result))
    }

    /// Process-wide singleton accessor. `reset_instance` is intended for tests;
    /// Rust has no private-to-tests visibility, so it is exposed as a normal
    /// associated function rather than gated behind `#[cfg(test)]`.
    pub fn instance() -> FlowManager {
        let cell = INSTANCE.get_or_init(|| Mutex::new(None));
        let mut guard = cell.lock();
        guard.get_or_insert_with(FlowManager::new).clone()
    }

    pub fn reset_instance() {
        let cell = INSTANCE.get_or_init(|| Mutex::new(None));
        *cell.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::job;
    use serde_json::json;

    fn demo_dsl() -> Dsl {
        job("square", |view: crate::dsl::job::TaskView| async move {
            let x = view.own_param("x").and_then(Value::as_i64).unwrap_or(0);
            Ok(json!({ "result": x * x }))
        })
    }

    #[tokio::test]
    async fn add_workflow_is_idempotent_for_the_same_name_and_variant() {
        let fm = FlowManager::new();
        let first = fm.add_workflow(demo_dsl(), "demo", "").unwrap();
        let second = fm.add_workflow(demo_dsl(), "demo", "").unwrap();
        assert_eq!(first, second);
        assert_eq!(fm.0.graphs.lock().len(), 1);
    }

    #[tokio::test]
    async fn submit_and_wait_delivers_a_completed_result() {
        let fm = FlowManager::new();
        let fq = fm.add_workflow(demo_dsl(), "demo", "").unwrap();

        let mut data = serde_json::Map::new();
        data.insert("square.x".to_string(), json!(5));
        fm.submit_task(vec![Task::new(data, None)], &fq).unwrap();

        let done = fm
            .wait_for_completion(Duration::from_secs(1), Duration::from_millis(5), Duration::from_secs(60), false)
            .await
            .unwrap();
        assert!(done);

        let mut results = fm.pop_results();
        let envelope = results.completed.remove(&fq).unwrap().pop().unwrap();
        assert_eq!(envelope["result"], json!(25));
    }

    #[tokio::test]
    async fn submit_task_to_unknown_fq_name_is_a_submission_error() {
        let fm = FlowManager::new();
        let err = fm.submit_task(vec![Task::new(serde_json::Map::new(), None)], "missing$$").unwrap_err();
        assert!(matches!(err, FlowError::Submission(SubmissionError::UnknownFqName { .. })));
    }

    fn sleeping_dsl() -> Dsl {
        job("sleeper", |_view: crate::dsl::job::TaskView| async move {
            tokio::time::sleep(Duration::from_millis(1000)).await;
            Ok(json!({ "result": "done" }))
        })
    }

    #[tokio::test]
    async fn five_hundred_tasks_on_a_one_second_job_complete_well_under_serial_time() {
        let fm = FlowManager::new();
        let fq = fm.add_workflow(sleeping_dsl(), "sleepy", "").unwrap();

        let start = Instant::now();
        for _ in 0..500 {
            fm.submit_task(vec![Task::new(serde_json::Map::new(), None)], &fq).unwrap();
        }
        let done = fm
            .wait_for_completion(Duration::from_secs(5), Duration::from_millis(5), Duration::from_secs(60), false)
            .await
            .unwrap();
        assert!(done);
        assert!(start.elapsed() < Duration::from_millis(1400));
    }

    #[tokio::test]
    async fn reset_instance_clears_the_singleton_instance_actually_observes() {
        let first = FlowManager::instance();
        let again = FlowManager::instance();
        assert!(Arc::ptr_eq(&first.0, &again.0));

        FlowManager::reset_instance();
        let fresh = FlowManager::instance();
        assert!(!Arc::ptr_eq(&first.0, &fresh.0));
    }

    #[tokio::test]
    async fn submit_short_resolves_a_single_variant() {
        let fm = FlowManager::new();
        fm.add_workflow(demo_dsl(), "demo", "v1").unwrap();

        let mut data = serde_json::Map::new();
        data.insert("square.x".to_string(), json!(3));
        fm.submit_short(Task::new(data, None), "demo", "v1").unwrap();

        fm.wait_for_completion(Duration::from_secs(1), Duration::from_millis(5), Duration::from_secs(60), false)
            .await
            .unwrap();
        let results = fm.pop_results();
        assert_eq!(results.completed.len(), 1);
    }
}
