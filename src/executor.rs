// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`Executor`]: the recursive dataflow algorithm that walks a [`JobGraph`] for one
//! [`Task`], honoring join gates, at-most-once-per-job execution, and tail-result
//! propagation.

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::dsl::job::TaskView;
use crate::errors::{FlowError, JobRunError, JoinTimeout};
use crate::job_graph::{BoxFuture, JobGraph, JobRecord};
use crate::observability::messages::executor::{
    JobActivated, JobAlreadyStarted, JobCompleted, JobRunFailed, JoinTimedOut,
};
use crate::observability::messages::StructuredLog;
use crate::task::{Task, TaskContext};

/// Key naming the FQ name of the tail job that produced a result envelope.
pub const RETURN_JOB_KEY: &str = "RETURN_JOB";
/// Key under which the original submitted task is recorded in a result envelope.
pub const TASK_PASSTHROUGH_KEY: &str = "task_pass_through";
/// Key under which opted-in intermediate results are recorded in a result envelope.
pub const SAVED_RESULTS_KEY: &str = "SAVED_RESULTS";

/// Stateless entry point for running one [`Task`] through a [`JobGraph`]. All
/// per-task state lives in the [`TaskContext`] created for the duration of the
/// call; the graph itself is never mutated.
pub struct Executor;

impl Executor {
    /// Run `task` through `graph`, returning the tail's result envelope.
    pub async fn execute(graph: Arc<JobGraph>, task: Task) -> Result<Value, FlowError> {
        Self::execute_with_cancellation(graph, task, CancellationToken::new()).await
    }

    /// Like [`Self::execute`] but accepts an externally owned [`CancellationToken`],
    /// letting a [`crate::flow_manager::FlowManager`]-level shutdown abort an
    /// in-flight join promptly instead of waiting out its full timeout.
    pub async fn execute_with_cancellation(
        graph: Arc<JobGraph>,
        task: Task,
        cancel: CancellationToken,
    ) -> Result<Value, FlowError> {
        let ctx = Arc::new(TaskContext::new(&graph, task.task_id.clone()));
        *ctx.task_passthrough.lock().await = Some(task.as_value());

        let head_fq = graph.head().to_string();
        let result = Self::activate(graph, head_fq, ctx, cancel).await?;
        // The head always leads to exactly one tail activation, which always
        // returns `Some`; every other path returns `None`. `execute` is only ever
        // called at the head, so `result` is `Some` unless the graph is empty.
        Ok(result.unwrap_or(Value::Null))
    }

    /// Activate `job_fq` for the task scoped by `ctx`. Returns `Ok(Some(envelope))`
    /// only from the tail activation; every non-tail path, and every activator that
    /// loses the once-flag race, returns `Ok(None)`.
    fn activate(
        graph: Arc<JobGraph>,
        job_fq: String,
        ctx: Arc<TaskContext>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Option<Value>, FlowError>> {
        Box::pin(async move {
            let record = graph
                .get(&job_fq)
                .unwrap_or_else(|| panic!("activation for unknown job '{job_fq}'"));

            JobActivated { job: &job_fq, task_id: &ctx.task_id }.log();

            if !record.expected_inputs.is_empty() {
                let join = ctx.join_state(&job_fq);
                if join.started.swap(true, Ordering::SeqCst) {
                    JobAlreadyStarted { job: &job_fq, task_id: &ctx.task_id }.log();
                    return Ok(None);
                }

                let notified = join.ready.notified();
                tokio::select! {
                    _ = notified => {}
                    _ = tokio::time::sleep(record.timeout) => {
                        join.started.store(false, Ordering::SeqCst);
                        let received: BTreeSet<String> =
                            join.inputs.lock().await.keys().cloned().collect();
                        let expected = record.expected_inputs.clone();
                        let expected_list: Vec<String> = expected.iter().cloned().collect();
                        let received_list: Vec<String> = received.iter().cloned().collect();
                        JoinTimedOut {
                            job: &job_fq,
                            task_id: &ctx.task_id,
                            expected: &expected_list,
                            received: &received_list,
                        }
                        .log();
                        return Err(FlowError::JoinTimeout(JoinTimeout {
                            job: job_fq.clone(),
                            expected,
                            received,
                        }));
                    }
                    _ = cancel.cancelled() => {
                        return Ok(None);
                    }
                }
            }

            let started_at = Instant::now();
            let view = Self::build_view(&graph, record, &ctx).await;
            let raw_result = match record.job.run(view).await {
                Ok(value) => value,
                Err(source) => {
                    let err = JobRunError { job: job_fq.clone(), source };
                    JobRunFailed { job: &job_fq, task_id: &ctx.task_id, error: &err }.log();
                    return Err(FlowError::JobRun(err));
                }
            };

            if record.save_result {
                ctx.saved_results
                    .lock()
                    .await
                    .insert(record.fq_name.clone(), raw_result.clone());
            }

            if record.next_jobs.is_empty() {
                let envelope = Self::finalize_envelope(record, &graph, &ctx, raw_result).await;
                return Ok(Some(envelope));
            }

            JobCompleted {
                job: &job_fq,
                task_id: &ctx.task_id,
                successor_count: record.next_jobs.len(),
                duration: started_at.elapsed(),
            }
            .log();

            let mut children = tokio::task::JoinSet::new();
            for next_fq in &record.next_jobs {
                let next_record = graph
                    .get(next_fq)
                    .unwrap_or_else(|| panic!("next_jobs references unknown job '{next_fq}'"));
                Self::receive_input(&ctx, next_record, job_fq.clone(), raw_result.clone()).await;

                let graph = graph.clone();
                let ctx = ctx.clone();
                let cancel = cancel.clone();
                let next_fq = next_fq.clone();
                children.spawn(async move { Self::activate(graph, next_fq, ctx, cancel).await });
            }

            let mut tail_result = None;
            let mut first_error = None;
            while let Some(joined) = children.join_next().await {
                match joined {
                    Ok(Ok(Some(value))) => {
                        if tail_result.is_none() {
                            tail_result = Some(value);
                        }
                    }
                    Ok(Ok(None)) => {}
                    Ok(Err(err)) => {
                        if first_error.is_none() {
                            // A sibling branch may be stuck forever in a job that
                            // never resolves (e.g. Scenario E's non-publishing
                            // predecessor); abandon it rather than waiting it out,
                            // matching "in-flight child activations ... are
                            // discarded" once this task has already failed.
                            children.abort_all();
                            first_error = Some(err);
                        }
                    }
                    Err(join_err) => {
                        if first_error.is_none() {
                            children.abort_all();
                            first_error = Some(FlowError::JobRun(JobRunError {
                                job: job_fq.clone(),
                                source: anyhow::anyhow!(join_err.to_string()),
                            }));
                        }
                    }
                }
            }

            if let Some(err) = first_error {
                return Err(err);
            }
            Ok(tail_result)
        })
    }

    /// Record `data` as `from`'s contribution to `to`'s join, notifying the gate if
    /// this completes the expected-input set.
    async fn receive_input(ctx: &TaskContext, to: &JobRecord, from: String, data: Value) {
        let join = ctx.join_state(&to.fq_name);
        let mut inputs = join.inputs.lock().await;
        inputs.insert(from, data);
        if to.expected_inputs.iter().all(|e| inputs.contains_key(e)) {
            join.ready.notify_one();
        }
    }

    /// Assemble the [`TaskView`] a job's `run` sees: predecessor results translated
    /// from FQ names to short names, the original task payload, and the shared bag.
    async fn build_view(graph: &JobGraph, record: &JobRecord, ctx: &TaskContext) -> TaskView {
        let inputs = if record.expected_inputs.is_empty() {
            std::collections::HashMap::new()
        } else {
            let join = ctx.join_state(&record.fq_name);
            let delivered = join.inputs.lock().await;
            delivered
                .iter()
                .filter_map(|(from_fq, value)| {
                    graph.get(from_fq).map(|r| (r.short_name.clone(), value.clone()))
                })
                .collect()
        };
        let task = ctx.task_passthrough.lock().await.clone().unwrap_or(Value::Null);
        TaskView::new(record.short_name.clone(), inputs, task, ctx.shared_bag.clone())
    }

    /// Build the final result envelope: the tail job's own fields (or
    /// `{"result": value}` if it returned a non-object), plus `RETURN_JOB`,
    /// `task_pass_through`, and `SAVED_RESULTS` if any job opted in.
    async fn finalize_envelope(
        record: &JobRecord,
        graph: &JobGraph,
        ctx: &TaskContext,
        result: Value,
    ) -> Value {
        let mut envelope = match result {
            Value::Object(map) => map,
            other => {
                let mut wrapped = Map::new();
                wrapped.insert("result".to_string(), other);
                wrapped
            }
        };

        envelope.insert(RETURN_JOB_KEY.to_string(), Value::String(record.fq_name.clone()));

        let passthrough = ctx.task_passthrough.lock().await.clone().unwrap_or(Value::Null);
        envelope.insert(TASK_PASSTHROUGH_KEY.to_string(), passthrough);

        let saved = ctx.saved_results.lock().await;
        if !saved.is_empty() {
            let mut saved_map = Map::new();
            for (fq, value) in saved.iter() {
                let short = graph
                    .get(fq)
                    .map(|r| r.short_name.clone())
                    .unwrap_or_else(|| fq.clone());
                saved_map.insert(short, value.clone());
            }
            envelope.insert(SAVED_RESULTS_KEY.to_string(), Value::Object(saved_map));
        }

        Value::Object(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{compile, job};
    use crate::job_graph::JobGraph;
    use serde_json::json;
    use std::time::Duration;

    fn build_graph(dsl: crate::dsl::Dsl) -> Arc<JobGraph> {
        let compiled = compile(dsl);
        Arc::new(JobGraph::build(compiled, "test", "").unwrap())
    }

    #[tokio::test]
    async fn linear_chain_aggregates_context_and_saves_results() {
        let square = job("square", |view: TaskView| async move {
            let x = view.own_param("x").and_then(Value::as_i64).unwrap_or(0);
            Ok(json!({ "result": x * x }))
        });
        let multiply = job("multiply", |view: TaskView| async move {
            let squared = view
                .input("square")
                .and_then(|v| v.get("result"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            Ok(json!({ "result": squared * 10 }))
        });

        let graph = build_graph(square.save_result() >> multiply);
        let task = Task::new(
            serde_json::json!({ "square.x": 4 }).as_object().unwrap().clone(),
            None,
        );
        let envelope = Executor::execute(graph, task).await.unwrap();

        assert_eq!(envelope["result"], json!(160));
        assert_eq!(envelope[SAVED_RESULTS_KEY]["square"], json!({ "result": 16 }));
        assert_eq!(envelope[TASK_PASSTHROUGH_KEY]["square.x"], json!(4));
    }

    #[tokio::test]
    async fn fan_in_join_runs_exactly_once_with_both_inputs() {
        let once = job("once", |view: TaskView| async move {
            let x = view.own_param("x").and_then(Value::as_str).unwrap_or("").to_string();
            Ok(json!({ "result": format!("{x}upon a time") }))
        });
        let ina = job("ina", |view: TaskView| async move {
            let x = view.own_param("x").and_then(Value::as_str).unwrap_or("").to_string();
            Ok(json!({ "result": format!("{x}galaxy far far away") }))
        });
        let collate = job("collate", |view: TaskView| async move {
            let a = view.input("once").and_then(|v| v.get("result")).and_then(Value::as_str).unwrap_or("");
            let b = view.input("ina").and_then(|v| v.get("result")).and_then(Value::as_str).unwrap_or("");
            Ok(json!({ "result": format!("{a} {b}") }))
        });

        let graph = build_graph((once | ina) >> collate);
        let mut data = Map::new();
        data.insert("once.x".to_string(), json!("once "));
        data.insert("ina.x".to_string(), json!("in a "));
        let task = Task::new(data, None);
        let envelope = Executor::execute(graph, task).await.unwrap();

        assert_eq!(envelope["result"], json!("once upon a time in a galaxy far far away"));
    }

    #[tokio::test]
    async fn join_timeout_reports_missing_predecessor() {
        let a = job("a", |_| async {
            std::future::pending::<()>().await;
            unreachable!()
        });
        let b = job("b", |_| async { Ok(json!({})) });
        let joiner = job("joiner", |_| async { Ok(json!({})) })
            .timeout(Duration::from_millis(20));

        let graph = build_graph((a | b) >> joiner);
        let task = Task::new(Map::new(), None);
        let err = Executor::execute(graph, task).await.unwrap_err();

        match err {
            FlowError::JoinTimeout(timeout) => {
                assert!(timeout.job.contains("joiner"));
                assert!(timeout.expected.len() == 2);
            }
            other => panic!("expected JoinTimeout, got {other:?}"),
        }
    }
}
