// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`FlowManagerMp`]: the same submission contract as [`crate::flow_manager::FlowManager`],
//! but backed by dedicated OS worker threads rather than tasks on the calling
//! `tokio` runtime. Rust threads already give true parallelism, so unlike the
//! Python original there is no analogue of forking a process per worker (see
//! DESIGN.md) — each worker thread simply owns a small current-thread `tokio`
//! runtime to drive [`crate::executor::Executor::execute`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex as StdMutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::errors::MpError;
use crate::executor::Executor;
use crate::job_graph::JobGraph;
use crate::observability::messages::flow_manager::WorkerShutDown;
use crate::observability::messages::StructuredLog;
use crate::task::Task;

/// One outcome handed back across the egress channel.
#[derive(Debug, Clone)]
pub enum ResultEnvelope {
    Completed { fq_name: String, task_id: String, value: Value },
    Failed { fq_name: String, task_id: String, error: String },
}

struct Counters {
    submitted: AtomicU64,
    in_progress: AtomicU64,
    completed: AtomicU64,
    errors: AtomicU64,
    post_processing: AtomicU64,
}

impl Counters {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            submitted: AtomicU64::new(0),
            in_progress: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            post_processing: AtomicU64::new(0),
        })
    }
}

type Envelope = (Task, String);

/// Multi-threaded submission front-end. Tasks are pushed to a shared ingress
/// channel; a fixed pool of worker threads drains it, running each task's
/// execution to completion on its own single-threaded `tokio` runtime, and
/// publishes the outcome to the egress channel (or, in serial mode, straight
/// into an in-process buffer).
pub struct FlowManagerMp {
    graphs: Arc<HashMap<String, Arc<JobGraph>>>,
    task_tx: Sender<Option<Envelope>>,
    counters: Arc<Counters>,
    workers: Vec<JoinHandle<()>>,
    result_processor: Option<JoinHandle<()>>,
    buffers: Arc<Mutex<super::flow_manager::ResultBuffers>>,
    shutdown_timeout: Duration,
}

impl FlowManagerMp {
    /// Spin up `worker_count` worker threads sharing `graphs`. If `on_complete`
    /// is given, a dedicated result-processor thread applies it to each
    /// completed envelope as it arrives (the callback must be `Send + 'static`,
    /// checked at compile time); otherwise results accumulate in-process and are
    /// read back via [`FlowManagerMp::pop_results`] ("serial" mode).
    pub fn spawn(
        graphs: HashMap<String, Arc<JobGraph>>,
        worker_count: usize,
        shutdown_timeout: Duration,
        on_complete: Option<Box<dyn Fn(&ResultEnvelope) + Send + 'static>>,
    ) -> Self {
        let graphs = Arc::new(graphs);
        let counters = Counters::new();

        let (task_tx, task_rx) = mpsc::channel::<Option<Envelope>>();
        let task_rx = Arc::new(StdMutex::new(task_rx));
        let (result_tx, result_rx) = mpsc::channel::<Option<ResultEnvelope>>();

        let mut workers = Vec::with_capacity(worker_count.max(1));
        for worker_id in 0..worker_count.max(1) {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let graphs = graphs.clone();
            let counters = counters.clone();
            workers.push(thread::spawn(move || {
                Self::worker_loop(worker_id, task_rx, result_tx, graphs, counters)
            }));
        }
        drop(result_tx);

        let buffers = Arc::new(Mutex::new(super::flow_manager::ResultBuffers::default()));
        let result_processor = {
            let buffers = buffers.clone();
            let counters = counters.clone();
            Some(thread::spawn(move || {
                Self::result_loop(result_rx, buffers, counters, on_complete)
            }))
        };

        Self {
            graphs,
            task_tx,
            counters,
            workers,
            result_processor,
            buffers,
            shutdown_timeout,
        }
    }

    fn worker_loop(
        _worker_id: usize,
        task_rx: Arc<StdMutex<Receiver<Option<Envelope>>>>,
        result_tx: Sender<Option<ResultEnvelope>>,
        graphs: Arc<HashMap<String, Arc<JobGraph>>>,
        counters: Arc<Counters>,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to build per-worker tokio runtime");

        loop {
            let envelope = {
                let rx = task_rx.lock().expect("task channel mutex poisoned");
                rx.recv()
            };
            match envelope {
                Ok(Some((task, fq_name))) => {
                    counters.in_progress.fetch_add(1, Ordering::SeqCst);
                    let Some(graph) = graphs.get(&fq_name).cloned() else {
                        counters.errors.fetch_add(1, Ordering::SeqCst);
                        counters.in_progress.fetch_sub(1, Ordering::SeqCst);
                        let _ = result_tx.send(Some(ResultEnvelope::Failed {
                            fq_name: fq_name.clone(),
                            task_id: task.task_id.clone(),
                            error: format!("no graph registered under fq_name '{fq_name}'"),
                        }));
                        continue;
                    };
                    let task_id = task.task_id.clone();
                    let outcome = runtime.block_on(Executor::execute(graph, task));
                    counters.in_progress.fetch_sub(1, Ordering::SeqCst);
                    let envelope = match outcome {
                        Ok(value) => {
                            counters.completed.fetch_add(1, Ordering::SeqCst);
                            ResultEnvelope::Completed { fq_name: fq_name.clone(), task_id, value }
                        }
                        Err(err) => {
                            counters.errors.fetch_add(1, Ordering::SeqCst);
                            ResultEnvelope::Failed { fq_name: fq_name.clone(), task_id, error: err.to_string() }
                        }
                    };
                    if result_tx.send(Some(envelope)).is_err() {
                        break;
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }
        WorkerShutDown { role: "worker" }.log();
    }

    fn result_loop(
        result_rx: Receiver<Option<ResultEnvelope>>,
        buffers: Arc<Mutex<super::flow_manager::ResultBuffers>>,
        counters: Arc<Counters>,
        on_complete: Option<Box<dyn Fn(&ResultEnvelope) + Send + 'static>>,
    ) {
        while let Ok(Some(envelope)) = result_rx.recv() {
            counters.post_processing.fetch_add(1, Ordering::SeqCst);
            match &envelope {
                ResultEnvelope::Completed { fq_name, value, .. } => {
                    buffers.lock().completed.entry(fq_name.clone()).or_default().push(value.clone());
                }
                ResultEnvelope::Failed { fq_name, task_id, error } => {
                    buffers.lock().errors.entry(fq_name.clone()).or_default().push(
                        super::flow_manager::ErrorEntry { task_id: task_id.clone(), error: error.clone() },
                    );
                }
            }
            if let Some(callback) = &on_complete {
                callback(&envelope);
            }
            counters.post_processing.fetch_sub(1, Ordering::SeqCst);
        }
        WorkerShutDown { role: "result_processor" }.log();
    }

    /// Submit one task against `fq_name`. Fails only by attempting to send after
    /// [`FlowManagerMp::shutdown`] has closed the ingress channel.
    pub fn submit_task(&self, task: Task, fq_name: &str) -> anyhow::Result<()> {
        self.counters.submitted.fetch_add(1, Ordering::SeqCst);
        self.task_tx
            .send(Some((task, fq_name.to_string())))
            .map_err(|_| anyhow::anyhow!("FlowManagerMp ingress channel is closed"))
    }

    /// Poll shared counters until `submitted == completed + errors` or `timeout`
    /// elapses.
    pub fn wait_for_completion(&self, timeout: Duration, check_interval: Duration) -> bool {
        let start = std::time::Instant::now();
        loop {
            let submitted = self.counters.submitted.load(Ordering::SeqCst);
            let completed = self.counters.completed.load(Ordering::SeqCst);
            let errors = self.counters.errors.load(Ordering::SeqCst);
            if submitted == completed + errors {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            thread::sleep(check_interval);
        }
    }

    pub fn pop_results(&self) -> super::flow_manager::ResultBuffers {
        std::mem::take(&mut *self.buffers.lock())
    }

    /// Signal end-of-input, wait for every worker and the result processor to
    /// drain, within `self.shutdown_timeout` each.
    pub fn shutdown(mut self) -> Result<(), MpError> {
        let _ = self.task_tx.send(None);
        for worker in self.workers.drain(..) {
            Self::join_with_timeout(worker, self.shutdown_timeout)?;
        }
        if let Some(result_processor) = self.result_processor.take() {
            Self::join_with_timeout(result_processor, self.shutdown_timeout)?;
        }
        Ok(())
    }

    fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> Result<(), MpError> {
        // std::thread has no join-with-timeout primitive; poll is_finished instead,
        // which is adequate since shutdown only ever blocks on drain, not progress.
        let start = std::time::Instant::now();
        while !handle.is_finished() {
            if start.elapsed() >= timeout {
                return Err(MpError::ShutdownTimeout { waited: timeout });
            }
            thread::sleep(Duration::from_millis(5));
        }
        let _ = handle.join();
        Ok(())
    }
}

impl Drop for FlowManagerMp {
    /// Detach ungracefully rather than block indefinitely; callers that want a
    /// clean drain must call [`FlowManagerMp::shutdown`] explicitly.
    fn drop(&mut self) {
        let _ = self.task_tx.send(None);
    }
}
