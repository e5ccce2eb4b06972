use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

/// The default join-wait timeout, matching the Python original's `self.timeout = 3000`
/// (seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3000);

/// The view a [`Job::run`] implementation sees: its own short name (for extracting
/// its parameters from the submitted task), the results already delivered by its
/// predecessors (keyed by their short names), the original task payload, and the
/// per-task shared bag.
///
/// Rust has no runtime signature introspection, so unlike the Python Wrapper this
/// view exposes both access patterns explicitly and lets the callable pick:
/// [`TaskView::own_param`] for "extract my own parameter from the submitted task"
/// jobs, and [`TaskView::input`] for "aggregate my predecessors' results" jobs.
#[derive(Clone)]
pub struct TaskView {
    short_name: String,
    inputs: HashMap<String, Value>,
    task: Value,
    shared_bag: Arc<Mutex<Value>>,
}

impl TaskView {
    pub fn new(
        short_name: String,
        inputs: HashMap<String, Value>,
        task: Value,
        shared_bag: Arc<Mutex<Value>>,
    ) -> Self {
        Self {
            short_name,
            inputs,
            task,
            shared_bag,
        }
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// The full original task payload, unchanged since submission.
    pub fn task(&self) -> &Value {
        &self.task
    }

    /// Results delivered by predecessors, keyed by their short names.
    pub fn inputs(&self) -> &HashMap<String, Value> {
        &self.inputs
    }

    /// A single predecessor's result, by short name.
    pub fn input(&self, predecessor_short_name: &str) -> Option<&Value> {
        self.inputs.get(predecessor_short_name)
    }

    /// Extract one of this job's own parameters from the submitted task, supporting
    /// both the nested form `{"job": {"param": v}}` and the dotted shorthand
    /// `{"job.param": v}`.
    pub fn own_param(&self, param: &str) -> Option<&Value> {
        if let Some(nested) = self.task.get(&self.short_name).and_then(|v| v.as_object()) {
            if let Some(v) = nested.get(param) {
                return Some(v);
            }
        }
        let dotted = format!("{}.{}", self.short_name, param);
        self.task.get(&dotted)
    }

    /// Snapshot the shared, free-form per-task bag.
    pub fn shared_bag(&self) -> Value {
        self.shared_bag.lock().clone()
    }

    /// Merge new entries into the shared per-task bag, visible to every job still to
    /// run for this task.
    pub fn update_shared_bag(&self, patch: Value) {
        let mut bag = self.shared_bag.lock();
        if let (Some(bag_obj), Some(patch_obj)) = (bag.as_object_mut(), patch.as_object()) {
            for (k, v) in patch_obj {
                bag_obj.insert(k.clone(), v.clone());
            }
        }
    }
}

/// The computation contract every node in a [`crate::job_graph::JobGraph`] fulfills.
///
/// Wiring metadata — FQ name, `expected_inputs`, `next_jobs` — is deliberately kept
/// off this trait; it lives alongside the `Job` trait object in
/// [`crate::job_graph::JobRecord`] so that a `Job` implementation stays a pure,
/// effect-isolated computation.
#[async_trait]
pub trait Job: Send + Sync {
    /// Run this job's computation. Must be effect-isolated per invocation: the same
    /// `TaskView` handed back twice (which never happens in practice, since each task
    /// gets its own context) must produce the same result.
    async fn run(&self, view: TaskView) -> anyhow::Result<Value>;
}

/// Lifts a plain async closure into [`Job`] shape, the Rust analogue of the Python
/// original's `Wrapper`/`WrappingJob`. Rust cannot introspect a callable's signature
/// at runtime, so unlike the Python version there is only one shape: a closure over
/// `TaskView` returning a boxed future.
pub struct Wrapper<F> {
    f: Arc<F>,
}

impl<F, Fut> Wrapper<F>
where
    F: Fn(TaskView) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

#[async_trait]
impl<F, Fut> Job for Wrapper<F>
where
    F: Fn(TaskView) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn run(&self, view: TaskView) -> anyhow::Result<Value> {
        (self.f)(view).await
    }
}

/// A DSL leaf: a job's computation paired with its wiring-relevant metadata, prior
/// to FQ-naming. Produced by [`crate::dsl::job`] and consumed by
/// [`crate::dsl::compiler::compile`].
#[derive(Clone)]
pub struct JobSpec {
    pub short_name: String,
    pub job: Arc<dyn Job>,
    pub properties: Value,
    pub save_result: bool,
    pub timeout: Duration,
}

impl JobSpec {
    pub fn new(short_name: impl Into<String>, job: Arc<dyn Job>) -> Self {
        Self {
            short_name: short_name.into(),
            job,
            properties: Value::Object(Default::default()),
            save_result: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn save_result(mut self, save: bool) -> Self {
        self.save_result = save;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn wrapper_runs_the_closure() {
        let wrapper = Wrapper::new(|view: TaskView| async move {
            let x = view.own_param("x").and_then(Value::as_i64).unwrap_or(0);
            Ok(json!({ "result": x * x }))
        });
        let view = TaskView::new(
            "square".to_string(),
            HashMap::new(),
            json!({ "square.x": 4 }),
            Arc::new(Mutex::new(json!({}))),
        );
        let result = wrapper.run(view).await.unwrap();
        assert_eq!(result, json!({ "result": 16 }));
    }

    #[test]
    fn own_param_supports_nested_and_dotted_forms() {
        let view = TaskView::new(
            "square".to_string(),
            HashMap::new(),
            json!({ "square": { "x": 4 } }),
            Arc::new(Mutex::new(json!({}))),
        );
        assert_eq!(view.own_param("x"), Some(&json!(4)));

        let view = TaskView::new(
            "square".to_string(),
            HashMap::new(),
            json!({ "square.x": 5 }),
            Arc::new(Mutex::new(json!({}))),
        );
        assert_eq!(view.own_param("x"), Some(&json!(5)));
    }
}
