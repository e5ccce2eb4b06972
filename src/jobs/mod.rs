// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! A handful of illustrative jobs used by this crate's own tests and doctests,
//! and by the [`crate::config::JobFactory`] registry example. Not meant as a
//! general-purpose job library — real consumers write their own [`crate::dsl::job::Job`]
//! implementations.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::JobFactory;
use crate::dsl::job::{Job, TaskView};
use crate::dsl::{job, Dsl};

/// `square(x) = x * x`.
pub fn square() -> Dsl {
    job("square", |view: TaskView| async move {
        let x = view.own_param("x").and_then(Value::as_i64).unwrap_or(0);
        Ok(serde_json::json!({ "result": x * x }))
    })
}

/// `multiply(ctx) = ctx.inputs.square.result * 10`.
pub fn multiply() -> Dsl {
    job("multiply", |view: TaskView| async move {
        let square_result = view
            .input("square")
            .and_then(|v| v.get("result"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(serde_json::json!({ "result": square_result * 10 }))
    })
}

/// `once(x) = x + "upon a time"`.
pub fn once() -> Dsl {
    job("once", |view: TaskView| async move {
        let x = view.own_param("x").and_then(Value::as_str).unwrap_or("").to_string();
        Ok(serde_json::json!({ "result": format!("{x}upon a time") }))
    })
}

/// `ina(x) = x + "galaxy far far away"`.
pub fn ina() -> Dsl {
    job("ina", |view: TaskView| async move {
        let x = view.own_param("x").and_then(Value::as_str).unwrap_or("").to_string();
        Ok(serde_json::json!({ "result": format!("{x}galaxy far far away") }))
    })
}

/// `collate(ctx) = ctx.inputs.once.result + " " + ctx.inputs.ina.result`.
pub fn collate() -> Dsl {
    job("collate", |view: TaskView| async move {
        let once = view.input("once").and_then(|v| v.get("result")).and_then(Value::as_str).unwrap_or("");
        let ina = view.input("ina").and_then(|v| v.get("result")).and_then(Value::as_str).unwrap_or("");
        Ok(serde_json::json!({ "result": format!("{once} {ina}") }))
    })
}

/// `times(x) = x * 2`, the head of the Scenario C diamond.
pub fn times() -> Dsl {
    job("times", |view: TaskView| async move {
        let x = view.own_param("x").and_then(Value::as_i64).unwrap_or(0);
        Ok(serde_json::json!({ "result": x * 2 }))
    })
}

/// Passes `times`'s result through unchanged, renaming the field for `formatter`.
pub fn transformer() -> Dsl {
    job("transformer", |view: TaskView| async move {
        let value = view.input("times").and_then(|v| v.get("result")).cloned().unwrap_or(Value::Null);
        Ok(serde_json::json!({ "transformed": value }))
    })
}

/// Quotes `transformer`'s output as a string.
pub fn formatter() -> Dsl {
    job("formatter", |view: TaskView| async move {
        let value = view.input("transformer").and_then(|v| v.get("transformed")).cloned().unwrap_or(Value::Null);
        Ok(serde_json::json!({ "formatted": format!("\"{value}\"") }))
    })
}

/// `add(x) = x + formatter_len`, one branch of the diamond.
pub fn add() -> Dsl {
    job("add", |view: TaskView| async move {
        let x = view.own_param("x").and_then(Value::as_i64).unwrap_or(0);
        let formatted_len = view
            .input("formatter")
            .and_then(|v| v.get("formatted"))
            .and_then(Value::as_str)
            .map(|s| s.len() as i64)
            .unwrap_or(0);
        Ok(serde_json::json!({ "result": x + formatted_len }))
    })
}

/// `aggregator(ctx) = ctx.inputs.add.result + ctx.inputs.square.result`, the tail
/// of the diamond.
pub fn aggregator() -> Dsl {
    job("aggregator", |view: TaskView| async move {
        let add_result = view.input("add").and_then(|v| v.get("result")).and_then(Value::as_i64).unwrap_or(0);
        let square_result = view.input("square").and_then(|v| v.get("result")).and_then(Value::as_i64).unwrap_or(0);
        Ok(serde_json::json!({ "result": add_result + square_result }))
    })
}

struct SquareJob;

#[async_trait]
impl Job for SquareJob {
    async fn run(&self, view: TaskView) -> anyhow::Result<Value> {
        let x = view.own_param("x").and_then(Value::as_i64).unwrap_or(0);
        Ok(serde_json::json!({ "result": x * x }))
    }
}

/// Constructs [`SquareJob`] for the `type: square_job` config declaration.
pub struct SquareJobFactory;

impl JobFactory for SquareJobFactory {
    fn type_name(&self) -> &str {
        "square_job"
    }

    fn create(&self, _properties: &Value) -> anyhow::Result<Arc<dyn Job>> {
        Ok(Arc::new(SquareJob))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::compile;
    use crate::job_graph::JobGraph;
    use crate::task::Task;
    use serde_json::json;

    #[tokio::test]
    async fn square_then_multiply_aggregates_through_context() {
        let dsl = square() >> multiply();
        let graph = Arc::new(JobGraph::build(compile(dsl), "scenario_a", "").unwrap());

        let mut data = serde_json::Map::new();
        data.insert("square.x".to_string(), json!(4));
        let result = crate::executor::Executor::execute(graph, Task::new(data, None)).await.unwrap();

        assert_eq!(result["result"], json!(160));
    }

    #[tokio::test]
    async fn diamond_saves_branch_results_and_carries_task_pass_through() {
        let dsl = times().save_result()
            >> transformer()
            >> formatter()
            >> (add().save_result() | square().save_result())
            >> aggregator();
        let graph = Arc::new(JobGraph::build(compile(dsl), "scenario_c", "").unwrap());

        let mut data = serde_json::Map::new();
        data.insert("times.x".to_string(), json!(1));
        data.insert("add.x".to_string(), json!(2));
        data.insert("square.x".to_string(), json!(3));
        let task = Task::new(data.clone(), None);
        let expected_pass_through = task.as_value();

        let envelope = crate::executor::Executor::execute(graph, task).await.unwrap();

        assert_eq!(envelope["SAVED_RESULTS"]["times"], json!({ "result": 2 }));
        assert_eq!(envelope["SAVED_RESULTS"]["add"], json!({ "result": 5 }));
        assert_eq!(envelope["SAVED_RESULTS"]["square"], json!({ "result": 9 }));
        assert_eq!(envelope["task_pass_through"], expected_pass_through);
    }

    #[tokio::test]
    async fn once_and_ina_fan_into_collate() {
        let dsl = (once() | ina()) >> collate();
        let graph = Arc::new(JobGraph::build(compile(dsl), "scenario_b", "").unwrap());

        let mut data = serde_json::Map::new();
        data.insert("once.x".to_string(), json!("once "));
        data.insert("ina.x".to_string(), json!("in a "));
        let result = crate::executor::Executor::execute(graph, Task::new(data, None)).await.unwrap();

        assert_eq!(result["result"], json!("once upon a time in a galaxy far far away"));
    }
}
