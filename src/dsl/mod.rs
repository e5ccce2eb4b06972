// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! DSL combinators (`Serial`, `Parallel`, and a job-lifting `Wrapper`) and the
//! compiler that lowers a composed [`Dsl`] value into a [`crate::graph::GraphSpec`]
//! plus a job-instance map.

pub mod combinators;
pub mod compiler;
pub mod job;

pub use combinators::{parallel, serial, Dsl};
pub use compiler::{compile, CompiledDsl};
pub use job::{Job, JobSpec, TaskView, Wrapper};

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

/// Lift a plain async closure into a DSL leaf under the given short name, the
/// idiomatic-Rust stand-in for the Python original's `job(obj)`/`wrap(obj)`.
///
/// # Examples
/// ```
/// use dagflow::dsl::job;
///
/// let square = job("square", |view: dagflow::dsl::job::TaskView| async move {
///     let x = view.own_param("x").and_then(|v| v.as_i64()).unwrap_or(0);
///     Ok(serde_json::json!({ "result": x * x }))
/// });
/// ```
pub fn job<F, Fut>(short_name: impl Into<String>, f: F) -> Dsl
where
    F: Fn(TaskView) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Dsl::leaf(JobSpec::new(short_name, Arc::new(Wrapper::new(f))))
}
