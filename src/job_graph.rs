// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`JobGraph`]: the fully wired set of job records an [`crate::executor::Executor`]
//! walks. Built once from a compiled DSL (or a loaded config) and then shared
//! read-only, via `Arc`, across every task that flows through it.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::dsl::compiler::CompiledDsl;
use crate::dsl::job::{Job, JobSpec, TaskView};
use crate::errors::GraphValidationErrors;
use crate::graph::GraphValidator;

/// FQ name = `graph_name$$variant$$short_name$$`, matching the Python original's
/// `create_FQName`/`parse_job_loader_name` grammar: split on `$$` yields exactly
/// four parts, the last of which is empty.
pub fn fq_name(graph_name: &str, variant: &str, short_name: &str) -> String {
    format!("{graph_name}$${variant}$${short_name}$$")
}

/// Inverse of [`fq_name`]. Returns `None` for malformed input.
pub fn parse_fq_name(fq: &str) -> Option<(String, String, String)> {
    let parts: Vec<&str> = fq.split("$$").collect();
    match parts.as_slice() {
        [graph, variant, short, trailing] if trailing.is_empty() => {
            Some((graph.to_string(), variant.to_string(), short.to_string()))
        }
        _ => None,
    }
}

const DEFAULT_HEAD_SHORT_NAME: &str = "DefaultHead";

/// A wired job: its computation plus the graph-relative metadata `JobSpec` does not
/// carry — FQ name, predecessor set, successor FQ names.
pub struct JobRecord {
    pub fq_name: String,
    pub short_name: String,
    pub job: Arc<dyn Job>,
    pub properties: Value,
    pub save_result: bool,
    pub timeout: Duration,
    pub next_jobs: Vec<String>,
    pub expected_inputs: BTreeSet<String>,
}

/// The synthetic head inserted when a compiled graph has more than one head. Its
/// `run` passes the task payload through untouched, matching the Python original's
/// `DefaultHead`.
struct DefaultHeadJob;

#[async_trait]
impl Job for DefaultHeadJob {
    async fn run(&self, view: TaskView) -> anyhow::Result<Value> {
        Ok(view.task().clone())
    }
}

/// A fully wired job graph: one [`JobRecord`] per job, keyed by FQ name, plus the FQ
/// name of the single head. Immutable after construction; shared across tasks via
/// `Arc` so that concurrent executions never contend on graph topology.
pub struct JobGraph {
    head: String,
    records: HashMap<String, JobRecord>,
}

impl JobGraph {
    /// Wire a compiled DSL (or equivalently shaped config output) into a `JobGraph`,
    /// assigning FQ names, computing `expected_inputs` from the spec's edges, and
    /// synthesizing a `DefaultHead` if the spec has more than one head.
    ///
    /// Validation runs first in its multiple-heads-tolerant form (head synthesis is
    /// this method's job, not the validator's); a single-head result still passes
    /// through the stricter checks implicitly, since synthesis is a no-op for it.
    pub fn build(
        compiled: CompiledDsl,
        graph_name: &str,
        variant: &str,
    ) -> Result<Self, GraphValidationErrors> {
        GraphValidator::validate_allowing_multiple_heads(&compiled.spec)?;

        let CompiledDsl { spec, mut jobs } = compiled;
        let heads = spec.heads();

        let fq = |short: &str| fq_name(graph_name, variant, short);

        let mut next_jobs: HashMap<String, Vec<String>> = HashMap::new();
        let mut expected_inputs: HashMap<String, BTreeSet<String>> = HashMap::new();
        for short in spec.node_names() {
            let fq_short = fq(short);
            expected_inputs.entry(fq_short.clone()).or_default();
            for succ in spec.successors(short) {
                let fq_succ = fq(succ);
                next_jobs.entry(fq_short.clone()).or_default().push(fq_succ.clone());
                expected_inputs.entry(fq_succ).or_default().insert(fq_short.clone());
            }
        }

        let mut records = HashMap::new();
        for short in spec.node_names() {
            let fq_short = fq(short);
            let spec_for_job: JobSpec = jobs.remove(short).unwrap_or_else(|| {
                panic!("compiled graph references unknown job '{short}'")
            });
            records.insert(
                fq_short.clone(),
                JobRecord {
                    fq_name: fq_short.clone(),
                    short_name: short.clone(),
                    job: spec_for_job.job,
                    properties: spec_for_job.properties,
                    save_result: spec_for_job.save_result,
                    timeout: spec_for_job.timeout,
                    next_jobs: next_jobs.remove(&fq_short).unwrap_or_default(),
                    expected_inputs: expected_inputs.remove(&fq_short).unwrap_or_default(),
                },
            );
        }

        let head = if heads.len() <= 1 {
            heads.into_iter().next().unwrap_or_else(|| {
                // An empty spec has no heads at all; validate_allowing_multiple_heads
                // only tolerates this for an empty graph, which has nothing to run.
                fq(DEFAULT_HEAD_SHORT_NAME)
            })
        } else {
            let default_head_fq = fq(DEFAULT_HEAD_SHORT_NAME);
            let original_heads: Vec<String> = heads.iter().map(|h| fq(h)).collect();

            for original in &original_heads {
                if let Some(record) = records.get_mut(original) {
                    record.expected_inputs = BTreeSet::from([default_head_fq.clone()]);
                }
            }

            records.insert(
                default_head_fq.clone(),
                JobRecord {
                    fq_name: default_head_fq.clone(),
                    short_name: DEFAULT_HEAD_SHORT_NAME.to_string(),
                    job: Arc::new(DefaultHeadJob),
                    properties: Value::Object(Default::default()),
                    save_result: false,
                    timeout: crate::dsl::job::DEFAULT_TIMEOUT,
                    next_jobs: original_heads,
                    expected_inputs: BTreeSet::new(),
                },
            );
            default_head_fq
        };

        Ok(Self { head, records })
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn get(&self, fq_name: &str) -> Option<&JobRecord> {
        self.records.get(fq_name)
    }

    pub fn fq_names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A boxed, pinned future, the shape [`crate::executor::Executor`] needs to recurse
/// through `async fn` calls (which cannot call themselves directly).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{compile, job};
    use serde_json::json;

    fn noop(name: &str) -> crate::dsl::Dsl {
        job(name, |_| async { Ok(json!({})) })
    }

    #[test]
    fn fq_name_round_trips() {
        let fq = fq_name("demo", "dev", "square");
        assert_eq!(fq, "demo$$dev$$square$$");
        assert_eq!(
            parse_fq_name(&fq),
            Some(("demo".to_string(), "dev".to_string(), "square".to_string()))
        );
    }

    #[test]
    fn empty_variant_is_permitted() {
        let fq = fq_name("demo", "", "square");
        assert_eq!(fq, "demo$$$$square$$");
        assert_eq!(
            parse_fq_name(&fq),
            Some(("demo".to_string(), "".to_string(), "square".to_string()))
        );
    }

    #[test]
    fn single_head_graph_wires_expected_inputs_directly() {
        let compiled = compile(noop("square") >> noop("multiply"));
        let graph = JobGraph::build(compiled, "demo", "").unwrap();

        let square_fq = fq_name("demo", "", "square");
        let multiply_fq = fq_name("demo", "", "multiply");

        assert_eq!(graph.head(), &square_fq);
        assert!(graph.get(&square_fq).unwrap().expected_inputs.is_empty());
        assert_eq!(
            graph.get(&multiply_fq).unwrap().expected_inputs,
            BTreeSet::from([square_fq.clone()])
        );
        assert_eq!(graph.get(&square_fq).unwrap().next_jobs, vec![multiply_fq]);
    }

    #[test]
    fn multi_head_graph_synthesizes_a_default_head() {
        let compiled = compile((noop("h1") | noop("h2")) >> noop("m"));
        let graph = JobGraph::build(compiled, "demo", "").unwrap();

        let default_fq = fq_name("demo", "", DEFAULT_HEAD_SHORT_NAME);
        let h1_fq = fq_name("demo", "", "h1");
        let h2_fq = fq_name("demo", "", "h2");

        assert_eq!(graph.head(), &default_fq);
        let default_record = graph.get(&default_fq).unwrap();
        assert!(default_record.expected_inputs.is_empty());
        assert_eq!(default_record.next_jobs.len(), 2);
        assert!(default_record.next_jobs.contains(&h1_fq));
        assert!(default_record.next_jobs.contains(&h2_fq));

        assert_eq!(
            graph.get(&h1_fq).unwrap().expected_inputs,
            BTreeSet::from([default_fq.clone()])
        );
        assert_eq!(
            graph.get(&h2_fq).unwrap().expected_inputs,
            BTreeSet::from([default_fq])
        );
    }

    #[tokio::test]
    async fn synthesized_default_head_delivers_the_same_task_to_both_original_heads() {
        let h1 = job("h1", |view: crate::dsl::job::TaskView| async move {
            Ok(view.input(DEFAULT_HEAD_SHORT_NAME).cloned().unwrap_or(Value::Null))
        });
        let h2 = job("h2", |view: crate::dsl::job::TaskView| async move {
            Ok(view.input(DEFAULT_HEAD_SHORT_NAME).cloned().unwrap_or(Value::Null))
        });
        let m = job("m", |view: crate::dsl::job::TaskView| async move {
            Ok(json!({
                "seen_by_h1": view.input("h1").cloned(),
                "seen_by_h2": view.input("h2").cloned(),
            }))
        });

        let compiled = compile((h1 | h2) >> m);
        let graph = Arc::new(JobGraph::build(compiled, "demo", "").unwrap());

        let mut data = serde_json::Map::new();
        data.insert("payload".to_string(), json!("shared"));
        let submitted = crate::task::Task::new(data, None);
        let expected = submitted.as_value();

        let envelope = crate::executor::Executor::execute(graph, submitted).await.unwrap();

        assert_eq!(envelope["seen_by_h1"], expected);
        assert_eq!(envelope["seen_by_h2"], expected);
    }

    #[test]
    fn fq_names_lists_every_record_including_synthesized_ones() {
        let compiled = compile((noop("h1") | noop("h2")) >> noop("m"));
        let graph = JobGraph::build(compiled, "demo", "").unwrap();

        let mut names: Vec<&str> = graph.fq_names().collect();
        names.sort();
        assert_eq!(names.len(), 4);
        assert!(names.contains(&fq_name("demo", "", DEFAULT_HEAD_SHORT_NAME).as_str()));
    }
}
