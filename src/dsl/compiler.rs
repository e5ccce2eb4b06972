use std::collections::HashMap;

use crate::dsl::{Dsl, JobSpec};
use crate::graph::GraphSpec;

/// Output of [`compile`]: the adjacency graph of short names, plus the job instance
/// behind each one.
pub struct CompiledDsl {
    pub spec: GraphSpec,
    pub jobs: HashMap<String, JobSpec>,
}

/// Lower a composed [`Dsl`] value into a [`GraphSpec`] plus its job-instance map.
///
/// Two passes, mirroring the design-level algorithm in SPEC_FULL.md §4.2:
/// first collect every terminal job (deduplicating repeated short names, the
/// Rust-idiomatic substitute for the Python original's object-identity dedup — see
/// DESIGN.md), then walk again connecting terminals while tracking the "current
/// frontier" of edge-emitting terminals.
///
/// # Examples
/// ```
/// use dagflow::dsl::{compile, job};
///
/// let square = job("square", |_| async { Ok(serde_json::json!({})) });
/// let multiply = job("multiply", |_| async { Ok(serde_json::json!({})) });
/// let compiled = compile(square >> multiply);
///
/// assert_eq!(compiled.spec.successors("square"), &["multiply".to_string()]);
/// ```
pub fn compile(dsl: Dsl) -> CompiledDsl {
    let mut jobs = HashMap::new();
    collect_jobs(&dsl, &mut jobs);

    let mut spec = GraphSpec::new();
    for name in jobs.keys() {
        spec.add_node(name.clone());
    }
    connect(&dsl, &mut spec, None);

    CompiledDsl { spec, jobs }
}

fn collect_jobs(dsl: &Dsl, jobs: &mut HashMap<String, JobSpec>) {
    match dsl {
        Dsl::Leaf(spec) => {
            jobs.entry(spec.short_name.clone()).or_insert_with(|| spec.clone());
        }
        Dsl::Serial(components) | Dsl::Parallel(components) => {
            for component in components {
                collect_jobs(component, jobs);
            }
        }
    }
}

/// Connect `dsl` into `spec`, given the inbound frontier of names emitting edges
/// into this subtree (`None` for the root). Returns the outbound frontier: the
/// terminal short names that should receive edges from whatever follows.
fn connect(dsl: &Dsl, spec: &mut GraphSpec, prev_frontier: Option<&[String]>) -> Vec<String> {
    match dsl {
        Dsl::Leaf(job) => {
            if let Some(prev) = prev_frontier {
                for predecessor in prev {
                    spec.add_edge(predecessor, job.short_name.clone());
                }
            }
            vec![job.short_name.clone()]
        }
        Dsl::Serial(components) => {
            let mut frontier = prev_frontier.map(<[String]>::to_vec);
            let mut terminals = Vec::new();
            for component in components {
                terminals = connect(component, spec, frontier.as_deref());
                frontier = Some(terminals.clone());
            }
            terminals
        }
        Dsl::Parallel(components) => {
            let mut terminals = Vec::new();
            for component in components {
                terminals.extend(connect(component, spec, prev_frontier));
            }
            terminals
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::job;
    use serde_json::json;

    fn noop(name: &str) -> Dsl {
        job(name, |_| async { Ok(json!({})) })
    }

    #[test]
    fn serial_chain_compiles_to_a_linear_graph() {
        let compiled = compile(noop("a") >> noop("b") >> noop("c"));
        assert_eq!(compiled.spec.successors("a"), &["b".to_string()]);
        assert_eq!(compiled.spec.successors("b"), &["c".to_string()]);
        assert!(compiled.spec.successors("c").is_empty());
        assert_eq!(compiled.jobs.len(), 3);
    }

    #[test]
    fn parallel_fan_in_shares_a_single_successor() {
        let compiled = compile((noop("a") | noop("b")) >> noop("join"));
        assert_eq!(compiled.spec.successors("a"), &["join".to_string()]);
        assert_eq!(compiled.spec.successors("b"), &["join".to_string()]);
        assert_eq!(compiled.spec.heads(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn diamond_pattern_compiles_correctly() {
        let compiled = compile(
            noop("times") >> noop("transformer") >> noop("formatter")
                >> (noop("add") | noop("square"))
                >> noop("aggregator"),
        );
        assert_eq!(compiled.spec.successors("formatter"), &["add".to_string(), "square".to_string()]);
        assert_eq!(compiled.spec.successors("add"), &["aggregator".to_string()]);
        assert_eq!(compiled.spec.successors("square"), &["aggregator".to_string()]);
        assert_eq!(compiled.spec.tails(), vec!["aggregator".to_string()]);
    }

    #[test]
    fn repeated_short_name_does_not_duplicate_the_node() {
        let leaf = noop("shared");
        let compiled = compile(leaf.clone() | leaf);
        assert_eq!(compiled.jobs.len(), 1);
    }
}
