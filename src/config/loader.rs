// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative graph configuration: parse a YAML/JSON graph declaration into a
//! [`GraphConfig`], and lower it to a [`GraphSpec`] plus per-node job metadata.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::graph::{GraphSpec, GraphValidator};

/// A declaratively-loaded graph: its name, optional variant, and one [`NodeConfig`]
/// per short name.
///
/// # Examples
/// ```
/// use dagflow::config::GraphConfig;
///
/// let yaml = r#"
/// graph_name: demo
/// variant: dev
/// nodes:
///   square:
///     type: square_job
///     next: [multiply]
///     save_result: true
///   multiply:
///     type: multiply_job
/// "#;
/// let config: GraphConfig = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(config.graph_name, "demo");
/// assert_eq!(config.nodes["square"].next, vec!["multiply".to_string()]);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GraphConfig {
    pub graph_name: String,
    #[serde(default)]
    pub variant: String,
    pub nodes: HashMap<String, NodeConfig>,
}

/// One node's declarative metadata: the `JobFactory` type to construct, its
/// successors, free-form properties, and whether to save its result.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub next: Vec<String>,
    #[serde(default = "default_properties")]
    pub properties: Value,
    #[serde(default)]
    pub save_result: bool,
}

fn default_properties() -> Value {
    Value::Object(serde_json::Map::new())
}

impl GraphConfig {
    /// Lower this declaration's topology into a bare [`GraphSpec`], discarding the
    /// per-node `type`/`properties`/`save_result` metadata (kept separately on
    /// [`NodeConfig`] for the `JobFactory` registry to consume).
    pub fn to_spec(&self) -> GraphSpec {
        let mut spec = GraphSpec::new();
        for (name, node) in &self.nodes {
            spec.add_node(name.clone());
            for next in &node.next {
                spec.add_edge(name.clone(), next.clone());
            }
        }
        spec
    }
}

/// Parse a graph declaration from `path`, choosing YAML or JSON by extension
/// (defaulting to YAML, which is also valid for most JSON documents).
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<GraphConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };
    Ok(config)
}

/// Like [`load_config`], additionally running the declared topology through
/// [`GraphValidator`] (in its multiple-heads-tolerant form, since head synthesis
/// happens at [`crate::job_graph::JobGraph::build`] time, not here).
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> anyhow::Result<GraphConfig> {
    let config = load_config(path)?;
    GraphValidator::validate_allowing_multiple_heads(&config.to_spec())
        .map_err(|errors| anyhow::anyhow!(errors.to_string()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO_YAML: &str = r#"
graph_name: demo
variant: dev
nodes:
  square:
    type: square_job
    next: [multiply]
    save_result: true
  multiply:
    type: multiply_job
"#;

    #[test]
    fn parses_nodes_and_defaults() {
        let config: GraphConfig = serde_yaml::from_str(DEMO_YAML).unwrap();
        assert_eq!(config.graph_name, "demo");
        assert_eq!(config.variant, "dev");
        assert!(config.nodes["square"].save_result);
        assert!(!config.nodes["multiply"].save_result);
        assert!(config.nodes["multiply"].next.is_empty());
        assert_eq!(config.nodes["multiply"].properties, Value::Object(Default::default()));
    }

    #[test]
    fn to_spec_produces_a_wireable_graph() {
        let config: GraphConfig = serde_yaml::from_str(DEMO_YAML).unwrap();
        let spec = config.to_spec();
        assert_eq!(spec.heads(), vec!["square".to_string()]);
        assert_eq!(spec.tails(), vec!["multiply".to_string()]);
    }

    #[test]
    fn load_and_validate_rejects_a_cyclic_declaration() {
        let yaml = r#"
graph_name: bad
nodes:
  a:
    type: a_job
    next: [b]
  b:
    type: b_job
    next: [a]
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, yaml).unwrap();

        assert!(load_and_validate_config(&path).is_err());
    }

    #[test]
    fn load_and_validate_accepts_a_multi_head_declaration() {
        let yaml = r#"
graph_name: demo
nodes:
  h1:
    type: h_job
    next: [m]
  h2:
    type: h_job
    next: [m]
  m:
    type: m_job
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi_head.yaml");
        fs::write(&path, yaml).unwrap();

        assert!(load_and_validate_config(&path).is_ok());
    }
}
