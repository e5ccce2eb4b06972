// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`JobFactory`]: the registry that turns a [`crate::config::NodeConfig`]'s `type`
//! string into a constructed [`crate::dsl::job::Job`] instance. The config loader
//! deliberately knows nothing about job construction; this is where that knowledge
//! lives.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::dsl::job::Job;

/// Constructs a concrete [`Job`] from its declared `properties`. One implementation
/// per job `type` string.
pub trait JobFactory: Send + Sync {
    /// The `type` string this factory answers for.
    fn type_name(&self) -> &str;

    /// Build a job instance from its declared properties.
    fn create(&self, properties: &Value) -> anyhow::Result<Arc<dyn Job>>;
}

/// A `type` string -> [`JobFactory`] registry, consulted while wiring a
/// declaratively-loaded graph into job instances.
///
/// # Examples
/// ```
/// use dagflow::config::JobFactoryRegistry;
///
/// let registry = JobFactoryRegistry::new();
/// assert!(registry.create("unknown_type", &serde_json::json!({})).is_err());
/// ```
#[derive(Default)]
pub struct JobFactoryRegistry {
    factories: HashMap<String, Arc<dyn JobFactory>>,
}

impl JobFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, factory: Arc<dyn JobFactory>) {
        self.factories.insert(factory.type_name().to_string(), factory);
    }

    pub fn create(&self, type_name: &str, properties: &Value) -> anyhow::Result<Arc<dyn Job>> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| anyhow::anyhow!("no JobFactory registered for type '{type_name}'"))?;
        factory.create(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::job::TaskView;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoJob;

    #[async_trait]
    impl Job for EchoJob {
        async fn run(&self, view: TaskView) -> anyhow::Result<Value> {
            Ok(view.task().clone())
        }
    }

    struct EchoFactory;

    impl JobFactory for EchoFactory {
        fn type_name(&self) -> &str {
            "echo"
        }

        fn create(&self, _properties: &Value) -> anyhow::Result<Arc<dyn Job>> {
            Ok(Arc::new(EchoJob))
        }
    }

    #[test]
    fn registered_factory_constructs_a_job() {
        let mut registry = JobFactoryRegistry::new();
        registry.register(Arc::new(EchoFactory));
        assert!(registry.create("echo", &json!({})).is_ok());
    }

    #[test]
    fn unregistered_type_is_an_error() {
        let registry = JobFactoryRegistry::new();
        assert!(registry.create("missing", &json!({})).is_err());
    }
}
