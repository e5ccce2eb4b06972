// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative graph configuration: parsing a YAML/JSON graph declaration and
//! resolving its per-node `type` strings against a [`JobFactory`] registry.

mod factory;
mod loader;

pub use factory::{JobFactory, JobFactoryRegistry};
pub use loader::{load_and_validate_config, load_config, GraphConfig, NodeConfig};
