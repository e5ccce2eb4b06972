// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pure-data graph representation and the validator that checks it before wiring.

mod spec;
mod validator;

pub use spec::GraphSpec;
pub use validator::GraphValidator;
