// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod execution;
mod graph;
mod mp;
mod submission;

pub use execution::{FlowError, JobRunError, JoinTimeout};
pub use graph::{GraphValidationError, GraphValidationErrors};
pub use mp::MpError;
pub use submission::SubmissionError;
