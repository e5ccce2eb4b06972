// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Message types follow a struct-based pattern with `Display` implementations to:
//!
//! * Eliminate magic strings scattered throughout the codebase
//! * Enable future internationalization without code changes
//! * Provide consistent, structured logging output
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::executor` - dataflow executor lifecycle and join/fan-out events
//! * `messages::flow_manager` - submission, completion, and shutdown events
//! * `messages::validation` - graph validation outcomes
//!
//! # Usage
//!
//! ```rust
//! use dagflow::observability::messages::executor::JobActivated;
//!
//! let msg = JobActivated { job: "g$$$$square$$", task_id: "t-1" };
//! tracing::debug!("{}", msg);
//! ```

pub mod messages;
