// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging and distributed tracing.
//!
//! This module contains message types used throughout the crate for diagnostic
//! and operational logging. Each message type implements:
//!
//! * `Display` - Human-readable output (supports future i18n)
//! * `StructuredLog` - Machine-readable fields + span creation
//!
//! # Organization
//!
//! * `executor` - dataflow executor lifecycle and join/fan-out events
//! * `flow_manager` - submission, completion, and shutdown events
//! * `validation` - graph validation outcomes
//!
//! # Usage
//!
//! ```rust
//! use dagflow::observability::messages::{StructuredLog, executor::JobActivated};
//!
//! let msg = JobActivated { job: "g$$$$square$$", task_id: "t-1" };
//!
//! // Human-readable
//! tracing::info!("{}", msg);
//!
//! // Structured fields + span
//! msg.log();
//! ```

pub mod executor;
pub mod flow_manager;
pub mod validation;

use tracing::Span;

/// Trait for messages that support structured logging and distributed tracing.
///
/// `Display` gives a human-readable one-liner; `log` additionally emits
/// machine-readable fields via `tracing`; `span` opens a named span carrying
/// those same fields as attributes.
pub trait StructuredLog {
    /// Emit a log event with structured fields, in addition to the `Display` message.
    fn log(&self);

    /// Create a `tracing::Span` carrying this message's fields as attributes.
    fn span(&self, name: &str) -> Span;
}
