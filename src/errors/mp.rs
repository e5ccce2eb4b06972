use std::time::Duration;

use thiserror::Error;

/// Errors specific to [`crate::flow_manager_mp::FlowManagerMp`].
#[derive(Debug, Error)]
pub enum MpError {
    /// The callback registered for the separate result-processor thread could not be
    /// resolved to a `Send + 'static` function pointer. The type system rejects this at
    /// compile time for the common case; this variant only fires for the dynamic
    /// registry path described in SPEC_FULL.md section 4.6.
    #[error("callback is not transportable to the result-processor thread: {reason}")]
    Picklability { reason: String },

    /// The worker or result-processor thread did not join within the configured timeout.
    #[error("worker thread did not shut down within {waited:?}")]
    ShutdownTimeout { waited: Duration },
}
