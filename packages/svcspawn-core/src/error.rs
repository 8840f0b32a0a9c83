use thiserror::Error;

/// Error kinds recognized by the service-spawning middleware.
///
/// `Configuration` is the only variant that can surface before a request
/// is ever handled (handler construction, or first-request language
/// lookup); every other variant is produced *during* an invocation and is
/// carried inside an [`crate::coordinator::InvocationOutcome`] rather than
/// returned as an `Err` from the coordinator, so that exactly one
/// terminator still runs per invocation.
#[derive(Debug, Error)]
pub enum SpawnMiddlewareError {
    /// Missing `code`, or a language tag outside the canonical set.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Raised synchronously while transpiling source.
    #[error("transpile error: {0}")]
    Transpile(String),

    /// Serialized argv would exceed the configured/platform limit.
    #[error("argv too large: {actual} bytes exceeds limit of {limit} bytes")]
    ArgvTooLarge { limit: usize, actual: usize },

    /// The child failed to start (missing binary, spawn failure).
    #[error("spawn error: {0}")]
    Spawn(String),

    /// The child exited with a non-zero code or was signaled.
    #[error("child exited abnormally: code={code:?} signal={signal:?}")]
    RuntimeChild {
        code: Option<i32>,
        signal: Option<i32>,
    },

    /// The per-invocation timeout fired before the child completed.
    #[error("service execution timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Writing to the child's stdin failed; recorded, never surfaced.
    #[error("stdin error: {0}")]
    Stdin(String),
}
