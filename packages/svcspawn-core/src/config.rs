//! The recognized configuration surface, built once at handler
//! construction and shared immutably across every request — mirroring
//! the role the teacher's `ConfigManager` plays for its own tool crates.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Formats the response body written when the per-invocation timeout
/// fires. Default mirrors `messages.serviceExecutionTimeout(seconds)`.
pub type TimeoutMessageFn = Arc<dyn Fn(u64) -> String + Send + Sync>;

#[derive(Clone)]
pub struct MiddlewareConfig {
    /// Default per-request timeout, used when a service has no
    /// `custom_timeout` override.
    pub service_max_timeout: Duration,
    /// Root directory under which `bin/binaries/<name>` executors live.
    pub binaries_root: String,
    /// Formatter for the body written on timeout.
    pub timeout_message: TimeoutMessageFn,
    /// Default environment map merged under any per-service overrides.
    pub default_env: HashMap<String, String>,
    /// Ceiling on serialized argv size; see [`crate::argv::check_argv_limit`].
    pub argv_limit_bytes: usize,
}

impl MiddlewareConfig {
    pub fn new(service_max_timeout: Duration, binaries_root: String) -> Self {
        Self {
            service_max_timeout,
            binaries_root,
            timeout_message: Arc::new(default_timeout_message),
            default_env: HashMap::new(),
            argv_limit_bytes: crate::argv::DEFAULT_ARGV_LIMIT_BYTES,
        }
    }
}

fn default_timeout_message(seconds: u64) -> String {
    format!("Service execution timed out after {seconds} seconds.\n")
}
