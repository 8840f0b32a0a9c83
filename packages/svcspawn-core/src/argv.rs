//! Argument generator interface and the default (`node`-family) shape.

use crate::env::ServiceEnv;
use crate::error::SpawnMiddlewareError;
use crate::service::ServiceDescriptor;

/// `(service, env) -> argv`. Per-language generators (bash, lua, perl,
/// scheme, smalltalk, tcl) live in the `svcspawn_langs` crate; this trait
/// is the seam between them and the spawn controller.
pub trait ArgGenerator: Send + Sync {
    fn generate(
        &self,
        service: &ServiceDescriptor,
        env: &ServiceEnv,
        code: &str,
    ) -> Result<Vec<String>, SpawnMiddlewareError>;
}

/// Default shape used when no per-language generator is registered:
/// `["-c", code, "-e", serialize(env), "-s", serialize(service)]`.
/// Used directly by `javascript`, `babel`, `coffee-script`.
pub struct DefaultArgGenerator {
    /// Maximum serialized argv size in bytes. Defaults to a conservative
    /// stand-in for the platform `ARG_MAX`; override via
    /// [`MiddlewareConfig`](crate::config::MiddlewareConfig).
    pub argv_limit_bytes: usize,
}

/// Conservative default ceiling on total argv bytes, standing in for the
/// platform `ARG_MAX` (historically 2MiB on Linux, smaller on other
/// platforms). Configurable — see spec §4.2 and §9 open questions.
pub const DEFAULT_ARGV_LIMIT_BYTES: usize = 2 * 1024 * 1024;

impl Default for DefaultArgGenerator {
    fn default() -> Self {
        Self {
            argv_limit_bytes: DEFAULT_ARGV_LIMIT_BYTES,
        }
    }
}

impl ArgGenerator for DefaultArgGenerator {
    fn generate(
        &self,
        service: &ServiceDescriptor,
        env: &ServiceEnv,
        code: &str,
    ) -> Result<Vec<String>, SpawnMiddlewareError> {
        let serialized_env = serde_json::to_string(env)
            .map_err(|e| SpawnMiddlewareError::Configuration(format!("env serialize: {e}")))?;
        let serialized_service = serde_json::to_string(service)
            .map_err(|e| SpawnMiddlewareError::Configuration(format!("service serialize: {e}")))?;

        let argv = vec![
            "-c".to_string(),
            code.to_string(),
            "-e".to_string(),
            serialized_env,
            "-s".to_string(),
            serialized_service,
        ];

        check_argv_limit(&argv, self.argv_limit_bytes)?;
        Ok(argv)
    }
}

/// Shared guard used by every argument generator: argv must never be
/// silently truncated. Exceeding the limit fails with `ArgvTooLarge`
/// rather than dropping bytes.
pub fn check_argv_limit(argv: &[String], limit: usize) -> Result<(), SpawnMiddlewareError> {
    let total: usize = argv.iter().map(|s| s.len() + 1).sum();
    if total > limit {
        return Err(SpawnMiddlewareError::ArgvTooLarge {
            limit,
            actual: total,
        });
    }
    Ok(())
}
