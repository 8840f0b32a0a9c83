use svcspawn_core::argv::{check_argv_limit, DEFAULT_ARGV_LIMIT_BYTES};
use svcspawn_core::{ArgGenerator, ServiceDescriptor, ServiceEnv, SpawnMiddlewareError};

/// Tcl's executor mirrors bash's `-c` convention.
pub struct TclArgGenerator {
    pub argv_limit_bytes: usize,
}

impl Default for TclArgGenerator {
    fn default() -> Self {
        Self {
            argv_limit_bytes: DEFAULT_ARGV_LIMIT_BYTES,
        }
    }
}

impl ArgGenerator for TclArgGenerator {
    fn generate(
        &self,
        _service: &ServiceDescriptor,
        env: &ServiceEnv,
        code: &str,
    ) -> Result<Vec<String>, SpawnMiddlewareError> {
        let serialized_env = serde_json::to_string(env)
            .map_err(|e| SpawnMiddlewareError::Configuration(format!("env serialize: {e}")))?;

        let argv = vec![
            "-c".to_string(),
            code.to_string(),
            "--env".to_string(),
            serialized_env,
        ];
        check_argv_limit(&argv, self.argv_limit_bytes)?;
        Ok(argv)
    }
}
