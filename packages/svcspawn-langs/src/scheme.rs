use svcspawn_core::argv::{check_argv_limit, DEFAULT_ARGV_LIMIT_BYTES};
use svcspawn_core::{ArgGenerator, ServiceDescriptor, ServiceEnv, SpawnMiddlewareError};

/// Scheme's executor evaluates an expression via `--eval`.
pub struct SchemeArgGenerator {
    pub argv_limit_bytes: usize,
}

impl Default for SchemeArgGenerator {
    fn default() -> Self {
        Self {
            argv_limit_bytes: DEFAULT_ARGV_LIMIT_BYTES,
        }
    }
}

impl ArgGenerator for SchemeArgGenerator {
    fn generate(
        &self,
        _service: &ServiceDescriptor,
        env: &ServiceEnv,
        code: &str,
    ) -> Result<Vec<String>, SpawnMiddlewareError> {
        let serialized_env = serde_json::to_string(env)
            .map_err(|e| SpawnMiddlewareError::Configuration(format!("env serialize: {e}")))?;

        let argv = vec![
            "--eval".to_string(),
            code.to_string(),
            "--env".to_string(),
            serialized_env,
        ];
        check_argv_limit(&argv, self.argv_limit_bytes)?;
        Ok(argv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use svcspawn_core::env::{ConnectionEnv, InputEnv};
    use svcspawn_core::ServiceDescriptorInput;

    #[test]
    fn shape_is_dash_dash_eval_code_env() {
        let svc = ServiceDescriptor::build(ServiceDescriptorInput {
            code: Some("(display 1)".into()),
            language: Some("scheme".into()),
            ..Default::default()
        })
        .unwrap();
        let env = ServiceEnv {
            params: serde_json::Value::Null,
            is_streaming: false,
            custom_timeout: 1000,
            env: HashMap::new(),
            resource: serde_json::Value::Null,
            input: InputEnv {
                method: "GET".into(),
                headers: HashMap::new(),
                host: "h".into(),
                path: "/".into(),
                params: HashMap::new(),
                url: "/".into(),
                connection: ConnectionEnv {
                    remote_address: "127.0.0.1".into(),
                },
            },
            is_hookio: None,
            hook_access_key: None,
        };

        let argv = SchemeArgGenerator::default()
            .generate(&svc, &env, &svc.code)
            .unwrap();
        assert_eq!(argv[0], "--eval");
        assert_eq!(argv[1], "(display 1)");
    }
}
