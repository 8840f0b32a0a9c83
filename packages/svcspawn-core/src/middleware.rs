//! The middleware adapter: the transport-agnostic `(request, response,
//! next)` contract from spec §4.8/§6, decoupled from any HTTP framework
//! so `svcspawn-demo` can wire it into `axum` without this crate
//! depending on `axum` at all.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::argv::{ArgGenerator, DefaultArgGenerator};
use crate::config::MiddlewareConfig;
use crate::coordinator::{self, BodyStream, InvocationOutcome, NullStderrControlHandler, StderrControlHandler};
use crate::env::{EnvAssembler, RequestMeta};
use crate::error::SpawnMiddlewareError;
use crate::language::{Language, LanguageRegistry};
use crate::service::ServiceDescriptor;
use crate::spawn::SpawnController;
use crate::transpile::TranspileService;

/// Result of handling one request. The normal path spawns a child and
/// streams its stdout; `transpile`/`argv` failures are diagnostics
/// written directly to the client without ever spawning, per spec §7.
pub enum MiddlewareOutcome {
    Spawned {
        body: mpsc::UnboundedReceiver<std::io::Result<Bytes>>,
        join: JoinHandle<InvocationOutcome>,
    },
    Diagnostic {
        body: Bytes,
    },
}

/// Reusable across many concurrent requests: everything here is either
/// immutable or internally synchronized (the transpile cache).
pub struct ServiceSpawnMiddleware {
    service: ServiceDescriptor,
    config: MiddlewareConfig,
    registry: LanguageRegistry,
    transpile: TranspileService,
    arg_generators: HashMap<Language, Arc<dyn ArgGenerator>>,
    default_generator: DefaultArgGenerator,
    stderr_handler: Arc<dyn StderrControlHandler>,
}

impl ServiceSpawnMiddleware {
    pub fn new(
        service: ServiceDescriptor,
        config: MiddlewareConfig,
        transpile: TranspileService,
    ) -> Self {
        let registry = LanguageRegistry::new(PathBuf::from(&config.binaries_root));
        let default_generator = DefaultArgGenerator {
            argv_limit_bytes: config.argv_limit_bytes,
        };
        Self {
            service,
            config,
            registry,
            transpile,
            arg_generators: HashMap::new(),
            default_generator,
            stderr_handler: Arc::new(NullStderrControlHandler),
        }
    }

    /// Register a per-language argument generator (bash, lua, perl,
    /// scheme, smalltalk, tcl — see `svcspawn_langs`).
    #[must_use]
    pub fn with_arg_generator(mut self, language: Language, generator: Arc<dyn ArgGenerator>) -> Self {
        self.arg_generators.insert(language, generator);
        self
    }

    #[must_use]
    pub fn with_stderr_handler(mut self, handler: Arc<dyn StderrControlHandler>) -> Self {
        self.stderr_handler = handler;
        self
    }

    /// Handle one request. `code_override` models the request's `code`
    /// property overriding the service's own. `hook_access_key` is
    /// forwarded into `__env` only when the service `is_hookio`.
    pub async fn handle(
        &self,
        code_override: Option<String>,
        request: RequestMeta,
        body: Option<BodyStream>,
        hook_access_key: Option<String>,
    ) -> Result<MiddlewareOutcome, SpawnMiddlewareError> {
        let service = match code_override {
            Some(code) => self.service.with_code(code),
            None => self.service.clone(),
        };

        let compiled = match self.transpile.maybe_transpile(service.language, &service.code) {
            Ok(compiled) => compiled,
            Err(SpawnMiddlewareError::Transpile(msg)) => {
                return Ok(MiddlewareOutcome::Diagnostic {
                    body: Bytes::from(msg),
                });
            }
            Err(other) => return Err(other),
        };

        let env = EnvAssembler::assemble(&service, &request, &self.config, hook_access_key);

        let argv = {
            let result = if service.language.is_node_family() {
                self.default_generator.generate(&service, &env, &compiled)
            } else if let Some(generator) = self.arg_generators.get(&service.language) {
                generator.generate(&service, &env, &compiled)
            } else {
                self.default_generator.generate(&service, &env, &compiled)
            };
            match result {
                Ok(argv) => argv,
                Err(SpawnMiddlewareError::ArgvTooLarge { limit, actual }) => {
                    return Ok(MiddlewareOutcome::Diagnostic {
                        body: Bytes::from(format!(
                            "argv too large: {actual} bytes exceeds limit of {limit} bytes"
                        )),
                    });
                }
                Err(other) => return Err(other),
            }
        };

        let binary = match self.registry.resolve_binary(service.language) {
            Ok(path) => path,
            Err(SpawnMiddlewareError::Spawn(msg)) => {
                return Ok(MiddlewareOutcome::Diagnostic {
                    body: Bytes::from(msg),
                });
            }
            Err(other) => return Err(other),
        };

        let child = match SpawnController::spawn(&binary, &argv) {
            Ok(child) => child,
            Err(SpawnMiddlewareError::Spawn(msg)) => {
                return Ok(MiddlewareOutcome::Diagnostic {
                    body: Bytes::from(msg),
                });
            }
            Err(other) => return Err(other),
        };

        let timeout = service.custom_timeout.unwrap_or(self.config.service_max_timeout);
        let timeout_message = self.config.timeout_message.clone();
        let stderr_handler = self.stderr_handler.clone();

        let (tx, rx) = mpsc::unbounded_channel();
        let join = tokio::spawn(async move {
            coordinator::run_invocation(child, timeout, stderr_handler, body, tx, move |secs| {
                timeout_message(secs)
            })
            .await
        });

        Ok(MiddlewareOutcome::Spawned { body: rx, join })
    }
}

/// Default continuation used when the host passes no `next` callback:
/// logs a warning with the outcome, matching spec §4.8.
pub fn default_next(outcome: &Result<InvocationOutcome, SpawnMiddlewareError>) {
    match outcome {
        Ok(outcome) => log::warn!(
            "service-spawn middleware completed with no `next` callback: {} (status={:?})",
            outcome.message,
            outcome.status
        ),
        Err(e) => log::warn!("service-spawn middleware completed with no `next` callback: {e}"),
    }
}
