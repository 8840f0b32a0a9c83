//! The environment assembler: a pure function from `(service, request,
//! config)` to the `__env` payload handed to the executor.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::config::MiddlewareConfig;
use crate::language::Language;
use crate::service::ServiceDescriptor;

/// State of the incoming request body, as observed at assembly time.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// No body (e.g. GET with no payload).
    None,
    /// Body already fully read into memory.
    Buffered(bytes::Bytes),
    /// Body is a readable stream; `finished` and `has_pending_bytes`
    /// describe its state at the moment `__env` is assembled.
    Streaming {
        finished: bool,
        has_pending_bytes: bool,
    },
}

impl RequestBody {
    /// True iff the body is an as-yet-unfinished readable stream with
    /// buffered or pending bytes.
    fn is_streaming(&self) -> bool {
        matches!(
            self,
            RequestBody::Streaming {
                finished: false,
                has_pending_bytes: true
            }
        )
    }
}

/// The inbound request data the assembler needs. Framework-agnostic: the
/// middleware adapter is responsible for filling this in from whatever
/// HTTP request type the host uses.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: String,
    pub headers: HashMap<String, String>,
    pub host: String,
    pub path: String,
    pub url: String,
    pub params: HashMap<String, Value>,
    pub remote_addr: String,
    pub resource_instance: Option<Value>,
    pub resource_params: Option<Value>,
    pub body: RequestBody,
}

/// The `__env` payload, serialized verbatim for the executor's `-e` argv
/// slot (or passed through per-language argument generators).
#[derive(Debug, Clone, Serialize)]
pub struct ServiceEnv {
    pub params: Value,
    pub is_streaming: bool,
    pub custom_timeout: u64,
    pub env: HashMap<String, String>,
    pub resource: Value,
    pub input: InputEnv,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_hookio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_access_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionEnv {
    pub remote_address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputEnv {
    pub method: String,
    pub headers: HashMap<String, String>,
    pub host: String,
    pub path: String,
    pub params: HashMap<String, Value>,
    pub url: String,
    pub connection: ConnectionEnv,
}

/// Builds `__env` from `(service, request, config)` with no hidden
/// state: the same three inputs always produce the same output.
pub struct EnvAssembler;

impl EnvAssembler {
    pub fn assemble(
        service: &ServiceDescriptor,
        request: &RequestMeta,
        config: &MiddlewareConfig,
        hook_access_key: Option<String>,
    ) -> ServiceEnv {
        let params = request
            .resource_instance
            .clone()
            .or_else(|| request.resource_params.clone())
            .unwrap_or_else(|| Value::Object(Default::default()));

        let remote_address = request
            .headers
            .get("x-forwarded-for")
            .cloned()
            .unwrap_or_else(|| request.remote_addr.clone());

        let custom_timeout = service
            .custom_timeout
            .unwrap_or(config.service_max_timeout)
            .as_millis() as u64;

        let mut env = config.default_env.clone();
        env.extend(service.env.clone());

        let resource = if service.language == Language::Lua {
            Value::Object(Default::default())
        } else {
            serde_json::to_value(service).unwrap_or(Value::Null)
        };

        ServiceEnv {
            params,
            is_streaming: request.body.is_streaming(),
            custom_timeout,
            env,
            resource,
            input: InputEnv {
                method: request.method.clone(),
                headers: request.headers.clone(),
                host: request.host.clone(),
                path: request.path.clone(),
                params: request.params.clone(),
                url: request.url.clone(),
                connection: ConnectionEnv { remote_address },
            },
            is_hookio: service.is_hookio.then_some(true),
            hook_access_key,
        }
    }
}
