//! Service-spawning middleware core: language dispatch, transpile
//! caching, environment assembly, child-process lifecycle, and
//! process-tree termination behind a transport-agnostic adapter.
//!
//! See `SPEC_FULL.md` at the workspace root for the full component
//! breakdown; `DESIGN.md` records what each module is grounded on.

pub mod argv;
pub mod config;
pub mod coordinator;
pub mod env;
pub mod error;
pub mod language;
pub mod middleware;
pub mod service;
pub mod spawn;
pub mod terminator;
pub mod transpile;

pub use argv::{ArgGenerator, DefaultArgGenerator};
pub use config::MiddlewareConfig;
pub use coordinator::{Controller, InvocationOutcome, NullStderrControlHandler, StderrControlHandler, Status};
pub use env::{EnvAssembler, RequestBody, RequestMeta, ServiceEnv};
pub use error::SpawnMiddlewareError;
pub use language::{Language, LanguageRegistry};
pub use middleware::{MiddlewareOutcome, ServiceSpawnMiddleware};
pub use service::{ServiceDescriptor, ServiceDescriptorInput};
pub use transpile::{CompileCache, DashMapCache, TranspileService, Transpiler};
