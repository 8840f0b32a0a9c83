//! Demo host: wires `svcspawn_core`'s transport-agnostic middleware into
//! a real `axum` server, the way each of the teacher's `tools-*` crates
//! ships a thin `main.rs` that serves its tool set over a transport.

mod cli;
mod server;
mod transpilers;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use svcspawn_core::language::Language;
use svcspawn_core::transpile::{DashMapCache, TranspileService};
use svcspawn_core::{MiddlewareConfig, ServiceDescriptor, ServiceDescriptorInput, ServiceSpawnMiddleware};

use crate::cli::Args;
use crate::transpilers::PassthroughTranspiler;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let code = match (args.code, args.code_file) {
        (Some(code), None) => code,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading --code-file {path}"))?,
        (None, None) => {
            anyhow::bail!("one of --code or --code-file is required");
        }
        (Some(_), Some(_)) => unreachable!("clap enforces conflicts_with"),
    };

    let service = ServiceDescriptor::build(ServiceDescriptorInput {
        code: Some(code),
        language: Some(args.language),
        is_hookio: args.is_hookio,
        ..Default::default()
    })?;

    let config = MiddlewareConfig::new(
        Duration::from_millis(args.service_max_timeout_ms),
        args.binaries_root,
    );

    let cache = Arc::new(DashMapCache::new());
    let mut transpile = TranspileService::new(cache);
    transpile.register(
        Language::CoffeeScript,
        Arc::new(PassthroughTranspiler {
            label: "coffee-script",
        }),
    );
    transpile.register(
        Language::Babel,
        Arc::new(PassthroughTranspiler { label: "babel" }),
    );

    let argv_limit_bytes = config.argv_limit_bytes;
    let mut middleware = ServiceSpawnMiddleware::new(service, config, transpile);
    for (language, generator) in svcspawn_langs::registry_with_limit(argv_limit_bytes) {
        middleware = middleware.with_arg_generator(language, generator);
    }

    let state = server::AppState {
        middleware: Arc::new(middleware),
    };
    let router = server::build_router(state);

    let addr: std::net::SocketAddr = args.addr.parse().context("parsing --addr")?;
    server::serve(addr, router).await
}
