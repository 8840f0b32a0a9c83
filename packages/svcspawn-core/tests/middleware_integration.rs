//! End-to-end scenarios from spec.md §8, driven through the full
//! `ServiceSpawnMiddleware::handle` path (language dispatch, env
//! assembly, argv generation, spawn, coordinator) rather than the
//! coordinator alone. Fake executor binaries stand in for the real
//! per-language interpreters, per `spec.md` §1 ("the set of
//! per-language executor binaries" is an external collaborator treated
//! as an opaque program obeying a fixed stdio contract) — these stubs
//! only need to obey that contract, not actually implement a language.

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use svcspawn_core::env::{RequestBody, RequestMeta};
use svcspawn_core::error::SpawnMiddlewareError;
use svcspawn_core::language::Language;
use svcspawn_core::middleware::MiddlewareOutcome;
use svcspawn_core::transpile::{DashMapCache, TranspileService, Transpiler};
use svcspawn_core::{MiddlewareConfig, ServiceDescriptor, ServiceDescriptorInput, ServiceSpawnMiddleware};

/// Writes an executable stub at `<root>/bin/binaries/<name>` and returns
/// `root`. The stub is a `/bin/sh` script so no language runtime needs
/// to be installed on the test machine.
fn install_stub(name: &str, script_body: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!(
        "svcspawn-it-{name}-{}",
        std::process::id()
    ));
    let dir = root.join("bin").join("binaries");
    fs::create_dir_all(&dir).expect("create binaries dir");
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{script_body}\n")).expect("write stub");
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod stub");
    root
}

fn request(body: RequestBody) -> RequestMeta {
    RequestMeta {
        method: "GET".into(),
        headers: HashMap::new(),
        host: "example.test".into(),
        path: "/".into(),
        url: "/".into(),
        params: HashMap::new(),
        remote_addr: "127.0.0.1".into(),
        resource_instance: None,
        resource_params: None,
        body,
    }
}

async fn drain(
    mut rx: tokio::sync::mpsc::UnboundedReceiver<std::io::Result<Bytes>>,
) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = rx.recv().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

/// Scenario 1: language `bash`, code `echo "hello world"`, empty body
/// -> response body exactly `hello world\n`.
#[tokio::test]
async fn bash_echo_hello_world_end_to_end() {
    // BashArgGenerator emits ["-c", code, "--env", json]; the stub shells
    // out to the code argument directly.
    let root = install_stub("bash", "CODE=\"$2\"; exec /bin/sh -c \"$CODE\"");

    let service = ServiceDescriptor::build(ServiceDescriptorInput {
        code: Some(r#"echo "hello world""#.into()),
        language: Some("bash".into()),
        ..Default::default()
    })
    .unwrap();
    let config = MiddlewareConfig::new(Duration::from_secs(5), root.display().to_string());
    let cache = Arc::new(DashMapCache::new());
    let transpile = TranspileService::new(cache);

    let mut middleware = ServiceSpawnMiddleware::new(service, config, transpile);
    for (language, generator) in svcspawn_langs::registry() {
        middleware = middleware.with_arg_generator(language, generator);
    }

    let outcome = middleware
        .handle(None, request(RequestBody::None), None, None)
        .await
        .unwrap();

    match outcome {
        MiddlewareOutcome::Spawned { body, join } => {
            let bytes = drain(body).await;
            assert_eq!(bytes, b"hello world\n");
            let invocation = join.await.unwrap();
            assert_eq!(invocation.message, "response ended");
            assert!(invocation.status.service_ended);
        }
        MiddlewareOutcome::Diagnostic { body } => {
            panic!("expected spawn, got diagnostic: {body:?}");
        }
    }

    let _ = fs::remove_dir_all(root);
}

/// Scenario 4 (bash analogue): a long-running child is killed on
/// timeout and the timeout message is appended; no further child bytes
/// appear in the response.
#[tokio::test]
async fn timeout_kills_child_and_appends_configured_message() {
    let root = install_stub(
        "bash",
        "CODE=\"$2\"; exec /bin/sh -c \"$CODE\"",
    );

    let service = ServiceDescriptor::build(ServiceDescriptorInput {
        code: Some("sleep 5 && echo late".into()),
        language: Some("bash".into()),
        custom_timeout: Some(Duration::from_millis(80)),
        ..Default::default()
    })
    .unwrap();
    let mut config = MiddlewareConfig::new(Duration::from_secs(5), root.display().to_string());
    config.timeout_message = Arc::new(|secs| format!("Service execution timed out after {secs} seconds.\n"));
    let cache = Arc::new(DashMapCache::new());
    let transpile = TranspileService::new(cache);

    let mut middleware = ServiceSpawnMiddleware::new(service, config, transpile);
    for (language, generator) in svcspawn_langs::registry() {
        middleware = middleware.with_arg_generator(language, generator);
    }

    let outcome = middleware
        .handle(None, request(RequestBody::None), None, None)
        .await
        .unwrap();

    match outcome {
        MiddlewareOutcome::Spawned { body, join } => {
            let bytes = drain(body).await;
            let text = String::from_utf8(bytes).unwrap();
            assert!(text.contains("timed out"), "unexpected body: {text:?}");
            assert!(!text.contains("late"), "child output leaked past timeout: {text:?}");
            let invocation = join.await.unwrap();
            assert!(invocation.status.service_ended);
        }
        MiddlewareOutcome::Diagnostic { body } => panic!("expected spawn, got {body:?}"),
    }

    let _ = fs::remove_dir_all(root);
}

/// Scenario 3/5: identical source submitted twice shares the cache and
/// the registered transpiler runs exactly once.
#[tokio::test]
async fn repeated_invocations_share_transpile_cache() {
    struct CountingTranspiler {
        calls: AtomicUsize,
    }
    impl Transpiler for CountingTranspiler {
        fn compile(&self, source: &str) -> Result<String, SpawnMiddlewareError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("echo '{source}'"))
        }
    }

    let root = install_stub("bash", "CODE=\"$2\"; exec /bin/sh -c \"$CODE\"");

    let service = ServiceDescriptor::build(ServiceDescriptorInput {
        code: Some("compiled-once".into()),
        language: Some("coffee-script".into()),
        ..Default::default()
    })
    .unwrap();
    let config = MiddlewareConfig::new(Duration::from_secs(5), root.display().to_string());
    let cache = Arc::new(DashMapCache::new());
    let mut transpile = TranspileService::new(cache);
    let transpiler = Arc::new(CountingTranspiler {
        calls: AtomicUsize::new(0),
    });
    transpile.register(Language::CoffeeScript, transpiler.clone());

    let middleware = ServiceSpawnMiddleware::new(service, config, transpile);

    // coffee-script is node-family, so the default generator is used and
    // no real "node" stub is needed to observe the cache behavior; the
    // spawn will fail (no node binary) but transpile happens first.
    for _ in 0..2 {
        let _ = middleware
            .handle(None, request(RequestBody::None), None, None)
            .await;
    }

    assert_eq!(transpiler.calls.load(Ordering::SeqCst), 1);
    let _ = fs::remove_dir_all(root);
}

/// Oversized argv is rejected as a client-visible diagnostic before any
/// child is ever spawned.
#[tokio::test]
async fn oversized_argv_never_spawns_a_child() {
    let root = install_stub("bash", "echo should-not-run");

    let service = ServiceDescriptor::build(ServiceDescriptorInput {
        code: Some("x".repeat(64)),
        language: Some("bash".into()),
        ..Default::default()
    })
    .unwrap();
    let mut config = MiddlewareConfig::new(Duration::from_secs(5), root.display().to_string());
    config.argv_limit_bytes = 8;
    let cache = Arc::new(DashMapCache::new());
    let transpile = TranspileService::new(cache);

    let mut middleware = ServiceSpawnMiddleware::new(service, config, transpile);
    for (language, generator) in svcspawn_langs::registry_with_limit(8) {
        middleware = middleware.with_arg_generator(language, generator);
    }

    let outcome = middleware
        .handle(None, request(RequestBody::None), None, None)
        .await
        .unwrap();

    match outcome {
        MiddlewareOutcome::Diagnostic { body } => {
            let text = String::from_utf8(body.to_vec()).unwrap();
            assert!(text.contains("argv too large"), "unexpected body: {text:?}");
        }
        MiddlewareOutcome::Spawned { .. } => panic!("argv-too-large must not spawn"),
    }

    let _ = fs::remove_dir_all(root);
}
