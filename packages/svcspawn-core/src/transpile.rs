//! Transpiler registry and the fingerprint-keyed compile cache.

use std::sync::Arc;

use dashmap::DashMap;
use md5::{Digest, Md5};

use crate::error::SpawnMiddlewareError;
use crate::language::Language;

/// A synchronous source-to-source transpiler, e.g. CoffeeScript or Babel.
/// Treated as an opaque external collaborator: the middleware only needs
/// to know it can fail.
pub trait Transpiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<String, SpawnMiddlewareError>;
}

/// Pluggable compile-cache interface, keyed by source fingerprint.
/// `get`/`put` only; no eviction policy is mandated.
pub trait CompileCache: Send + Sync {
    fn get(&self, fingerprint: &str) -> Option<String>;
    fn put(&self, fingerprint: &str, compiled: String);
}

/// Default in-memory cache, process-lifetime, thread-safe, read-mostly.
/// Duplicate transpilation across a race is tolerated rather than
/// single-flighted (see spec §5).
#[derive(Default)]
pub struct DashMapCache {
    map: DashMap<String, String>,
}

impl DashMapCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompileCache for DashMapCache {
    fn get(&self, fingerprint: &str) -> Option<String> {
        self.map.get(fingerprint).map(|v| v.clone())
    }

    fn put(&self, fingerprint: &str, compiled: String) {
        self.map.insert(fingerprint.to_string(), compiled);
    }
}

/// Hex MD5 of the UTF-8 source text. Collisions are acceptable here —
/// the fingerprint only deduplicates, it is not security-sensitive.
pub fn fingerprint(source: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(source.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Registry of transpilers keyed by language, backed by a pluggable
/// cache. Only `coffee-script` and `babel` have transpilers registered
/// by default; every other language passes source through untouched.
pub struct TranspileService {
    transpilers: std::collections::HashMap<Language, Arc<dyn Transpiler>>,
    cache: Arc<dyn CompileCache>,
}

impl TranspileService {
    pub fn new(cache: Arc<dyn CompileCache>) -> Self {
        Self {
            transpilers: std::collections::HashMap::new(),
            cache,
        }
    }

    pub fn register(&mut self, language: Language, transpiler: Arc<dyn Transpiler>) {
        self.transpilers.insert(language, transpiler);
    }

    /// Transpile `source` for `language` if a transpiler is registered,
    /// consulting the cache first. Languages with no registered
    /// transpiler return `source` unchanged, and the cache is never
    /// consulted for them.
    pub fn maybe_transpile(
        &self,
        language: Language,
        source: &str,
    ) -> Result<String, SpawnMiddlewareError> {
        let Some(transpiler) = self.transpilers.get(&language) else {
            return Ok(source.to_string());
        };

        let fp = fingerprint(source);
        if let Some(cached) = self.cache.get(&fp) {
            return Ok(cached);
        }

        let compiled = transpiler.compile(source)?;
        self.cache.put(&fp, compiled.clone());
        Ok(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTranspiler {
        calls: AtomicUsize,
    }

    impl Transpiler for CountingTranspiler {
        fn compile(&self, source: &str) -> Result<String, SpawnMiddlewareError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("compiled({source})"))
        }
    }

    #[test]
    fn cache_put_then_get_round_trips() {
        let cache = DashMapCache::new();
        cache.put("abc", "xyz".to_string());
        assert_eq!(cache.get("abc"), Some("xyz".to_string()));
    }

    #[test]
    fn repeated_invocations_transpile_at_most_once() {
        let cache = Arc::new(DashMapCache::new());
        let mut svc = TranspileService::new(cache);
        let transpiler = Arc::new(CountingTranspiler {
            calls: AtomicUsize::new(0),
        });
        svc.register(Language::CoffeeScript, transpiler.clone());

        let a = svc
            .maybe_transpile(Language::CoffeeScript, "x = 1")
            .unwrap();
        let b = svc
            .maybe_transpile(Language::CoffeeScript, "x = 1")
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(transpiler.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn languages_without_a_transpiler_pass_through() {
        let cache = Arc::new(DashMapCache::new());
        let svc = TranspileService::new(cache);
        let out = svc.maybe_transpile(Language::Bash, "echo hi").unwrap();
        assert_eq!(out, "echo hi");
    }
}
