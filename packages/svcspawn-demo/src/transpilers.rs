//! Placeholder transpilers wired up at demo-host startup.
//!
//! `spec.md` §1 treats the CoffeeScript/Babel compilers as external
//! collaborators — this host doesn't embed real `coffeescript`/`babel`
//! toolchains, so it registers a pass-through stand-in that exercises
//! the cache path (fingerprint, `get`, `put`) without actually
//! transforming source. A real deployment swaps this for a transpiler
//! that shells out to (or embeds) the genuine compiler.

use svcspawn_core::error::SpawnMiddlewareError;
use svcspawn_core::transpile::Transpiler;

pub struct PassthroughTranspiler {
    pub label: &'static str,
}

impl Transpiler for PassthroughTranspiler {
    fn compile(&self, source: &str) -> Result<String, SpawnMiddlewareError> {
        log::debug!("{} transpiler stand-in invoked ({} bytes)", self.label, source.len());
        Ok(source.to_string())
    }
}
