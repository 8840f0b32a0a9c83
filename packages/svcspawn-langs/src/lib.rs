//! Per-language argument generators. `node`-family languages
//! (`javascript`, `babel`, `coffee-script`) use `svcspawn_core`'s
//! `DefaultArgGenerator` directly and have no entry here — see spec
//! §4.2.

mod bash;
mod lua;
mod perl;
mod scheme;
mod smalltalk;
mod tcl;

pub use bash::BashArgGenerator;
pub use lua::LuaArgGenerator;
pub use perl::PerlArgGenerator;
pub use scheme::SchemeArgGenerator;
pub use smalltalk::SmalltalkArgGenerator;
pub use tcl::TclArgGenerator;

use std::collections::HashMap;
use std::sync::Arc;

use svcspawn_core::{ArgGenerator, Language};

/// Builds the registry of every non-default generator, keyed by the
/// language it applies to, each enforcing `argv_limit_bytes` (see spec
/// §4.2). Callers register these on a `ServiceSpawnMiddleware` via
/// `with_arg_generator`.
pub fn registry_with_limit(argv_limit_bytes: usize) -> HashMap<Language, Arc<dyn ArgGenerator>> {
    let mut map: HashMap<Language, Arc<dyn ArgGenerator>> = HashMap::new();
    map.insert(
        Language::Bash,
        Arc::new(BashArgGenerator { argv_limit_bytes }),
    );
    map.insert(
        Language::Lua,
        Arc::new(LuaArgGenerator { argv_limit_bytes }),
    );
    map.insert(
        Language::Perl,
        Arc::new(PerlArgGenerator { argv_limit_bytes }),
    );
    map.insert(
        Language::Scheme,
        Arc::new(SchemeArgGenerator { argv_limit_bytes }),
    );
    map.insert(
        Language::Smalltalk,
        Arc::new(SmalltalkArgGenerator { argv_limit_bytes }),
    );
    map.insert(
        Language::Tcl,
        Arc::new(TclArgGenerator { argv_limit_bytes }),
    );
    map
}

/// Convenience wrapper using [`svcspawn_core::argv::DEFAULT_ARGV_LIMIT_BYTES`].
pub fn registry() -> HashMap<Language, Arc<dyn ArgGenerator>> {
    registry_with_limit(svcspawn_core::argv::DEFAULT_ARGV_LIMIT_BYTES)
}
