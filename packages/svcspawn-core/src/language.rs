//! Canonical language tags and the binary-dispatch registry.
//!
//! Mirrors the way the rest of this codebase keys its tool dispatch
//! tables off a small closed enum rather than raw strings.

use std::path::{Path, PathBuf};

use crate::error::SpawnMiddlewareError;

/// The closed set of language tags the middleware understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    Javascript,
    Babel,
    CoffeeScript,
    Bash,
    Lua,
    Perl,
    Php,
    Python,
    Python3,
    Ruby,
    Scheme,
    Smalltalk,
    Tcl,
}

impl Language {
    /// The canonical on-wire tag, e.g. `"coffee-script"`.
    pub fn as_tag(self) -> &'static str {
        match self {
            Language::Javascript => "javascript",
            Language::Babel => "babel",
            Language::CoffeeScript => "coffee-script",
            Language::Bash => "bash",
            Language::Lua => "lua",
            Language::Perl => "perl",
            Language::Php => "php",
            Language::Python => "python",
            Language::Python3 => "python3",
            Language::Ruby => "ruby",
            Language::Scheme => "scheme",
            Language::Smalltalk => "smalltalk",
            Language::Tcl => "tcl",
        }
    }

    /// Canonicalize a raw tag, applying legacy aliases.
    ///
    /// Empty/undefined maps to `javascript`; `coffee` to `coffee-script`;
    /// `es6`/`es7` to `babel`. Idempotent: `canonicalize(tag.as_tag())`
    /// always returns `tag` unchanged.
    pub fn canonicalize(raw: Option<&str>) -> Result<Language, SpawnMiddlewareError> {
        let raw = raw.unwrap_or("").trim();
        let lang = match raw {
            "" => Language::Javascript,
            "coffee" | "coffee-script" => Language::CoffeeScript,
            "es6" | "es7" | "babel" => Language::Babel,
            "javascript" => Language::Javascript,
            "bash" => Language::Bash,
            "lua" => Language::Lua,
            "perl" => Language::Perl,
            "php" => Language::Php,
            "python" => Language::Python,
            "python3" => Language::Python3,
            "ruby" => Language::Ruby,
            "scheme" => Language::Scheme,
            "smalltalk" => Language::Smalltalk,
            "tcl" => Language::Tcl,
            other => {
                return Err(SpawnMiddlewareError::Configuration(format!(
                    "unknown language tag: {other:?}"
                )));
            }
        };
        Ok(lang)
    }

    /// `node`-family languages share the default argument generator.
    pub fn is_node_family(self) -> bool {
        matches!(
            self,
            Language::Javascript | Language::Babel | Language::CoffeeScript
        )
    }
}

/// Maps a canonical language to its executor binary name.
///
/// A static table, as in the source: languages outside the table are a
/// configuration error raised at handler construction or first request.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    binaries_root: PathBuf,
}

impl LanguageRegistry {
    pub fn new(binaries_root: impl Into<PathBuf>) -> Self {
        Self {
            binaries_root: binaries_root.into(),
        }
    }

    fn binary_name(language: Language) -> &'static str {
        match language {
            Language::Javascript | Language::Babel | Language::CoffeeScript => "node",
            Language::Bash => "bash",
            Language::Lua => "lua",
            Language::Perl => "perl",
            Language::Php => "php",
            Language::Python => "python",
            Language::Python3 => "python3",
            Language::Ruby => "ruby",
            Language::Scheme => "scheme",
            Language::Smalltalk => "smalltalk",
            Language::Tcl => "tcl",
        }
    }

    /// Resolve the normalized, absolute path to the executor binary for
    /// `language`, rooted at `<root>/bin/binaries/<name>`.
    pub fn resolve_binary(&self, language: Language) -> Result<PathBuf, SpawnMiddlewareError> {
        let name = Self::binary_name(language);
        let dir = self.binaries_root.join("bin").join("binaries");
        let candidate = dir.join(name);

        which::which_in(name, Some(&dir), Path::new("/")).map_err(|e| {
            SpawnMiddlewareError::Spawn(format!(
                "executor binary {:?} not found under {:?}: {e}",
                candidate, dir
            ))
        })
    }
}
