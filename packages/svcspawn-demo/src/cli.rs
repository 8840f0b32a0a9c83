use clap::Parser;

/// Runs one polyglot service behind an HTTP endpoint, spawning a fresh
/// executor child per request. Mirrors the construction-time/per-request
/// split from `spec.md` §3: everything here is fixed once at startup.
#[derive(Parser, Debug)]
#[command(version, about = "svcspawn demo host")]
pub struct Args {
    /// Address to bind the HTTP listener to.
    #[arg(long, default_value = "127.0.0.1:8088")]
    pub addr: String,

    /// Canonical language tag (or legacy alias) for the fixed service.
    #[arg(long, default_value = "javascript")]
    pub language: String,

    /// Inline source code for the service. Mutually exclusive with
    /// `--code-file`.
    #[arg(long, conflicts_with = "code_file")]
    pub code: Option<String>,

    /// Path to a file containing the service's source code.
    #[arg(long, conflicts_with = "code")]
    pub code_file: Option<String>,

    /// Root directory under which `bin/binaries/<name>` executors live.
    #[arg(long, default_value = ".")]
    pub binaries_root: String,

    /// Default per-request timeout in milliseconds
    /// (`SERVICE_MAX_TIMEOUT`).
    #[arg(long, default_value_t = 5_000)]
    pub service_max_timeout_ms: u64,

    /// Marks the service as a hookio service; requests may then carry an
    /// `x-hook-access-key` header forwarded into `__env`.
    #[arg(long)]
    pub is_hookio: bool,
}
