//! Spawn controller: resolves the executor binary and launches the
//! child with the generated argv, no shell interpolation, three piped
//! standard streams.

use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::error::SpawnMiddlewareError;

pub struct SpawnController;

impl SpawnController {
    /// Spawn `binary` with `argv`, wiring stdin/stdout/stderr as pipes.
    /// The child (and its whole process group via the terminator) is
    /// the unit the lifecycle coordinator then drives to completion.
    pub fn spawn(binary: &Path, argv: &[String]) -> Result<Child, SpawnMiddlewareError> {
        Command::new(binary)
            .args(argv)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpawnMiddlewareError::Spawn(format!("{}: {e}", binary.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let err =
            SpawnController::spawn(Path::new("/does/not/exist/binary"), &[]).unwrap_err();
        assert!(matches!(err, SpawnMiddlewareError::Spawn(_)));
    }
}
