//! Process-tree termination: SIGKILL the child and every descendant,
//! because some language executors fork further processes of their own.

use sysinfo::{Pid, System};

/// Kills `root_pid` and every process transitively parented by it.
///
/// Errors from individual kill syscalls are logged, not propagated —
/// the terminator's job is to issue SIGKILL as widely as possible, not
/// to guarantee every descendant is reachable (a descendant may have
/// already exited and been reaped).
pub struct ProcessTreeTerminator;

impl ProcessTreeTerminator {
    /// Enumerate the live process table and kill `root_pid` plus every
    /// descendant, deepest-first is not required since SIGKILL doesn't
    /// need ordering, but we still kill children before parents so a
    /// reparented orphan is never missed mid-walk.
    pub fn kill_tree(root_pid: u32) {
        let mut system = System::new_all();
        system.refresh_all();

        let root = Pid::from_u32(root_pid);
        let mut to_kill = vec![root];
        let mut frontier = vec![root];

        while let Some(parent) = frontier.pop() {
            for (pid, process) in system.processes() {
                if process.parent() == Some(parent) && !to_kill.contains(pid) {
                    to_kill.push(*pid);
                    frontier.push(*pid);
                }
            }
        }

        for pid in to_kill {
            kill_pid(pid);
        }
    }
}

#[cfg(unix)]
fn kill_pid(pid: Pid) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid as NixPid;

    let raw = pid.as_u32();
    match signal::kill(NixPid::from_raw(raw as i32), Signal::SIGKILL) {
        Ok(()) => log::debug!("sent SIGKILL to pid {raw}"),
        Err(nix::errno::Errno::ESRCH) => {
            // Already exited; not an error for tree-kill purposes.
        }
        Err(e) => log::warn!("failed to SIGKILL pid {raw}: {e}"),
    }
}

#[cfg(not(unix))]
fn kill_pid(pid: Pid) {
    let mut system = System::new_all();
    system.refresh_all();
    if let Some(process) = system.process(pid) {
        if !process.kill() {
            log::warn!("failed to kill pid {}", pid.as_u32());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_tree_on_nonexistent_pid_does_not_panic() {
        // Extremely unlikely to be a live pid; terminator must tolerate
        // ESRCH/"no such process" gracefully.
        ProcessTreeTerminator::kill_tree(u32::MAX - 1);
    }
}
