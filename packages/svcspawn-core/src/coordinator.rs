//! The lifecycle coordinator: multiplexes stdout/stderr/stdin/exit/error
//! and a single timeout into exactly one response outcome per invocation.
//!
//! Modeled as one `tokio::task` draining a merged event channel (see
//! Design Notes in spec.md §9) rather than flag-soup callbacks — the
//! `Status` record below is still shaped like the source's status
//! object because the invariants are specified in terms of it, but
//! nothing here is shared across requests or needs locking.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::terminator::ProcessTreeTerminator;

/// A streamed request body: the middleware adapter converts whatever the
/// host's request type exposes into this framework-agnostic shape.
pub type BodyStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Response body sink: chunks sent here are, in order, forwarded
/// verbatim to the HTTP response body. Dropping the sender ends the
/// response, matching `axum::body::Body::from_stream` semantics.
pub type ResponseSink = mpsc::UnboundedSender<std::io::Result<Bytes>>;

/// The per-invocation status record. All fields default `false` and
/// transition `false -> true` at most once.
#[derive(Debug, Default, Clone, Copy)]
pub struct Status {
    pub ended: bool,
    pub erroring: bool,
    pub checking_registry: bool,
    pub stdout_ended: bool,
    pub service_ended: bool,
    pub vm_closed: bool,
    pub vm_error: bool,
    pub stdin_error: bool,
}

/// Capability handed to the stderr control handler. Deliberately narrow
/// (see Design Notes: "a small `Controller` capability... with a single
/// `terminate()` method", extended here to the other two actions §6
/// grants the handler).
pub trait Controller {
    fn set_header(&mut self, name: &str, value: String);
    fn log(&mut self, level: log::Level, msg: &str);
    fn set_checking_registry(&mut self, checking: bool);
    /// Force immediate completion of the invocation.
    fn terminate(&mut self);
}

/// Stderr, repurposed as a structured out-of-band channel from child to
/// coordinator. An external collaborator per spec §1; the default
/// implementation below is the supplemental "it must still compile and
/// run" fallback (see SPEC_FULL.md §4.9).
pub trait StderrControlHandler: Send + Sync {
    fn on_chunk(&self, chunk: &[u8], ctl: &mut dyn Controller);
}

/// Forwards stderr to the log facade and never terminates early.
pub struct NullStderrControlHandler;

impl StderrControlHandler for NullStderrControlHandler {
    fn on_chunk(&self, chunk: &[u8], ctl: &mut dyn Controller) {
        ctl.log(log::Level::Debug, &String::from_utf8_lossy(chunk));
    }
}

/// Final shape handed back to the middleware adapter — the equivalent of
/// the source's `next(null, "response ended")` continuation.
#[derive(Debug)]
pub struct InvocationOutcome {
    pub message: &'static str,
    pub status: Status,
    pub headers: Vec<(String, String)>,
}

enum ChildEvent {
    StdoutChunk(Bytes),
    StdoutEnd,
    StderrChunk(Bytes),
    StdinError(String),
    Exit {
        code: Option<i32>,
        signal: Option<i32>,
    },
    SpawnError(String),
}

struct CoordinatorController<'a> {
    status: &'a mut Status,
    headers: &'a mut Vec<(String, String)>,
}

impl Controller for CoordinatorController<'_> {
    fn set_header(&mut self, name: &str, value: String) {
        self.headers.push((name.to_string(), value));
    }

    fn log(&mut self, level: log::Level, msg: &str) {
        log::log!(level, "{msg}");
    }

    fn set_checking_registry(&mut self, checking: bool) {
        self.status.checking_registry = checking;
    }

    fn terminate(&mut self) {
        if !self.status.ended {
            self.status.ended = true;
            self.status.service_ended = true;
        }
    }
}

fn end_response(status: &mut Status) {
    status.service_ended = true;
}

/// Runs one invocation to completion: spawns the reader/writer/exit
/// tasks that feed a merged event channel, then drives the status state
/// machine from spec.md §4.6 until `endResponse` fires exactly once.
pub async fn run_invocation(
    mut child: Child,
    timeout: Duration,
    stderr_handler: Arc<dyn StderrControlHandler>,
    body: Option<BodyStream>,
    tx: ResponseSink,
    timeout_message: impl Fn(u64) -> String,
) -> InvocationOutcome {
    let pid = child.id();
    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel::<ChildEvent>();
    let stdout_handle = child.stdout.take();

    if let Some(mut stderr) = child.stderr.take() {
        let ev_tx = ev_tx.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 8192];
            loop {
                match stderr.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        let _ = ev_tx.send(ChildEvent::StderrChunk(Bytes::copy_from_slice(
                            &buf[..n],
                        )));
                    }
                    Err(_) => break,
                }
            }
        });
    }

    match (child.stdin.take(), body) {
        (Some(mut stdin), Some(mut body)) => {
            let ev_tx = ev_tx.clone();
            tokio::spawn(async move {
                while let Some(chunk) = body.next().await {
                    match chunk {
                        Ok(bytes) => {
                            if let Err(e) = stdin.write_all(&bytes).await {
                                let _ = ev_tx.send(ChildEvent::StdinError(e.to_string()));
                                return;
                            }
                        }
                        Err(e) => {
                            let _ = ev_tx.send(ChildEvent::StdinError(e.to_string()));
                            return;
                        }
                    }
                }
                // Dropping `stdin` here closes it, signalling EOF to the child.
            });
        }
        (Some(stdin), None) => drop(stdin),
        (None, _) => {}
    }

    // Stdout draining and `child.wait()` are joined in one task so the
    // two events they produce are always sent in a fixed relative order
    // — `Exit`/`SpawnError` before `StdoutEnd` — regardless of which the
    // OS reports first. Draining and waiting race independently on most
    // platforms (pipe EOF vs. process reaping), and the coordinator's
    // "exit never races ahead of stdout end" invariant (spec §4.6, §7)
    // depends on the exit classification having already run by the time
    // `StdoutEnd` is processed.
    tokio::spawn({
        let ev_tx = ev_tx.clone();
        async move {
            let drain_stdout = async {
                let Some(mut stdout) = stdout_handle else {
                    return;
                };
                let mut buf = [0u8; 8192];
                loop {
                    match stdout.read(&mut buf).await {
                        Ok(0) => break,
                        Ok(n) => {
                            let _ = ev_tx.send(ChildEvent::StdoutChunk(Bytes::copy_from_slice(
                                &buf[..n],
                            )));
                        }
                        Err(_) => break,
                    }
                }
            };

            let (_, wait_result) = tokio::join!(drain_stdout, child.wait());

            match wait_result {
                Ok(exit_status) => {
                    let code = exit_status.code();
                    #[cfg(unix)]
                    let signal = {
                        use std::os::unix::process::ExitStatusExt;
                        exit_status.signal()
                    };
                    #[cfg(not(unix))]
                    let signal = None;
                    let _ = ev_tx.send(ChildEvent::Exit { code, signal });
                }
                Err(e) => {
                    let _ = ev_tx.send(ChildEvent::SpawnError(e.to_string()));
                }
            }
            let _ = ev_tx.send(ChildEvent::StdoutEnd);
        }
    });
    drop(ev_tx);

    let mut status = Status::default();
    let mut headers: Vec<(String, String)> = Vec::new();
    let sleep = tokio::time::sleep(timeout);
    tokio::pin!(sleep);
    // `Sleep` stays `Ready` on every poll once it has elapsed. If the
    // arm's body no-ops (e.g. `checking_registry` is set) without this
    // flag, the still-enabled, still-ready arm would re-fire on every
    // loop iteration and spin the task hot for the rest of the
    // invocation. One real firing is all the timer ever gets.
    let mut timer_fired = false;

    loop {
        tokio::select! {
            () = &mut sleep, if !status.ended && !timer_fired => {
                timer_fired = true;
                if !status.service_ended && !status.ended && !status.checking_registry {
                    status.ended = true;
                    let msg = timeout_message(timeout.as_secs());
                    let _ = tx.send(Ok(Bytes::from(msg)));
                    if let Some(pid) = pid {
                        ProcessTreeTerminator::kill_tree(pid);
                    }
                    end_response(&mut status);
                }
            }
            maybe_ev = ev_rx.recv() => {
                let Some(ev) = maybe_ev else { break };
                match ev {
                    ChildEvent::StdoutChunk(chunk) => {
                        if !status.ended {
                            let _ = tx.send(Ok(chunk));
                        }
                    }
                    ChildEvent::StdoutEnd => {
                        status.stdout_ended = true;
                        if !status.checking_registry && !status.ended && !status.erroring {
                            status.ended = true;
                            end_response(&mut status);
                        }
                        if status.vm_closed && !status.ended {
                            status.ended = true;
                            end_response(&mut status);
                        }
                    }
                    ChildEvent::StderrChunk(chunk) => {
                        let mut ctl = CoordinatorController {
                            status: &mut status,
                            headers: &mut headers,
                        };
                        stderr_handler.on_chunk(&chunk, &mut ctl);
                    }
                    ChildEvent::StdinError(e) => {
                        status.stdin_error = true;
                        log::debug!("stdin error: {e}");
                    }
                    ChildEvent::Exit { code, signal } => {
                        status.vm_closed = true;
                        if !status.checking_registry && !status.ended && !status.stdout_ended {
                            let abnormal = signal.is_some() || code.is_some_and(|c| c != 0);
                            if abnormal {
                                status.erroring = true;
                                status.vm_error = true;
                            }
                        }
                        if status.stdout_ended && !status.ended {
                            status.ended = true;
                            end_response(&mut status);
                        }
                    }
                    ChildEvent::SpawnError(msg) => {
                        status.vm_error = true;
                        if !status.ended {
                            status.ended = true;
                            let _ = tx.send(Ok(Bytes::from(msg)));
                            end_response(&mut status);
                        }
                    }
                }
            }
        }

        if status.ended {
            break;
        }
    }

    drop(tx);
    InvocationOutcome {
        message: "response ended",
        status,
        headers,
    }
}
