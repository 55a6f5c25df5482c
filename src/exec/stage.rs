// src/exec/stage.rs

//! Run one argument vector as one OS process.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{EnvoyError, Result};
use crate::exec::env::{EnvOverrides, merged_environment};
use crate::session::Stream;
use crate::session::capture::{CaptureBuffer, spawn_reader};
use crate::types::Argv;

/// How long a timed-out stage's output may keep flowing after the process
/// itself has been reaped.
pub const TIMEOUT_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Outcome of a single stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageResult {
    /// The argument vector that was executed.
    pub command: Argv,
    pub std_out: Vec<u8>,
    pub std_err: Vec<u8>,
    /// Exit status; `None` only for a process that has not finished.
    ///
    /// A process killed by a signal reports `-signal` on unix.
    pub status_code: Option<i32>,
    pub pid: Option<u32>,
    /// The stage hit its timeout and was asked to terminate.
    pub timed_out: bool,
    pub duration: Duration,
}

impl StageResult {
    /// Captured stdout as text, with `\r\n` translated to `\n`.
    pub fn std_out(&self) -> String {
        to_text(&self.std_out)
    }

    /// Captured stderr as text, with `\r\n` translated to `\n`.
    pub fn std_err(&self) -> String {
        to_text(&self.std_err)
    }

    pub fn is_success(&self) -> bool {
        !self.timed_out && self.status_code == Some(0)
    }
}

pub(crate) fn to_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace("\r\n", "\n")
}

/// Spawn `argv`, feed it `input`, and collect its output.
///
/// - stdin, stdout and stderr are piped; the input write and both reads run
///   concurrently on their own Tokio tasks so neither side can block the
///   other on a full pipe buffer.
/// - With a `timeout`, the process is sent a graceful termination request
///   once it elapses, and we then wait for it to actually exit. Output is
///   then drained for at most [`TIMEOUT_DRAIN_GRACE`], so a descendant that
///   inherited the pipes cannot hold the call open.
///
/// Only a failure to start the process is an error. A timed-out stage comes
/// back as a normal [`StageResult`] carrying the termination exit code.
pub async fn run_stage(
    argv: &Argv,
    input: Option<&[u8]>,
    timeout: Option<Duration>,
    env: &EnvOverrides,
) -> Result<StageResult> {
    let Some(program) = argv.program() else {
        return Err(EnvoyError::launch(
            "",
            io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector"),
        ));
    };

    let mut cmd = Command::new(program);
    cmd.args(argv.args())
        .env_clear()
        .envs(merged_environment(env))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let started = Instant::now();
    let mut child = cmd
        .spawn()
        .map_err(|e| EnvoyError::launch(argv.to_string(), e))?;
    let pid = child.id();

    info!(cmd = %argv, ?pid, ?timeout, "starting stage process");

    let std_out = Arc::new(CaptureBuffer::default());
    let std_err = Arc::new(CaptureBuffer::default());
    let reader_pid = pid.unwrap_or_default();
    let mut readers = Vec::with_capacity(2);
    if let Some(out) = child.stdout.take() {
        readers.push(spawn_reader(out, Arc::clone(&std_out), Stream::Stdout, reader_pid));
    }
    if let Some(err) = child.stderr.take() {
        readers.push(spawn_reader(err, Arc::clone(&std_err), Stream::Stderr, reader_pid));
    }
    let writer = tokio::spawn(feed_stdin(child.stdin.take(), input.map(<[u8]>::to_vec)));

    let (status, timed_out) = wait_with_timeout(&mut child, timeout, argv).await?;

    // After a timeout, descendants may still hold the pipes open.
    let grace = timed_out.then_some(TIMEOUT_DRAIN_GRACE);
    if !drain(readers, grace).await {
        warn!(cmd = %argv, ?pid, "output pipes still open after timeout; keeping partial output");
    }

    // Nobody is left to read stdin once the process is gone and its output
    // has ended.
    writer.abort();
    match writer.await {
        Ok(written) => written?,
        Err(e) if e.is_cancelled() => debug!(cmd = %argv, "abandoned unread stdin input"),
        Err(e) => return Err(anyhow!("stdin task for '{argv}' failed: {e}").into()),
    }

    let std_out = std_out.snapshot();
    let std_err = std_err.snapshot();
    let code = exit_code(status);
    info!(
        cmd = %argv,
        ?pid,
        exit_code = code,
        timed_out,
        stdout_bytes = std_out.len(),
        stderr_bytes = std_err.len(),
        "stage process exited"
    );

    Ok(StageResult {
        command: argv.clone(),
        std_out,
        std_err,
        status_code: Some(code),
        pid,
        timed_out,
        duration: started.elapsed(),
    })
}

/// Write `input` to stdin, then close it.
async fn feed_stdin(stdin: Option<ChildStdin>, input: Option<Vec<u8>>) -> io::Result<()> {
    let (Some(mut stdin), Some(data)) = (stdin, input) else {
        return Ok(());
    };
    match stdin.write_all(&data).await {
        // The process exited or closed stdin without reading everything.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!(bytes = data.len(), "stdin closed early; dropping remaining input");
            Ok(())
        }
        other => other,
    }
}

/// Wait for the output readers to reach EOF, for at most `grace` if given.
///
/// Readers still running at the deadline are aborted; whatever they already
/// captured is kept. Returns `false` if any had to be aborted.
async fn drain(readers: Vec<JoinHandle<()>>, grace: Option<Duration>) -> bool {
    let deadline = grace.map(|g| tokio::time::Instant::now() + g);
    let mut complete = true;
    for mut reader in readers {
        let finished = match deadline {
            Some(at) => tokio::time::timeout_at(at, &mut reader).await.is_ok(),
            None => {
                let _ = (&mut reader).await;
                true
            }
        };
        if !finished {
            reader.abort();
            complete = false;
        }
    }
    complete
}

/// Wait for `child`, terminating it if `timeout` elapses first.
///
/// Returns the exit status and whether the timeout fired.
async fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
    argv: &Argv,
) -> Result<(ExitStatus, bool)> {
    let Some(limit) = timeout else {
        return Ok((child.wait().await?, false));
    };

    let waited = tokio::time::timeout(limit, child.wait()).await;
    match waited {
        Ok(status) => Ok((status?, false)),
        Err(_) => {
            warn!(cmd = %argv, ?limit, "stage timed out; terminating process");
            if let Err(e) = terminate(child) {
                warn!(cmd = %argv, error = %e, "failed to signal timed-out process");
            }
            // Unbounded: the process must be gone before we return.
            let status = child.wait().await?;
            Ok((status, true))
        }
    }
}

/// Ask the process to exit (`SIGTERM`).
#[cfg(unix)]
pub(crate) fn terminate(child: &mut Child) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(io::Error::from),
        // Already reaped.
        None => Ok(()),
    }
}

/// Windows has no graceful equivalent for an arbitrary console process.
#[cfg(not(unix))]
pub(crate) fn terminate(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

/// Numeric exit status, passing signal terminations through as `-signal`.
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| terminating_signal(status).map(|sig| -sig))
        .unwrap_or(-1)
}

#[cfg(unix)]
fn terminating_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn terminating_signal(_status: ExitStatus) -> Option<i32> {
    None
}
