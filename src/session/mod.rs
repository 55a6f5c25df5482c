// src/session/mod.rs

//! Interactive, manually controlled processes.
//!
//! A [`Session`] owns exactly one child process. Unlike a pipeline stage it
//! never runs to completion on its own and has no timeout: the caller sends
//! input, waits for output patterns, and decides when to [`Session::block`]
//! or [`Session::kill`]. Dropping the session kills the process.

pub mod capture;

use std::fmt;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{EnvoyError, Result};
use crate::exec::env::{EnvOverrides, merged_environment};
use crate::exec::stage::{exit_code, to_text};
use crate::session::capture::{CaptureBuffer, spawn_reader};
use crate::types::Argv;

/// One of a process's output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// A live process under manual control.
#[derive(Debug)]
pub struct Session {
    command: Argv,
    child: Child,
    pid: u32,
    /// Queue feeding the stdin writer task; `None` once stdin is closed.
    stdin: Option<mpsc::UnboundedSender<StdinWrite>>,
    writer: JoinHandle<()>,
    std_out: Arc<CaptureBuffer>,
    std_err: Arc<CaptureBuffer>,
    readers: Vec<JoinHandle<()>>,
    /// Set once, by `block()`.
    status_code: Option<i32>,
    killed: bool,
}

/// One queued write, optionally acknowledged once flushed.
#[derive(Debug)]
struct StdinWrite {
    data: Vec<u8>,
    done: Option<oneshot::Sender<io::Result<()>>>,
}

/// Spawn `argv` and return immediately.
///
/// `input`, if any, is queued for the stdin writer task and never waited on;
/// a process that does not read it is not an error. Stdin stays open for
/// [`Session::send_line`].
pub async fn connect(argv: &Argv, input: Option<&[u8]>, env: &EnvOverrides) -> Result<Session> {
    let Some(program) = argv.program() else {
        return Err(EnvoyError::launch(
            "",
            io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector"),
        ));
    };

    let mut child = Command::new(program)
        .args(argv.args())
        .env_clear()
        .envs(merged_environment(env))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| EnvoyError::launch(argv.to_string(), e))?;

    let pid = child
        .id()
        .ok_or_else(|| anyhow!("process for '{argv}' has no pid right after spawn"))?;

    info!(cmd = %argv, pid, "spawned interactive session");

    let std_out = Arc::new(CaptureBuffer::default());
    let std_err = Arc::new(CaptureBuffer::default());
    let mut readers = Vec::with_capacity(2);
    if let Some(out) = child.stdout.take() {
        readers.push(spawn_reader(out, Arc::clone(&std_out), Stream::Stdout, pid));
    }
    if let Some(err) = child.stderr.take() {
        readers.push(spawn_reader(err, Arc::clone(&std_err), Stream::Stderr, pid));
    }

    let (stdin, queue) = mpsc::unbounded_channel();
    let writer = spawn_writer(child.stdin.take(), queue, pid);

    if let Some(data) = input {
        // The receiver is alive until `stdin` is dropped.
        let _ = stdin.send(StdinWrite {
            data: data.to_vec(),
            done: None,
        });
    }

    Ok(Session {
        command: argv.clone(),
        child,
        pid,
        stdin: Some(stdin),
        writer,
        std_out,
        std_err,
        readers,
        status_code: None,
        killed: false,
    })
}

/// Spawn the task that owns the child's stdin and performs queued writes in
/// order. It ends, closing stdin, when the queue is closed or a write fails.
fn spawn_writer(
    stdin: Option<ChildStdin>,
    mut queue: mpsc::UnboundedReceiver<StdinWrite>,
    pid: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(mut stdin) = stdin else {
            return;
        };
        while let Some(StdinWrite { data, done }) = queue.recv().await {
            let written = match stdin.write_all(&data).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            };
            let failed = written.is_err();
            match done {
                Some(done) => {
                    let _ = done.send(written);
                }
                None => match written {
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                        debug!(pid, bytes = data.len(), "stdin closed early; dropping initial input");
                    }
                    Err(e) => warn!(pid, error = %e, "failed to write initial input"),
                    Ok(()) => {}
                },
            }
            if failed {
                break;
            }
        }
        debug!(pid, "stdin writer ended");
    })
}

impl Session {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn command(&self) -> &Argv {
        &self.command
    }

    /// Exit status recorded by [`Session::block`].
    ///
    /// This never polls the process: it stays `None` after the process has
    /// exited until `block()` is called.
    pub fn status(&self) -> Option<i32> {
        self.status_code
    }

    /// Forcibly terminate the process.
    ///
    /// Idempotent: killing an already killed or already collected process
    /// succeeds.
    pub fn kill(&mut self) -> Result<()> {
        if self.killed || self.status_code.is_some() {
            return Ok(());
        }
        match self.child.start_kill() {
            Ok(()) => {}
            // Already reaped by tokio.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e.into()),
        }
        self.killed = true;
        self.stdin = None;
        info!(cmd = %self.command, pid = self.pid, "killed interactive session");
        Ok(())
    }

    /// Wait for the process to exit and record its status.
    ///
    /// Later calls return the recorded status without waiting again.
    pub async fn block(&mut self) -> Result<i32> {
        if let Some(code) = self.status_code {
            return Ok(code);
        }
        let status = self.child.wait().await?;
        let code = exit_code(status);
        self.status_code = Some(code);
        debug!(cmd = %self.command, pid = self.pid, exit_code = code, "session process exited");
        Ok(code)
    }

    /// Write `line` followed by `\n` to stdin and flush.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.write_stdin(data).await
    }

    /// Close stdin so the process sees end of input once queued writes are
    /// done.
    pub fn close_stdin(&mut self) {
        if self.stdin.take().is_some() {
            debug!(pid = self.pid, "closed session stdin");
        }
    }

    /// Queue `data` behind any earlier writes and wait until it is flushed.
    async fn write_stdin(&mut self, data: Vec<u8>) -> Result<()> {
        let stdin = self.stdin.as_ref().ok_or(EnvoyError::StdinClosed)?;
        let (done, flushed) = oneshot::channel();
        if stdin.send(StdinWrite { data, done: Some(done) }).is_err() {
            self.stdin = None;
            return Err(EnvoyError::StdinClosed);
        }
        match flushed.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.kind() != io::ErrorKind::BrokenPipe => Err(e.into()),
            // Broken pipe, or the writer already gave up on an earlier write.
            _ => {
                debug!(pid = self.pid, "stdin pipe is broken; process stopped reading");
                self.stdin = None;
                Err(EnvoyError::StdinClosed)
            }
        }
    }

    /// Wait until `pattern` appears in `stream`.
    ///
    /// The whole capture is searched, so output that arrived before the call
    /// also counts. Fails with [`EnvoyError::StreamClosed`] if the stream
    /// ends without a match, or [`EnvoyError::ExpectTimeout`].
    pub async fn expect(
        &self,
        pattern: impl AsRef<[u8]>,
        stream: Stream,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let pattern = pattern.as_ref();
        let label = String::from_utf8_lossy(pattern).into_owned();
        self.wait_on(stream, timeout, label, |data| contains(data, pattern))
            .await
    }

    /// Like [`Session::expect`], matching `regex` against the text view of
    /// the stream. Returns the first match.
    pub async fn expect_match(
        &self,
        regex: &Regex,
        stream: Stream,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let mut matched = None;
        self.wait_on(stream, timeout, regex.as_str().to_string(), |data| {
            let text = String::from_utf8_lossy(data);
            matched = regex.find(&text).map(|m| m.as_str().to_string());
            matched.is_some()
        })
        .await?;
        Ok(matched.unwrap_or_default())
    }

    async fn wait_on(
        &self,
        stream: Stream,
        timeout: Option<Duration>,
        pattern: String,
        found: impl FnMut(&[u8]) -> bool,
    ) -> Result<()> {
        let wait = self.capture(stream).wait_for(found);
        let found = match timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                EnvoyError::ExpectTimeout {
                    pattern,
                    stream,
                    timeout: limit,
                }
            })?,
            None => wait.await,
        };
        if found {
            Ok(())
        } else {
            Err(EnvoyError::StreamClosed(stream))
        }
    }

    fn capture(&self, stream: Stream) -> &CaptureBuffer {
        match stream {
            Stream::Stdout => &self.std_out,
            Stream::Stderr => &self.std_err,
        }
    }

    /// Everything captured on stdout so far, as text.
    pub fn std_out(&self) -> String {
        to_text(&self.std_out.snapshot())
    }

    /// Everything captured on stderr so far, as text.
    pub fn std_err(&self) -> String {
        to_text(&self.std_err.snapshot())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.kill() {
            warn!(pid = self.pid, error = %e, "failed to kill session on drop");
        }
        self.writer.abort();
        for reader in &self.readers {
            reader.abort();
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_finds_subslices() {
        assert!(contains(b"hello world", b"o w"));
        assert!(contains(b"abc", b""));
        assert!(!contains(b"ab", b"abc"));
    }

    #[test]
    fn stream_names() {
        assert_eq!(Stream::Stdout.to_string(), "stdout");
        assert_eq!(Stream::Stderr.to_string(), "stderr");
    }
}
