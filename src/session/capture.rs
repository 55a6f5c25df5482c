// src/session/capture.rs

//! Growing capture buffers for a live process's output streams.
//!
//! One reader task per stream appends every chunk it reads; waiters are
//! woken through a `Notify` after each append and once more when the stream
//! ends. Pipeline stages use the same buffers so that output read before a
//! reader is aborted is not lost.
//!
//! Nothing is ever removed from a buffer: a session keeps everything its
//! process wrote for as long as the session lives, so a long-running and
//! chatty process grows memory without bound.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::session::Stream;

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Default)]
struct Captured {
    data: Vec<u8>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct CaptureBuffer {
    state: Mutex<Captured>,
    changed: Notify,
}

impl CaptureBuffer {
    fn lock(&self) -> MutexGuard<'_, Captured> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `chunk` to the end of the buffer. The buffer is unbounded.
    pub fn append(&self, chunk: &[u8]) {
        self.lock().data.extend_from_slice(chunk);
        self.changed.notify_waiters();
    }

    pub fn close(&self) {
        self.lock().closed = true;
        self.changed.notify_waiters();
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().data.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Suspend until `found` accepts the buffer contents.
    ///
    /// Returns `false` if the stream ended first.
    pub async fn wait_for(&self, mut found: impl FnMut(&[u8]) -> bool) -> bool {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register before checking so an append between the check and
            // the await is not missed.
            notified.as_mut().enable();

            {
                let state = self.lock();
                if found(&state.data) {
                    return true;
                }
                if state.closed {
                    return false;
                }
            }

            notified.await;
        }
    }
}

/// Spawn a task copying `reader` into `buffer` until EOF or a read error.
pub fn spawn_reader<R>(reader: R, buffer: Arc<CaptureBuffer>, stream: Stream, pid: u32) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = reader;
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    trace!(pid, %stream, bytes = n, "captured output");
                    buffer.append(&chunk[..n]);
                }
                Err(e) => {
                    debug!(pid, %stream, error = %e, "read failed; closing capture");
                    break;
                }
            }
        }
        buffer.close();
        debug!(pid, %stream, "capture reader ended");
    })
}
