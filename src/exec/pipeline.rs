// src/exec/pipeline.rs

//! Sequential pipeline execution.
//!
//! Stages are not wired together with OS pipes. Each stage runs to
//! completion, and its captured stdout (capped at `max_pipe_bytes`) becomes
//! the next stage's stdin. That keeps timeouts, truncation and per-stage
//! results uniform at the cost of streaming.

use std::fmt;
use std::io;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::{EnvoyError, Result};
use crate::exec::backend::StageBackend;
use crate::exec::env::EnvOverrides;
use crate::exec::stage::StageResult;
use crate::types::{Argv, Pipeline};

/// Default cap on data forwarded between stages: 10 MiB.
pub const DEFAULT_MAX_PIPE_BYTES: usize = 10 * 1024 * 1024;

/// Per-call knobs for [`execute`].
#[derive(Debug, Clone, Copy)]
pub struct ExecuteOptions<'a> {
    /// Data for the first stage's stdin.
    pub input: Option<&'a [u8]>,
    /// Applied to every stage independently.
    pub timeout: Option<Duration>,
    pub env: &'a EnvOverrides,
    pub max_pipe_bytes: usize,
}

/// Result of a whole pipeline: the last stage plus everything before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The terminal stage.
    pub last: StageResult,
    /// Earlier stages, oldest first. Empty for a single-stage command.
    pub history: Vec<StageResult>,
}

impl Response {
    pub fn command(&self) -> &Argv {
        &self.last.command
    }

    pub fn std_out(&self) -> String {
        self.last.std_out()
    }

    pub fn std_err(&self) -> String {
        self.last.std_err()
    }

    pub fn status_code(&self) -> Option<i32> {
        self.last.status_code
    }

    /// All stages in execution order, the terminal one included.
    pub fn stages(&self) -> impl Iterator<Item = &StageResult> {
        self.history.iter().chain(std::iter::once(&self.last))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last.command.program() {
            Some(program) => write!(f, "<Response [{program}]>"),
            None => f.write_str("<Response>"),
        }
    }
}

/// Run `pipeline` stage by stage on `backend`.
///
/// - Stage 0 reads `opts.input`; stage `i > 0` reads the first
///   `opts.max_pipe_bytes` bytes of stage `i - 1`'s stdout. Anything beyond
///   the cap is dropped silently.
/// - A stage that fails to launch aborts the pipeline with that error; no
///   partial [`Response`] is produced.
/// - Timeouts and non-zero exits do not stop the pipeline.
pub async fn execute<B>(backend: &B, pipeline: &Pipeline, opts: ExecuteOptions<'_>) -> Result<Response>
where
    B: StageBackend + ?Sized,
{
    let mut history: Vec<StageResult> = Vec::with_capacity(pipeline.len());

    for (index, argv) in pipeline.stages().iter().enumerate() {
        let input = match history.last() {
            Some(prev) => Some(truncate(&prev.std_out, opts.max_pipe_bytes)),
            None => opts.input,
        };

        debug!(
            stage = index,
            cmd = %argv,
            input_bytes = input.map_or(0, <[u8]>::len),
            "running pipeline stage"
        );

        let result = backend
            .run_stage(argv, input, opts.timeout, opts.env)
            .await
            .inspect_err(|e| {
                warn!(stage = index, cmd = %argv, error = %e, "aborting pipeline");
            })?;

        history.push(result);
    }

    let Some(last) = history.pop() else {
        return Err(EnvoyError::launch(
            "",
            io::Error::new(io::ErrorKind::InvalidInput, "pipeline has no stages"),
        ));
    };

    Ok(Response { last, history })
}

fn truncate(data: &[u8], max: usize) -> &[u8] {
    if data.len() > max {
        debug!(
            available = data.len(),
            forwarded = max,
            "truncating data forwarded to next stage"
        );
        &data[..max]
    } else {
        data
    }
}
