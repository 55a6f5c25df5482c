// src/exec/backend.rs

//! Pluggable stage execution.
//!
//! The pipeline orchestrator talks to a `StageBackend` instead of spawning
//! processes directly. Production code uses [`RealStageBackend`]; tests can
//! supply a backend that records invocations and returns canned results
//! without touching the OS.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::errors::Result;
use crate::exec::env::EnvOverrides;
use crate::exec::stage::{StageResult, run_stage};
use crate::types::Argv;

/// Boxed future returned by [`StageBackend::run_stage`].
pub type StageFuture<'a> = Pin<Box<dyn Future<Output = Result<StageResult>> + Send + 'a>>;

/// Runs a single pipeline stage to completion.
pub trait StageBackend: Send + Sync {
    /// Execute `argv` with `input` on stdin.
    ///
    /// Must return `Err` only when the stage could not be launched; every
    /// other outcome is a [`StageResult`].
    fn run_stage<'a>(
        &'a self,
        argv: &'a Argv,
        input: Option<&'a [u8]>,
        timeout: Option<Duration>,
        env: &'a EnvOverrides,
    ) -> StageFuture<'a>;
}

/// Backend that spawns real OS processes via [`run_stage`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RealStageBackend;

impl StageBackend for RealStageBackend {
    fn run_stage<'a>(
        &'a self,
        argv: &'a Argv,
        input: Option<&'a [u8]>,
        timeout: Option<Duration>,
        env: &'a EnvOverrides,
    ) -> StageFuture<'a> {
        Box::pin(run_stage(argv, input, timeout, env))
    }
}
