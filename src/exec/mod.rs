// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`stage`] runs one argument vector as one process, with input, timeout
//!   and environment overrides.
//! - [`pipeline`] chains stages, forwarding capped stdout to the next stdin
//!   and collecting the per-stage history.
//! - [`backend`] provides the `StageBackend` trait and the process-spawning
//!   `RealStageBackend`; tests can replace it with a fake implementation.
//! - [`env`] builds the environment snapshot given to each process.

pub mod backend;
pub mod env;
pub mod pipeline;
pub mod stage;

pub use backend::{RealStageBackend, StageBackend, StageFuture};
pub use env::EnvOverrides;
pub use pipeline::{DEFAULT_MAX_PIPE_BYTES, ExecuteOptions, Response, execute};
pub use stage::{StageResult, run_stage};
