// src/lib.rs

//! Run OS commands, and simple `a | b | c` pipelines, from Rust.
//!
//! ```no_run
//! # async fn demo() -> envoy::errors::Result<()> {
//! use std::time::Duration;
//! use envoy::RunOptions;
//!
//! let r = envoy::run(
//!     "git log --oneline | head -n 3",
//!     RunOptions::new().timeout(Duration::from_secs(5)),
//! )
//! .await?;
//! println!("{} -> {:?}", r, r.status_code());
//! for stage in &r.history {
//!     println!("  earlier: {} ({:?})", stage.command, stage.status_code);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Stages run one after another; each one's stdout (capped at 10 MiB by
//! default) becomes the next one's stdin. This is not a shell: there is no
//! redirection, expansion, globbing or job control.

pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod runner;
pub mod session;
pub mod tokenize;
pub mod types;

pub use errors::{EnvoyError, Result};
pub use exec::{Response, StageResult};
pub use runner::{ConnectOptions, Envoy, RunOptions};
pub use session::{Session, Stream};
pub use types::{Argv, CommandLine, LexMode, Pipeline};

/// Run `command` with default settings.
///
/// See [`Envoy::run`].
pub async fn run(command: impl Into<CommandLine>, opts: RunOptions) -> Result<Response> {
    Envoy::new().run(command, opts).await
}

/// Spawn `command` as an interactive [`Session`] with default settings.
///
/// See [`Envoy::connect`].
pub async fn connect(command: impl Into<CommandLine>, opts: ConnectOptions) -> Result<Session> {
    Envoy::new().connect(command, opts).await
}

/// Parse `command` with the host platform's lexer rules.
pub fn expand_args(command: &str) -> Pipeline {
    tokenize::tokenize(command, LexMode::host())
}
