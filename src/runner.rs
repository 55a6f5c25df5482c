// src/runner.rs

//! High-level entry point tying tokenizer, executor and sessions together.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::loader::{config_path_from_env, load_and_validate};
use crate::config::ConfigFile;
use crate::errors::Result;
use crate::exec::env::layered;
use crate::exec::{EnvOverrides, ExecuteOptions, RealStageBackend, Response, StageBackend, execute};
use crate::session::{self, Session};
use crate::tokenize;
use crate::types::{CommandLine, LexMode, Pipeline};

/// Per-call options for [`Envoy::run`].
///
/// Anything left unset falls back to the [`ConfigFile`] the runner was built
/// with; `env` entries are layered over the configured ones.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Written to the first stage's stdin.
    pub data: Option<Vec<u8>>,
    /// Per-stage timeout.
    pub timeout: Option<Duration>,
    pub env: EnvOverrides,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Per-call options for [`Envoy::connect`].
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Written to stdin right after spawning.
    pub data: Option<Vec<u8>>,
    pub env: EnvOverrides,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Command runner with fixed settings.
///
/// Cheap to construct; holds no processes itself.
#[derive(Debug, Clone)]
pub struct Envoy<B = RealStageBackend> {
    config: ConfigFile,
    backend: B,
}

impl Envoy {
    /// Runner with default settings: host lexer, no timeout, 10 MiB pipe cap.
    pub fn new() -> Self {
        Self::from_config(ConfigFile::default())
    }

    pub fn from_config(config: ConfigFile) -> Self {
        Self::with_backend(config, RealStageBackend)
    }

    /// Runner configured from the file named by `ENVOY_CONFIG`, or defaults
    /// when it is unset.
    pub fn discover() -> Result<Self> {
        match config_path_from_env() {
            Some(path) => {
                debug!(path = %path.display(), "loading envoy config");
                Ok(Self::from_config(load_and_validate(path)?))
            }
            None => Ok(Self::new()),
        }
    }
}

impl Default for Envoy {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: StageBackend> Envoy<B> {
    pub fn with_backend(config: ConfigFile, backend: B) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn lex_mode(&self) -> LexMode {
        self.config.lexer
    }

    /// Parse `command` into the pipeline [`Envoy::run`] would execute.
    pub fn expand(&self, command: impl Into<CommandLine>) -> Pipeline {
        tokenize::expand(&command.into(), self.config.lexer)
    }

    /// Run `command` to completion, stage by stage.
    ///
    /// Returns the last stage's result with earlier stages in `history`.
    /// Fails only if a stage cannot be launched.
    pub async fn run(&self, command: impl Into<CommandLine>, opts: RunOptions) -> Result<Response> {
        let pipeline = self.expand(command);
        let env = layered(&self.config.env, &opts.env);
        let timeout = opts.timeout.or(self.config.timeout);

        debug!(%pipeline, ?timeout, stages = pipeline.len(), "running command");

        execute(
            &self.backend,
            &pipeline,
            ExecuteOptions {
                input: opts.data.as_deref(),
                timeout,
                env: &env,
                max_pipe_bytes: self.config.max_pipe_bytes,
            },
        )
        .await
    }

    /// Spawn `command` as a [`Session`] without waiting for it.
    ///
    /// Sessions are single-process: if `command` is a pipeline only its last
    /// stage is started.
    pub async fn connect(&self, command: impl Into<CommandLine>, opts: ConnectOptions) -> Result<Session> {
        let mut stages = self.expand(command).into_stages();
        if stages.len() > 1 {
            warn!(
                stages = stages.len(),
                "connect does not support pipelines; starting only the last stage"
            );
        }
        let argv = stages.pop().unwrap_or_default();
        let env = layered(&self.config.env, &opts.env);

        session::connect(&argv, opts.data.as_deref(), &env).await
    }
}
