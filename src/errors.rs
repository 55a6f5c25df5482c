// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Only conditions the caller cannot observe through an exit code become
//! errors. A stage that exits non-zero, or is terminated after its timeout,
//! still produces a normal [`crate::exec::StageResult`].

use std::time::Duration;

use thiserror::Error;

use crate::session::Stream;

#[derive(Error, Debug)]
pub enum EnvoyError {
    /// The process could not be started (missing program, not executable,
    /// empty argument vector, ...).
    #[error("failed to launch '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("stdin of the process is closed")]
    StdinClosed,

    #[error("{0} closed before the expected pattern appeared")]
    StreamClosed(Stream),

    #[error("pattern {pattern:?} did not appear on {stream} within {timeout:?}")]
    ExpectTimeout {
        pattern: String,
        stream: Stream,
        timeout: Duration,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EnvoyError {
    pub(crate) fn launch(command: impl Into<String>, source: std::io::Error) -> Self {
        EnvoyError::Launch {
            command: command.into(),
            source,
        }
    }

    /// True for launch failures, the only error that aborts a pipeline
    /// midway.
    pub fn is_launch(&self) -> bool {
        matches!(self, EnvoyError::Launch { .. })
    }
}

pub type Result<T> = std::result::Result<T, EnvoyError>;
