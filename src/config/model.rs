// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::{DEFAULT_MAX_PIPE_BYTES, EnvOverrides};
use crate::types::{LexMode, LexerChoice};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// timeout = "30s"
/// max_pipe_bytes = 10485760
/// lexer = "auto"
///
/// [env]
/// LANG = "C"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Environment overrides applied to every spawned process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Default per-stage timeout, e.g. `"250ms"`, `"30s"`, `"2m"`.
    ///
    /// Absent means stages may run forever.
    #[serde(default)]
    pub timeout: Option<String>,

    /// Cap on stdout bytes forwarded from one stage to the next.
    #[serde(default = "default_max_pipe_bytes")]
    pub max_pipe_bytes: usize,

    #[serde(default)]
    pub lexer: LexerChoice,
}

fn default_max_pipe_bytes() -> usize {
    DEFAULT_MAX_PIPE_BYTES
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            timeout: None,
            max_pipe_bytes: default_max_pipe_bytes(),
            lexer: LexerChoice::default(),
        }
    }
}

/// Validated configuration, ready to build an [`crate::Envoy`].
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// `Default`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub timeout: Option<Duration>,
    pub max_pipe_bytes: usize,
    pub lexer: LexMode,
    pub env: EnvOverrides,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        timeout: Option<Duration>,
        max_pipe_bytes: usize,
        lexer: LexMode,
        env: EnvOverrides,
    ) -> Self {
        Self {
            timeout,
            max_pipe_bytes,
            lexer,
            env,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(None, DEFAULT_MAX_PIPE_BYTES, LexMode::host(), EnvOverrides::new())
    }
}
