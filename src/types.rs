// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// One process invocation: program name followed by its arguments.
///
/// Produced by the tokenizer (or built from a caller-supplied list) and never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Argv(Vec<String>);

impl Argv {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Argv(words.into_iter().map(Into::into).collect())
    }

    /// The program to execute, if any.
    pub fn program(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or(&[])
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Argv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl From<Vec<String>> for Argv {
    fn from(words: Vec<String>) -> Self {
        Argv(words)
    }
}

impl From<&[&str]> for Argv {
    fn from(words: &[&str]) -> Self {
        Argv::new(words.iter().copied())
    }
}

impl<'a> IntoIterator for &'a Argv {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Ordered chain of stages, connected stdout -> stdin from left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Argv>,
}

impl Pipeline {
    pub fn new(stages: Vec<Argv>) -> Self {
        Self { stages }
    }

    pub fn single(argv: Argv) -> Self {
        Self { stages: vec![argv] }
    }

    pub fn stages(&self) -> &[Argv] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn into_stages(self) -> Vec<Argv> {
        self.stages
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}

/// What a caller hands to `run` / `connect`.
///
/// - `Text` is tokenized, so it may contain `|` to request a pipeline.
/// - `Argv` is taken verbatim as a single stage; a `"|"` element is just an
///   argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    Text(String),
    Argv(Argv),
}

impl From<&str> for CommandLine {
    fn from(s: &str) -> Self {
        CommandLine::Text(s.to_string())
    }
}

impl From<String> for CommandLine {
    fn from(s: String) -> Self {
        CommandLine::Text(s)
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(words: Vec<String>) -> Self {
        CommandLine::Argv(Argv::from(words))
    }
}

impl From<&[&str]> for CommandLine {
    fn from(words: &[&str]) -> Self {
        CommandLine::Argv(Argv::from(words))
    }
}

impl<const N: usize> From<[&str; N]> for CommandLine {
    fn from(words: [&str; N]) -> Self {
        CommandLine::Argv(Argv::new(words))
    }
}

impl From<Argv> for CommandLine {
    fn from(argv: Argv) -> Self {
        CommandLine::Argv(argv)
    }
}

/// Word-splitting rules used by the tokenizer.
///
/// - `Posix`: quotes group and are stripped, backslash escapes.
/// - `Windows`: quotes are kept, backslashes are literal path separators,
///   and an odd number of `"` in a word glues following words onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LexMode {
    Posix,
    Windows,
}

impl LexMode {
    /// The mode matching the platform this binary was built for.
    pub fn host() -> Self {
        if cfg!(windows) {
            LexMode::Windows
        } else {
            LexMode::Posix
        }
    }
}

impl Default for LexMode {
    fn default() -> Self {
        LexMode::host()
    }
}

/// Lexer selection as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LexerChoice {
    /// Follow the host platform.
    Auto,
    Posix,
    Windows,
}

impl LexerChoice {
    pub fn resolve(self) -> LexMode {
        match self {
            LexerChoice::Auto => LexMode::host(),
            LexerChoice::Posix => LexMode::Posix,
            LexerChoice::Windows => LexMode::Windows,
        }
    }
}

impl Default for LexerChoice {
    fn default() -> Self {
        LexerChoice::Auto
    }
}

impl FromStr for LexerChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(LexerChoice::Auto),
            "posix" => Ok(LexerChoice::Posix),
            "windows" => Ok(LexerChoice::Windows),
            other => Err(format!(
                "invalid lexer: {other} (expected \"auto\", \"posix\" or \"windows\")"
            )),
        }
    }
}

/// Log verbosity accepted by [`crate::logging::init_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("invalid log level: {other}")),
        }
    }
}
