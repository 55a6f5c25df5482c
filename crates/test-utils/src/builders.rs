#![allow(dead_code)]

use std::collections::BTreeMap;

use envoy::config::{ConfigFile, ConfigSection, RawConfigFile};
use envoy::types::LexerChoice;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Goes through `RawConfigFile` and validation, exactly like a file on disk.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                env: BTreeMap::new(),
            },
        }
    }

    pub fn timeout(mut self, duration: &str) -> Self {
        self.config.config.timeout = Some(duration.to_string());
        self
    }

    pub fn max_pipe_bytes(mut self, max: usize) -> Self {
        self.config.config.max_pipe_bytes = max;
        self
    }

    pub fn lexer(mut self, lexer: LexerChoice) -> Self {
        self.config.config.lexer = lexer;
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
