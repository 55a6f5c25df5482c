// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{EnvoyError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = EnvoyError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let timeout = raw
            .config
            .timeout
            .as_deref()
            .map(|s| {
                parse_duration(s)
                    .map_err(|e| EnvoyError::ConfigError(format!("[config].timeout: {e}")))
            })
            .transpose()?;

        validate_max_pipe_bytes(raw.config.max_pipe_bytes)?;

        Ok(ConfigFile::new_unchecked(
            timeout,
            raw.config.max_pipe_bytes,
            raw.config.lexer.resolve(),
            raw.env,
        ))
    }
}

fn validate_max_pipe_bytes(max: usize) -> Result<()> {
    if max == 0 {
        return Err(EnvoyError::ConfigError(
            "[config].max_pipe_bytes must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let seconds_per = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            ));
        }
    };
    value
        .checked_mul(seconds_per)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::ConfigSection;
    use crate::types::{LexMode, LexerChoice};

    #[test]
    fn durations_parse_with_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration(" 3s "), Ok(Duration::from_secs(3)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    }

    #[test]
    fn durations_reject_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("5d").is_err());
    }

    #[test]
    fn huge_durations_are_rejected_not_wrapped() {
        let huge = format!("{}h", u64::MAX / 60);
        let err = parse_duration(&huge).unwrap_err();
        assert!(err.contains("too large"), "got {err}");
        assert_eq!(
            parse_duration(&format!("{}s", u64::MAX)),
            Ok(Duration::from_secs(u64::MAX))
        );
    }

    #[test]
    fn huge_timeout_is_a_config_error() {
        let raw = RawConfigFile {
            config: ConfigSection {
                timeout: Some(format!("{}m", u64::MAX)),
                ..ConfigSection::default()
            },
            ..RawConfigFile::default()
        };
        match ConfigFile::try_from(raw) {
            Err(EnvoyError::ConfigError(msg)) => assert!(msg.contains("[config].timeout")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn raw_defaults_validate() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg, ConfigFile::default());
    }

    #[test]
    fn zero_pipe_cap_is_rejected() {
        let raw = RawConfigFile {
            config: ConfigSection {
                max_pipe_bytes: 0,
                ..ConfigSection::default()
            },
            ..RawConfigFile::default()
        };
        match ConfigFile::try_from(raw) {
            Err(EnvoyError::ConfigError(msg)) => assert!(msg.contains("max_pipe_bytes")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn bad_timeout_names_the_field() {
        let raw = RawConfigFile {
            config: ConfigSection {
                timeout: Some("soon".into()),
                lexer: LexerChoice::Windows,
                ..ConfigSection::default()
            },
            ..RawConfigFile::default()
        };
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("[config].timeout"));

        let raw = RawConfigFile {
            config: ConfigSection {
                timeout: Some("5s".into()),
                lexer: LexerChoice::Windows,
                ..ConfigSection::default()
            },
            ..RawConfigFile::default()
        };
        let cfg = ConfigFile::try_from(raw).unwrap();
        assert_eq!(cfg.timeout, Some(Duration::from_secs(5)));
        assert_eq!(cfg.lexer, LexMode::Windows);
    }
}
