// src/exec/env.rs

//! Environment handed to spawned processes.

use std::collections::BTreeMap;
use std::ffi::OsString;

/// Caller-supplied variables layered over the ambient environment.
pub type EnvOverrides = BTreeMap<String, String>;

/// Snapshot the current process environment and overlay `overrides`.
///
/// Always builds a fresh map; the ambient environment is never modified. On
/// a key collision the override wins.
pub fn merged_environment(overrides: &EnvOverrides) -> BTreeMap<OsString, OsString> {
    let mut env: BTreeMap<OsString, OsString> = std::env::vars_os().collect();
    for (key, value) in overrides {
        env.insert(OsString::from(key), OsString::from(value));
    }
    env
}

/// Merge two override layers; keys in `top` win.
pub fn layered(base: &EnvOverrides, top: &EnvOverrides) -> EnvOverrides {
    let mut merged = base.clone();
    merged.extend(top.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_and_ambient_is_kept() {
        let ambient_key = std::env::vars_os()
            .map(|(k, _)| k)
            .next()
            .expect("test process has at least one env var");

        let mut overrides = EnvOverrides::new();
        overrides.insert("ENVOY_TEST_ONLY_KEY".into(), "1".into());
        overrides.insert(ambient_key.to_string_lossy().into_owned(), "replaced".into());

        let env = merged_environment(&overrides);
        assert_eq!(env.get(&OsString::from("ENVOY_TEST_ONLY_KEY")), Some(&OsString::from("1")));
        assert_eq!(env.get(&ambient_key), Some(&OsString::from("replaced")));
        assert!(std::env::var_os("ENVOY_TEST_ONLY_KEY").is_none());
    }

    #[test]
    fn layered_prefers_top() {
        let base = EnvOverrides::from([("A".into(), "1".into()), ("B".into(), "1".into())]);
        let top = EnvOverrides::from([("B".into(), "2".into())]);
        let merged = layered(&base, &top);
        assert_eq!(merged["A"], "1");
        assert_eq!(merged["B"], "2");
    }
}
