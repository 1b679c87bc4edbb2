use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::password::HashingParams;

const DEFAULT_DB_PATH: &str = "noter.db";
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a valid {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Runtime settings for the store. Built once by the host application and
/// passed to constructors; nothing reads the environment behind its back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `None` means a private in-memory database.
    pub db_path: Option<PathBuf>,
    /// Deadline applied to each storage call when the caller sets none.
    pub query_timeout: Duration,
    pub hashing: HashingParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: Some(PathBuf::from(DEFAULT_DB_PATH)),
            query_timeout: Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS),
            hashing: HashingParams::default(),
        }
    }
}

impl Config {
    /// Reads `NOTER_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = match lookup("NOTER_DB_PATH") {
            Some(path) if path == ":memory:" => None,
            Some(path) => Some(PathBuf::from(path)),
            None => defaults.db_path,
        };

        let timeout_ms = parse_var(&lookup, "NOTER_QUERY_TIMEOUT_MS", "integer (ms)")?
            .unwrap_or(DEFAULT_QUERY_TIMEOUT_MS);

        let hashing = HashingParams {
            memory_kib: parse_var(&lookup, "NOTER_HASH_MEMORY_KIB", "integer (KiB)")?
                .unwrap_or(defaults.hashing.memory_kib),
            iterations: parse_var(&lookup, "NOTER_HASH_ITERATIONS", "integer")?
                .unwrap_or(defaults.hashing.iterations),
            parallelism: parse_var(&lookup, "NOTER_HASH_PARALLELISM", "integer")?
                .unwrap_or(defaults.hashing.parallelism),
        };

        Ok(Self {
            db_path,
            query_timeout: Duration::from_millis(timeout_ms),
            hashing,
        })
    }

    /// In-memory database with cheap hashing, for tests.
    pub fn for_tests() -> Self {
        Self {
            db_path: None,
            query_timeout: Duration::from_secs(5),
            hashing: HashingParams::cheap(),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key,
                expected,
                value,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("NOTER_DB_PATH", ":memory:"),
            ("NOTER_QUERY_TIMEOUT_MS", "250"),
            ("NOTER_HASH_ITERATIONS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, None);
        assert_eq!(config.query_timeout, Duration::from_millis(250));
        assert_eq!(config.hashing.iterations, 3);
        assert_eq!(config.hashing.memory_kib, HashingParams::default().memory_kib);
    }

    #[test]
    fn rejects_garbage_numbers() {
        let err = Config::from_lookup(lookup_from(&[("NOTER_QUERY_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("NOTER_QUERY_TIMEOUT_MS"));
    }
}
