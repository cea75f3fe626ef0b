//! Runtime configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `MEDSHARE_DB_PATH` | `medshare.db` (`:memory:` keeps everything in process) |
//! | `MEDSHARE_LOG_MODE` | `stderr` (`file` writes to `MEDSHARE_LOG_FILE`) |
//! | `MEDSHARE_LOG_FILE` | `medshare.log` |
//! | `MEDSHARE_SANITIZE_MAX_BYTES` | 16384 |
//!
//! Log filtering itself follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use crate::adapters::sanitize::DEFAULT_SANITIZE_MAX_BYTES;

pub const MEMORY_DB: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    Sqlite(PathBuf),
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stderr,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub storage: StorageTarget,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub sanitize_max_bytes: usize,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unknown or malformed values fall
    /// back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = match lookup("MEDSHARE_DB_PATH").filter(|v| !v.trim().is_empty()) {
            Some(path) if path == MEMORY_DB => StorageTarget::Memory,
            Some(path) => StorageTarget::Sqlite(PathBuf::from(path)),
            None => StorageTarget::Sqlite(PathBuf::from("medshare.db")),
        };

        let log_mode = match lookup("MEDSHARE_LOG_MODE").as_deref() {
            Some("file") => LogMode::File,
            _ => LogMode::Stderr,
        };

        let log_file = lookup("MEDSHARE_LOG_FILE")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from("medshare.log"), PathBuf::from);

        let sanitize_max_bytes = lookup("MEDSHARE_SANITIZE_MAX_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES);

        Self {
            storage,
            log_mode,
            log_file,
            sanitize_max_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.storage, StorageTarget::Sqlite(PathBuf::from("medshare.db")));
        assert_eq!(cfg.log_mode, LogMode::Stderr);
        assert_eq!(cfg.log_file, PathBuf::from("medshare.log"));
        assert_eq!(cfg.sanitize_max_bytes, 16 * 1024);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("MEDSHARE_DB_PATH", ":memory:"),
            ("MEDSHARE_LOG_MODE", "file"),
            ("MEDSHARE_LOG_FILE", "/tmp/m.log"),
            ("MEDSHARE_SANITIZE_MAX_BYTES", "512"),
        ]);
        assert_eq!(cfg.storage, StorageTarget::Memory);
        assert_eq!(cfg.log_mode, LogMode::File);
        assert_eq!(cfg.log_file, PathBuf::from("/tmp/m.log"));
        assert_eq!(cfg.sanitize_max_bytes, 512);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let cfg = config(&[
            ("MEDSHARE_LOG_MODE", "syslog"),
            ("MEDSHARE_SANITIZE_MAX_BYTES", "0"),
            ("MEDSHARE_DB_PATH", "  "),
        ]);
        assert_eq!(cfg.log_mode, LogMode::Stderr);
        assert_eq!(cfg.sanitize_max_bytes, DEFAULT_SANITIZE_MAX_BYTES);
        assert_eq!(cfg.storage, StorageTarget::Sqlite(PathBuf::from("medshare.db")));
    }
}
