//! Store location configuration

use std::path::PathBuf;

use serde::Deserialize;

/// Environment variable overriding the working database path
pub const DB_ENV_VAR: &str = "DOJO_DB";

/// Where the working dojo database lives
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl StoreConfig {
    /// Default location: `~/.dojo/dojo.db`, or `./dojo.db` without a home
    /// directory
    pub fn default_path() -> PathBuf {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".dojo").join("dojo.db"))
            .unwrap_or_else(|| PathBuf::from("dojo.db"))
    }

    /// Defaults, overridden by `DOJO_DB` when set and non-empty
    pub fn from_env() -> Self {
        match std::env::var_os(DB_ENV_VAR) {
            Some(path) if !path.is_empty() => Self {
                path: PathBuf::from(path),
            },
            _ => Self::default(),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}
