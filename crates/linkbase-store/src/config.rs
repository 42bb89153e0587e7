//! Store configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file is valid.

use crate::StoreError;
use linkbase_domain::AnalyserMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a [`crate::SqliteStore`]
///
/// # Examples
///
/// ```
/// use linkbase_store::StoreConfig;
///
/// let config = StoreConfig::from_toml_str(
///     r#"
///     path = "filings.db"
///     completion_timeout_secs = 30
///     analyser_mode = "non_prohibited"
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.busy_timeout_ms, 5000);
/// assert_eq!(config.completion_timeout().unwrap().as_secs(), 30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file; `:memory:` for an in-memory database
    /// Default: linkbase.db
    pub path: PathBuf,

    /// How long SQLite waits on a locked database (milliseconds)
    /// Default: 5000
    pub busy_timeout_ms: u64,

    /// Limit for completing all networks of one store (seconds, 0 = none)
    /// Default: 0
    pub completion_timeout_secs: u64,

    /// Filter used by analysers created from the store
    /// Default: active_only
    pub analyser_mode: AnalyserMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("linkbase.db"),
            busy_timeout_ms: 5000,
            completion_timeout_secs: 0,
            analyser_mode: AnalyserMode::default(),
        }
    }
}

impl StoreConfig {
    /// Configuration for an in-memory database
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, StoreError> {
        let config: StoreConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// SQLite busy timeout
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Completion limit, if one is set
    pub fn completion_timeout(&self) -> Option<Duration> {
        match self.completion_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    fn validate(&self) -> Result<(), StoreError> {
        if self.path.as_os_str().is_empty() {
            return Err(StoreError::Config("path must not be empty".to_string()));
        }
        Ok(())
    }
}
