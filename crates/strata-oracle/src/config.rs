//! Oracle configuration
//!
//! Options can be built in code or read from the `[oracle]` table of a
//! TOML file (a bare table is accepted as well).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading options
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the file
    #[error("Failed to read oracle config: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse oracle config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Parsed but semantically invalid
    #[error("Invalid oracle config: {0}")]
    Invalid(String),
}

/// Per-session options for a [`TypeOracle`](crate::TypeOracle)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleOptions {
    /// Maximum number of handles the arena may hold (None = unlimited)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_handles: Option<usize>,

    /// Bound on heap scope acquisition in milliseconds (None = block until safe)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_timeout_ms: Option<u64>,

    /// Share one placeholder per name for unloaded types
    pub dedup_unloaded: bool,

    /// Check every hierarchy snapshot for cycles and display consistency
    pub verify_hierarchy: bool,
}

impl Default for OracleOptions {
    fn default() -> Self {
        Self {
            max_handles: None,
            scope_timeout_ms: None,
            dedup_unloaded: true,
            verify_hierarchy: true,
        }
    }
}

#[derive(Deserialize)]
struct OracleSection {
    oracle: OracleOptions,
}

impl OracleOptions {
    /// Options with an arena limit
    pub fn with_handle_limit(max_handles: usize) -> Self {
        Self {
            max_handles: Some(max_handles),
            ..Default::default()
        }
    }

    /// Options with a bounded scope acquisition
    pub fn with_scope_timeout(timeout: Duration) -> Self {
        Self {
            scope_timeout_ms: Some(timeout.as_millis() as u64),
            ..Default::default()
        }
    }

    /// The scope acquisition bound, if any
    pub fn scope_timeout(&self) -> Option<Duration> {
        self.scope_timeout_ms.map(Duration::from_millis)
    }

    /// Parse options from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let value: toml::Value = toml::from_str(content)?;
        let options = if value.get("oracle").is_some() {
            let section: OracleSection = value.try_into()?;
            section.oracle
        } else {
            value.try_into()?
        };
        options.validate()?;
        Ok(options)
    }

    /// Parse options from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject values that would make every query fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_handles == Some(0) {
            return Err(ConfigError::Invalid(
                "max_handles must be greater than zero".to_string(),
            ));
        }
        if self.scope_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "scope_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
