//! YAML configuration loading and validation
//!
//! The config file supplies the API endpoint and credentials, the
//! serialization format, the worker-pool limit, the default export
//! directory, and the import rule set passed through to the server.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SyncError};

/// Serialization format used for configuration export and import.
///
/// Unknown format identifiers fail at startup, not at first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// The XML export format
    Xml,
}

impl ExportFormat {
    /// Wire identifier sent to the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xml => "xml",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "xml" => Ok(Self::Xml),
            other => Err(SyncError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// API endpoint and credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// JSON-RPC endpoint, e.g. `https://zabbix.example.com/api_jsonrpc.php`
    pub url: String,
    /// API user name
    pub user: String,
    /// API user password
    pub password: String,
}

/// Top-level configuration, loaded from `config.yml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// API connection settings
    pub api: ApiConfig,

    /// Serialization format identifier (only "xml" is supported)
    #[serde(default = "default_format")]
    pub api_format: String,

    /// Upper bound on concurrent workers for batch operations
    #[serde(default = "default_pool_limit")]
    pub pool_limit: usize,

    /// Default destination directory for exports
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Server-side merge policy for `configuration.import`, passed
    /// through verbatim
    #[serde(default)]
    pub import_rules: Value,
}

fn default_format() -> String {
    "xml".to_string()
}

const fn default_pool_limit() -> usize {
    4
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("exports")
}

impl Config {
    /// Load configuration from an explicit path or the discovery locations.
    ///
    /// Without an explicit path, `./config.yml` is tried first, then
    /// `<user config dir>/zbxsync/config.yml`.
    ///
    /// # Errors
    ///
    /// Returns an error if no config file is found, the file cannot be
    /// read or parsed, or validation fails.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = discover(explicit)?;
        let raw = fs::read_to_string(&path).map_err(|e| SyncError::FileRead {
            path: path.clone(),
            source: e,
        })?;
        let config: Self = serde_yml::from_str(&raw)
            .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the configured format identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnsupportedFormat`] for unknown identifiers.
    pub fn format(&self) -> Result<ExportFormat> {
        self.api_format.parse()
    }

    fn validate(&self) -> Result<()> {
        if self.api.url.trim().is_empty() {
            return Err(SyncError::Config("api.url must not be empty".to_string()));
        }
        if self.pool_limit == 0 {
            return Err(SyncError::Config("pool_limit must be at least 1".to_string()));
        }
        self.format()?;
        Ok(())
    }
}

fn discover(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let local = PathBuf::from("config.yml");
    if local.exists() {
        return Ok(local);
    }

    if let Some(dir) = dirs::config_dir() {
        let user = dir.join("zbxsync").join("config.yml");
        if user.exists() {
            return Ok(user);
        }
    }

    Err(SyncError::Config(
        "no config.yml found in the working directory or user config dir; pass --config"
            .to_string(),
    ))
}
