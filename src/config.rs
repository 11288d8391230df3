//! Platform configuration.
//!
//! Settings are read from a per-user JSON file (or the file named by
//! `DATAPLUG_CONFIG`). Environment variables override stored values so that
//! managed deployments can pin timeouts without editing the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::DataSourceRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformConfig {
    pub connect_timeout_ms: u64,
    pub test_timeout_ms: u64,
    pub max_connections: u32,
    /// Internal stores by routing key; must contain `master`
    pub internal_stores: BTreeMap<String, DataSourceRecord>,
}

fn env_u64_opt(key: &str) -> Option<u64> {
    let value = std::env::var(key).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, value = %value, "Ignoring non-numeric override");
            None
        }
    }
}

/// Pool size override; a pool needs at least one connection.
fn max_connections_override(value: u64) -> Option<u32> {
    if value == 0 {
        warn!(key = "DATAPLUG_MAX_CONNECTIONS", "Ignoring zero pool size override");
        return None;
    }
    Some(u32::try_from(value).unwrap_or(u32::MAX))
}

/// Location of the configuration file.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("DATAPLUG_CONFIG") {
        return PathBuf::from(path);
    }

    if cfg!(windows) {
        let appdata = std::env::var_os("APPDATA")
            .unwrap_or_else(|| std::env::var_os("USERPROFILE").unwrap_or_default());
        let mut path = PathBuf::from(appdata);
        path.push("DataPlug");
        path.push("config.json");
        path
    } else {
        let home = std::env::var_os("HOME").unwrap_or_default();
        let mut path = PathBuf::from(home);
        path.push(".dataplug");
        path.push("config.json");
        path
    }
}

impl PlatformConfig {
    fn apply_env_overrides(&mut self) {
        if let Some(value) = env_u64_opt("DATAPLUG_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = value;
        }
        if let Some(value) = env_u64_opt("DATAPLUG_TEST_TIMEOUT_MS") {
            self.test_timeout_ms = value;
        }
        if let Some(value) =
            env_u64_opt("DATAPLUG_MAX_CONNECTIONS").and_then(max_connections_override)
        {
            self.max_connections = value;
        }
    }

    fn validate(&self, path: &Path) -> EngineResult<()> {
        if self.max_connections == 0 {
            return Err(EngineError::config(format!(
                "Invalid config {}: maxConnections must be at least 1",
                path.display()
            )));
        }
        Ok(())
    }

    /// Reads a configuration file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> EngineResult<Self> {
        let mut config = match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                EngineError::config(format!("Invalid config {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(EngineError::config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        config.validate(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads from [`config_path`].
    pub fn load() -> EngineResult<Self> {
        Self::load_from(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> EngineResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| EngineError::config(format!("Failed to create config directory: {}", e)))?;
        }

        let payload = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::config(format!("Save failed: {}", e)))?;
        fs::write(path, payload).map_err(|e| EngineError::config(format!("Save failed: {}", e)))?;
        Ok(())
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 15000,
            test_timeout_ms: 10000,
            max_connections: 5,
            internal_stores: BTreeMap::new(),
        }
    }
}
