//! Volunteer Matrix configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main Volunteer Matrix configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Data service (HTTP) configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Flat-file storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Client synchronizer configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Admin mode configuration
    #[serde(default)]
    pub admin: AdminConfig,
}

impl AppConfig {
    /// Default config location (`<config dir>/volunteer-matrix/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join("volunteer-matrix").join("config.toml"))
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from an explicit path, else the default location if it exists,
    /// else built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Data service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_origins: Vec::new(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the four collections
    pub data_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data.json"),
        }
    }
}

/// Synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Snapshot endpoint of the data service
    pub api_url: String,

    /// Debounce window in milliseconds
    pub debounce_ms: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001/api/data".to_string(),
            debounce_ms: 1000,
            request_timeout_secs: 10,
        }
    }
}

/// Admin mode configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Password that unlocks admin mode (unset = admin mode unavailable)
    #[serde(default)]
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.data_file, PathBuf::from("data.json"));
        assert_eq!(config.sync.debounce(), Duration::from_secs(1));
        assert!(config.admin.password.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [sync]
            api_url = "http://example.test/api/data"
            debounce_ms = 250
            request_timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.sync.debounce(), Duration::from_millis(250));
        assert_eq!(config.storage.data_file, PathBuf::from("data.json"));
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[storage]\ndata_file = \"/srv/volunteers/data.json\"\n\n[admin]\npassword = \"letmein\"\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(
            config.storage.data_file,
            PathBuf::from("/srv/volunteers/data.json")
        );
        assert_eq!(config.admin.password.as_deref(), Some("letmein"));
    }

    #[test]
    fn test_from_file_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let result = AppConfig::from_file(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_round_trip_toml() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.sync.api_url, config.sync.api_url);
    }
}
