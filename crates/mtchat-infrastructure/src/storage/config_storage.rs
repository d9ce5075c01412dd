//! Configuration file storage.
//!
//! Loads `ClientConfig` from ~/.config/mtchat/config.toml.

use std::fs;
use std::path::{Path, PathBuf};

use mtchat_core::MtchatError;
use mtchat_core::config::ClientConfig;
use thiserror::Error;

use crate::paths::MtchatPaths;

/// Errors that can occur during config storage operations.
#[derive(Debug, Error)]
pub enum ConfigStorageError {
    /// Configuration file not found.
    #[error("Configuration file not found at: {}", .0.display())]
    NotFound(PathBuf),
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Config directory not found.
    #[error("Could not determine home directory")]
    ConfigDirNotFound,
}

impl From<ConfigStorageError> for MtchatError {
    fn from(err: ConfigStorageError) -> Self {
        MtchatError::config(err.to_string())
    }
}

/// Storage for `config.toml`.
///
/// Responsibilities:
/// - Load config.toml from ~/.config/mtchat/
/// - Write a config file on request (`mtchat-server --write-config`, via
///   `config_service::write_config`)
///
/// Does NOT:
/// - Apply environment overrides (see `config_service`)
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Creates a ConfigStorage with the default path (~/.config/mtchat/config.toml).
    pub fn new() -> Result<Self, ConfigStorageError> {
        let path = MtchatPaths::config_file().map_err(|_| ConfigStorageError::ConfigDirNotFound)?;
        Ok(Self { path })
    }

    /// Creates a ConfigStorage with a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the configuration.
    ///
    /// # Returns
    ///
    /// - `Ok(ClientConfig)`: Successfully loaded and parsed
    /// - `Err(ConfigStorageError::NotFound)`: File doesn't exist
    /// - `Err(ConfigStorageError::Io)`: Failed to read file
    /// - `Err(ConfigStorageError::Parse)`: Invalid TOML
    pub fn load(&self) -> Result<ClientConfig, ConfigStorageError> {
        if !self.path.exists() {
            return Err(ConfigStorageError::NotFound(self.path.clone()));
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the configuration, or defaults when the file is absent.
    pub fn load_or_default(&self) -> Result<ClientConfig, ConfigStorageError> {
        match self.load() {
            Err(ConfigStorageError::NotFound(_)) => Ok(ClientConfig::default()),
            other => other,
        }
    }

    /// Writes `config`, creating the parent directory if needed.
    pub fn save(&self, config: &ClientConfig) -> Result<(), ConfigStorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string_pretty(config)?)?;
        Ok(())
    }

    /// Returns the path to the config file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtchat_core::config::Environment;
    use tempfile::TempDir;

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        let storage = ConfigStorage::with_path(file_path.clone());

        match storage.load() {
            Err(ConfigStorageError::NotFound(path)) => assert_eq!(path, file_path),
            other => panic!("Expected NotFound error, got {other:?}"),
        }
        assert_eq!(storage.load_or_default().unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_load_valid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        fs::write(
            &file_path,
            r#"
api_base_url = "http://localhost:4000"
environment = "production"
"#,
        )
        .unwrap();

        let config = ConfigStorage::with_path(file_path).load().unwrap();
        assert_eq!(config.api_base_url, "http://localhost:4000");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.tenant_id, "default");
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        fs::write(&file_path, "api_base_url = [").unwrap();

        let result = ConfigStorage::with_path(file_path).load();
        assert!(matches!(result, Err(ConfigStorageError::Parse(_))));
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ConfigStorage::with_path(temp_dir.path().join("nested/config.toml"));
        let config = ClientConfig {
            public_url: Some("https://app.example".into()),
            ..ClientConfig::default()
        };
        storage.save(&config).unwrap();
        assert_eq!(storage.load().unwrap(), config);
    }
}
