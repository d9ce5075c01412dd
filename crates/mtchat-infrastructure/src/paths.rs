//! Unified path management for mtchat configuration files.

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for mtchat.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/mtchat/            # Config directory (platform default via `dirs`)
/// ├── config.toml              # Client / server configuration
/// └── history.txt              # Terminal client line history
/// ```
pub struct MtchatPaths;

impl MtchatPaths {
    const APP_DIR: &'static str = "mtchat";

    /// Returns the mtchat configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/mtchat/`)
    /// - `Err(PathError::HomeDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(Self::APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the terminal client's line history.
    pub fn history_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("history.txt"))
    }
}
