//! Settings storage module
//!
//! This module persists the values the CLI remembers between runs (the TMDB
//! credential and series id) in the system's standard configuration
//! directory. Data is serialized to JSON format for storage. The scraping
//! core never touches this file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during settings operations
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to determine config directory location
    #[error("Failed to determine config directory location")]
    ConfigDirectoryNotFound,

    /// Failed to create or access config directory
    #[error("Failed to create config directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read the settings file
    #[error("Failed to read settings file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the settings file
    #[error("Failed to write settings file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to deserialize the settings file
    #[error("Failed to deserialize settings file {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize settings
    #[error("Failed to serialize settings: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Values remembered between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_series_id: Option<String>,
}

/// Location of the settings file
pub struct SettingsStore {
    file_path: PathBuf,
}

impl SettingsStore {
    /// Opens the settings store in the platform configuration directory
    ///
    /// - Linux: ~/.config/linkhound/config.json
    /// - macOS: ~/Library/Application Support/linkhound/config.json
    /// - Windows: %APPDATA%\linkhound\config\config.json
    pub fn open() -> Result<Self, SettingsError> {
        let proj_dirs = directories::ProjectDirs::from("", "", "linkhound")
            .ok_or(SettingsError::ConfigDirectoryNotFound)?;

        Self::in_directory(proj_dirs.config_dir())
    }

    /// Opens a settings store inside the given directory, creating it if needed
    pub fn in_directory(dir: &Path) -> Result<Self, SettingsError> {
        fs::create_dir_all(dir).map_err(|e| SettingsError::DirectoryCreationFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            file_path: dir.join("config.json"),
        })
    }

    /// Loads the stored settings
    ///
    /// A missing file yields the default (empty) settings.
    pub fn load(&self) -> Result<Settings, SettingsError> {
        if !self.file_path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&self.file_path).map_err(|e| SettingsError::ReadFailed {
            path: self.file_path.clone(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| SettingsError::DeserializationFailed {
            path: self.file_path.clone(),
            source: e,
        })
    }

    /// Stores the settings, replacing the previous file
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(settings)?;

        fs::write(&self.file_path, content).map_err(|e| SettingsError::WriteFailed {
            path: self.file_path.clone(),
            source: e,
        })
    }

    /// Returns the path to the settings file
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}
