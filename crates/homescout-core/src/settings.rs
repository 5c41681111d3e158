// SPDX-License-Identifier: AGPL-3.0
// Homescout Core - Settings persistence
//
// Settings are stored in a local JSON file next to the saved session.

use crate::listings::ListingFilter;
use crate::types::{AppError, AppSettings};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Directory holding settings.json and session.json
pub fn config_dir() -> Result<PathBuf, AppError> {
    let config_dir = directories::ProjectDirs::from("com", "homescout", "homescout")
        .ok_or_else(|| AppError::FileIo("Could not determine config directory".to_string()))?
        .config_dir()
        .to_path_buf();

    // Ensure the directory exists
    fs::create_dir_all(&config_dir)
        .map_err(|e| AppError::FileIo(format!("Failed to create config dir: {}", e)))?;

    Ok(config_dir)
}

/// In-memory cache of settings, persisted to disk on changes
pub struct SettingsStore {
    settings: RwLock<AppSettings>,
    file_path: PathBuf,
}

impl SettingsStore {
    /// Create a new settings store in the user config directory
    pub fn new() -> Result<Self, AppError> {
        Self::open(config_dir()?.join("settings.json"))
    }

    /// Create a settings store backed by a specific file, loading it if present
    pub fn open(file_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let file_path = file_path.into();
        tracing::debug!("Settings file path: {:?}", file_path);

        let settings = if file_path.exists() {
            let content = fs::read_to_string(&file_path)
                .map_err(|e| AppError::FileIo(format!("Failed to read settings: {}", e)))?;

            serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse settings, using defaults: {}", e);
                AppSettings::default()
            })
        } else {
            tracing::info!("No settings file found, using defaults");
            AppSettings::default()
        };

        let store = Self {
            settings: RwLock::new(settings),
            file_path,
        };

        // Persist default settings if file doesn't exist
        if !store.file_path.exists() {
            tracing::info!("Creating initial settings file");
            store.persist()?;
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Persist settings to disk
    fn persist(&self) -> Result<(), AppError> {
        let content = {
            let settings = self
                .settings
                .read()
                .map_err(|_| AppError::FileIo("Settings lock poisoned".to_string()))?;
            serde_json::to_string_pretty(&*settings).map_err(|e| {
                AppError::Serialization(format!("Failed to serialize settings: {}", e))
            })?
        };

        fs::write(&self.file_path, content)
            .map_err(|e| AppError::FileIo(format!("Failed to write settings: {}", e)))?;

        Ok(())
    }

    /// Get current settings
    pub fn get(&self) -> AppSettings {
        self.settings
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Replace settings and persist to disk
    pub fn update(&self, new_settings: AppSettings) -> Result<(), AppError> {
        {
            let mut settings = self
                .settings
                .write()
                .map_err(|_| AppError::FileIo("Settings lock poisoned".to_string()))?;
            *settings = new_settings;
        }

        let result = self.persist();
        match &result {
            Ok(()) => tracing::info!("Settings persisted successfully"),
            Err(e) => tracing::error!("Failed to persist settings: {}", e),
        }
        result
    }

    /// Point the client at a backend, rejecting unusable values
    pub fn set_backend(&self, backend_url: &str, anon_key: &str) -> Result<(), AppError> {
        let mut settings = self.get();
        settings.backend_url = backend_url.trim().to_string();
        settings.anon_key = anon_key.trim().to_string();
        settings.validate()?;
        self.update(settings)
    }

    /// Remember the filter preselected in the search view
    pub fn set_default_filter(&self, filter: ListingFilter) -> Result<(), AppError> {
        let mut settings = self.get();
        settings.default_filter = filter;
        self.update(settings)
    }
}
