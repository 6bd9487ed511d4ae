//! JSON Configuration Management
//!
//! Loads config.json (creating it with defaults on first run), applies
//! environment overrides and validates the result.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_parent};

/// Configuration service for managing app settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AppConfig,
}

impl ConfigService {
    /// Load from the default location (~/.hr-copilot/config.json), writing
    /// defaults there if the file does not exist yet.
    pub fn new() -> AppResult<Self> {
        let path = config_path()?;
        if !path.exists() {
            ensure_parent(&path)?;
            Self::save_to_file(&path, &AppConfig::default())?;
        }
        Self::open(path)
    }

    /// Load from an explicit path, which must exist.
    pub fn from_path(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(AppError::not_found(format!(
                "config file {}",
                path.display()
            )));
        }
        Self::open(path)
    }

    fn open(config_path: PathBuf) -> AppResult<Self> {
        let mut config = Self::load_from_file(&config_path)?;
        config.apply_env_overrides();
        config.validate().map_err(AppError::config)?;
        tracing::debug!(path = %config_path.display(), "configuration loaded");
        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::config)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &AppConfig) -> AppResult<()> {
        config.validate().map_err(AppError::config)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    pub fn into_config(self) -> AppConfig {
        self.config
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AppResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> AppResult<()> {
        let mut config = Self::load_from_file(&self.config_path)?;
        config.apply_env_overrides();
        self.config = config;
        Ok(())
    }
}
