//! Application Paths
//!
//! Resolves ~/.hr-copilot/ and the files kept there.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the application directory (~/.hr-copilot/)
pub fn app_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".hr-copilot"))
}

/// Get the config file path (~/.hr-copilot/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(app_dir()?.join("config.json"))
}

/// Get the default records file path (~/.hr-copilot/employees.json)
pub fn default_records_path() -> AppResult<PathBuf> {
    Ok(app_dir()?.join("employees.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Ensure the parent directory of a file exists
pub fn ensure_parent(path: &Path) -> AppResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}
