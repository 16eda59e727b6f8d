//! Configuration file discovery
//!
//! An explicitly requested file must exist. Without one, the default file in
//! the user's configuration directory is used when present, and the built-in
//! defaults otherwise.

use crate::app::error::AppError;
use crate::queue::api::QueueConfig;
use std::path::{Path, PathBuf};

/// `<config dir>/taskgate/taskgate.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("taskgate").join("taskgate.toml"))
}

/// Pick the file to load, if any
pub fn locate_config(explicit: Option<&Path>) -> Result<Option<PathBuf>, AppError> {
    match explicit {
        Some(path) if path.exists() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(AppError::Usage(format!(
            "The specified configuration file does not exist: {}",
            path.display()
        ))),
        None => Ok(default_config_path().filter(|path| path.exists())),
    }
}

pub async fn resolve_config(explicit: Option<&Path>) -> Result<QueueConfig, AppError> {
    match locate_config(explicit)? {
        Some(path) => QueueConfig::load(&path)
            .await
            .map_err(|source| AppError::config(path, source)),
        None => {
            log::debug!("No configuration file found; using defaults");
            Ok(QueueConfig::default())
        }
    }
}
