//! CLI configuration utilities

use anyhow::{Context, Result};
use ecogaspi_core::{AppProfile, Settings};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration file looked up in the data directory
pub const CONFIG_FILE: &str = "config.json";

/// Load settings, letting command-line flags override file and environment
pub fn load_settings(
    config_file: Option<&Path>,
    data_dir: Option<PathBuf>,
    profile: Option<AppProfile>,
) -> Result<Settings> {
    let default_file = data_dir
        .clone()
        .unwrap_or_else(|| Settings::default().data_dir())
        .join(CONFIG_FILE);

    let file = match config_file {
        Some(path) => Some(path.to_path_buf()),
        None if default_file.exists() => Some(default_file),
        None => None,
    };
    if let Some(path) = &file {
        debug!(path = %path.display(), "Loading configuration");
    }

    let mut settings = Settings::load(file.as_deref()).context("Failed to load configuration")?;
    if data_dir.is_some() {
        settings.data_dir = data_dir;
    }
    if let Some(profile) = profile {
        settings.session.profile = profile;
    }
    Ok(settings)
}

/// Save settings to a JSON file
pub fn save_settings<P: AsRef<Path>>(settings: &Settings, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Generate a default configuration file
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    save_settings(&Settings::default(), path)
}
