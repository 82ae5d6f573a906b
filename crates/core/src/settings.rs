//! Last-used export settings, persisted between runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::document::ExportConfig;

/// Per-user config directory.
///
/// Uses `WEBPANIM_CONFIG_DIR` env var if set, otherwise `~/.config/webpanim`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("WEBPANIM_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".config").join("webpanim")
}

/// Default location of the settings file.
pub fn settings_path() -> PathBuf {
    config_dir().join("png2webp-anim.json")
}

/// Load the last-used settings, falling back to defaults.
///
/// A missing file is the normal first-run case. An unreadable or corrupt
/// file is logged and must not prevent startup.
pub fn load(path: &Path) -> ExportConfig {
    if !path.is_file() {
        return ExportConfig::default();
    }
    match ExportConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Ignoring settings file {}: {e:#}", path.display());
            ExportConfig::default()
        }
    }
}

/// Save settings, creating the config directory if needed.
pub fn save(path: &Path, config: &ExportConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    config.save(path)
}
