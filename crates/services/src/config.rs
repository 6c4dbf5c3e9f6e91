//! Settings file and state directory locations.

use shared::settings::AppSettings;
use std::fs;
use std::path::{Path, PathBuf};

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com.local", "Gemchat", "Gemchat")
}

pub fn config_path() -> Option<PathBuf> {
    let proj = project_dirs()?;
    let _ = fs::create_dir_all(proj.config_dir());
    Some(proj.config_dir().join("settings.json"))
}

/// Directory holding the persisted key/value entries.
pub fn state_dir() -> Option<PathBuf> {
    project_dirs().map(|proj| proj.config_dir().join("state"))
}

/// Returns the settings and whether they are fresh defaults.
pub fn load_settings_or_default() -> (AppSettings, bool) {
    match config_path() {
        Some(path) => load_settings_from(&path),
        None => (AppSettings::default(), true),
    }
}

pub fn load_settings_from(path: &Path) -> (AppSettings, bool) {
    if let Ok(bytes) = fs::read(path) {
        match serde_json::from_slice::<AppSettings>(&bytes) {
            Ok(settings) => return (settings, false),
            Err(e) => tracing::warn!("ignoring unreadable {}: {}", path.display(), e),
        }
    }
    (AppSettings::default(), true)
}

pub fn save_settings(settings: &AppSettings) {
    if let Some(path) = config_path() {
        save_settings_to(&path, settings);
    }
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) {
    match serde_json::to_vec_pretty(settings) {
        Ok(bytes) => {
            if let Err(e) = fs::write(path, bytes) {
                tracing::warn!("failed to write {}: {}", path.display(), e);
            }
        }
        Err(e) => tracing::warn!("failed to serialize settings: {}", e),
    }
}
