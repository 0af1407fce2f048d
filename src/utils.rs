use crate::{Error, Result};
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::process::Command;

const APP_DIR: &str = "wallpaperchanger";

pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".config"))
        })
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| Error::Config(
            "Could not find config directory. Please set HOME or XDG_CONFIG_HOME environment variable.".to_string()
        ))
}

pub fn get_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".local").join("share"))
        })
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| Error::Config(
            "Could not find data directory. Please set HOME or XDG_DATA_HOME environment variable.".to_string()
        ))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.json"))
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Expands a leading `~` and environment variables in a configured path.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => PathBuf::from(shellexpand::tilde(&raw).into_owned()),
    }
}
