use super::WallpaperManager;
use crate::utils::command_exists;
use crate::{Error, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::{error, info};

pub struct SwayManager;

impl SwayManager {
    pub fn new() -> Result<Self> {
        if !command_exists("swaybg") {
            return Err(Error::DesktopEnv(
                "swaybg command not found. Please install swaybg.".to_string(),
            ));
        }
        Ok(Self)
    }

    pub fn is_available() -> bool {
        std::env::var("SWAYSOCK").is_ok() && command_exists("swaymsg")
    }
}

/// Names of the active outputs in `swaymsg -t get_outputs` JSON.
pub fn parse_sway_outputs(output: &str) -> Result<Vec<String>> {
    let outputs: serde_json::Value = serde_json::from_str(output)
        .map_err(|e| Error::DesktopEnv(format!("Invalid swaymsg output: {e}")))?;

    Ok(outputs
        .as_array()
        .map(|array| {
            array
                .iter()
                .filter(|o| o["active"].as_bool().unwrap_or(false))
                .filter_map(|o| o["name"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default())
}

impl WallpaperManager for SwayManager {
    fn get_screens(&self) -> Vec<String> {
        let output = Command::new("swaymsg").args(["-t", "get_outputs"]).output();

        match output {
            Ok(output) if output.status.success() => {
                match parse_sway_outputs(&String::from_utf8_lossy(&output.stdout)) {
                    Ok(monitors) => monitors,
                    Err(e) => {
                        error!("swaymsg failed: {}", e);
                        Vec::new()
                    }
                }
            }
            Ok(output) => {
                error!(
                    "swaymsg failed: {}",
                    String::from_utf8_lossy(&output.stderr)
                );
                Vec::new()
            }
            Err(e) => {
                error!("swaymsg failed: {}", e);
                Vec::new()
            }
        }
    }

    fn set_wallpapers(&self, paths: &[PathBuf], screens: &[String]) -> Result<()> {
        // an old swaybg keeps painting over the new one otherwise
        let _ = Command::new("pkill").arg("swaybg").output();

        for (screen, path) in screens.iter().zip(paths) {
            Command::new("swaybg")
                .args(["-o", screen.as_str(), "-m", "fill", "-i"])
                .arg(path)
                .spawn()
                .map_err(|e| Error::DesktopEnv(format!("swaybg failed to start: {e}")))?;
        }

        info!(
            "Set Sway wallpapers: {:?}",
            screens.iter().zip(paths).collect::<Vec<_>>()
        );
        Ok(())
    }
}
