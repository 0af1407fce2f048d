use super::WallpaperManager;
use crate::utils::command_exists;
use crate::{Error, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::{error, info};

pub struct X11Manager;

impl X11Manager {
    pub fn new() -> Result<Self> {
        if !command_exists("feh") {
            return Err(Error::DesktopEnv(
                "feh command not found. Please install feh.".to_string(),
            ));
        }
        Ok(Self)
    }

    pub fn is_available() -> bool {
        std::env::var("DISPLAY").is_ok() && command_exists("xrandr")
    }
}

/// Monitor names from `xrandr --listmonitors` output: the last column of
/// every line but the `Monitors:` header.
pub fn parse_xrandr_monitors(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.contains("Monitors:"))
        .filter_map(|line| line.split_whitespace().last())
        .map(String::from)
        .collect()
}

impl WallpaperManager for X11Manager {
    fn get_screens(&self) -> Vec<String> {
        match Command::new("xrandr").arg("--listmonitors").output() {
            Ok(output) if output.status.success() => {
                parse_xrandr_monitors(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                error!(
                    "xrandr failed: {}",
                    String::from_utf8_lossy(&output.stderr)
                );
                Vec::new()
            }
            Err(e) => {
                error!("xrandr failed: {}", e);
                Vec::new()
            }
        }
    }

    // feh spans its arguments across monitors in xrandr order, so screen
    // names are not needed here.
    fn set_wallpapers(&self, paths: &[PathBuf], _screens: &[String]) -> Result<()> {
        let output = Command::new("feh").arg("--bg-fill").args(paths).output()?;

        if !output.status.success() {
            return Err(Error::DesktopEnv(format!(
                "feh failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        info!("Set X11 wallpapers: {:?}", paths);
        Ok(())
    }
}
